//! Logging facilities to record events during simulation.
//!
//! The simulation reports everything through a [`Logger`], which can be replaced by the user.

use std::cell::RefCell;
use std::fs::File;
use std::rc::Rc;

use log::Level;
use serde::Serialize;
use sugars::{rc, refcell};

use crate::error::Result;

pub trait Logger {
    fn log_error(&mut self, time: f64, component: &str, log: String);

    fn log_warn(&mut self, time: f64, component: &str, log: String);

    fn log_info(&mut self, time: f64, component: &str, log: String);

    fn log_debug(&mut self, time: f64, component: &str, log: String);

    fn log_trace(&mut self, time: f64, component: &str, log: String);

    fn save_log(&self, _path: &str) -> Result<()>;
}

/// Logger shared between simulation components.
pub type SharedLogger = Rc<RefCell<Box<dyn Logger>>>;

/// Wraps the logger so that it can be shared between simulation components.
pub fn shared_logger<L: Logger + 'static>(logger: L) -> SharedLogger {
    let logger: Box<dyn Logger> = Box::new(logger);
    rc!(refcell!(logger))
}

/// Forwards records to the `log` crate.
#[derive(Default)]
pub struct StdoutLogger {}

impl StdoutLogger {
    pub fn new() -> Self {
        Self {}
    }
}

impl Logger for StdoutLogger {
    fn log_error(&mut self, time: f64, component: &str, log: String) {
        log::error!("{:>10.3} {:<12} {}", time, component, log);
    }

    fn log_warn(&mut self, time: f64, component: &str, log: String) {
        log::warn!("{:>10.3} {:<12} {}", time, component, log);
    }

    fn log_info(&mut self, time: f64, component: &str, log: String) {
        log::info!("{:>10.3} {:<12} {}", time, component, log);
    }

    fn log_debug(&mut self, time: f64, component: &str, log: String) {
        log::debug!("{:>10.3} {:<12} {}", time, component, log);
    }

    fn log_trace(&mut self, time: f64, component: &str, log: String) {
        log::trace!("{:>10.3} {:<12} {}", time, component, log);
    }

    fn save_log(&self, _path: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LogEntry {
    pub timestamp: f64,
    pub level: String,
    pub component: String,
    pub message: String,
}

/// Keeps records in memory and saves them to a CSV file.
pub struct FileLogger {
    log: Vec<LogEntry>,
    level: Level,
}

impl Default for FileLogger {
    fn default() -> Self {
        Self {
            log: Vec::new(),
            level: Level::Info,
        }
    }
}

impl FileLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: Level) -> Self {
        Self { log: Vec::new(), level }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.log
    }

    fn log_internal(&mut self, time: f64, component: &str, message: String, level: Level) {
        if self.level < level {
            return;
        }
        self.log.push(LogEntry {
            timestamp: time,
            level: level.to_string(),
            component: component.to_string(),
            message,
        });
    }
}

impl Logger for FileLogger {
    fn log_error(&mut self, time: f64, component: &str, log: String) {
        self.log_internal(time, component, log, Level::Error)
    }

    fn log_warn(&mut self, time: f64, component: &str, log: String) {
        self.log_internal(time, component, log, Level::Warn)
    }

    fn log_info(&mut self, time: f64, component: &str, log: String) {
        self.log_internal(time, component, log, Level::Info)
    }

    fn log_debug(&mut self, time: f64, component: &str, log: String) {
        self.log_internal(time, component, log, Level::Debug)
    }

    fn log_trace(&mut self, time: f64, component: &str, log: String) {
        self.log_internal(time, component, log, Level::Trace)
    }

    fn save_log(&self, path: &str) -> Result<()> {
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        for entry in &self.log {
            wtr.serialize(entry)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

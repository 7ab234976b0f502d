//! Reader of CPU utilization traces.

use std::fs;
use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::error::{DatacenterError, Result};

/// Source of CPU utilization series, one value (0-1) per simulation step.
pub trait UtilizationTraceSource {
    /// Returns `count` series of exactly `time_steps` values each.
    fn load_traces(&mut self, count: usize, time_steps: usize) -> Result<Vec<Vec<f64>>>;
}

/// Reads traces in PlanetLab format: one utilization percentage per line, a file per VM.
///
/// Files are chosen at random from the directory. Lines other than plain integers are skipped.
pub struct PlanetLabTraceReader {
    dir: PathBuf,
    rand: Pcg64,
}

impl PlanetLabTraceReader {
    pub fn new<P: AsRef<Path>>(dir: P, seed: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            rand: Pcg64::seed_from_u64(seed),
        }
    }

    fn list_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Parses trace content into `time_steps` normalized values.
pub fn parse_trace(content: &str, time_steps: usize, path: &str) -> Result<Vec<f64>> {
    let values: Vec<f64> = content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|line| line.parse::<f64>().ok())
        .take(time_steps)
        .map(|v| (v / 100.).clamp(0., 1.))
        .collect();
    if values.len() < time_steps {
        return Err(DatacenterError::TraceTooShort {
            path: path.to_string(),
            length: values.len(),
            required: time_steps,
        });
    }
    Ok(values)
}

impl UtilizationTraceSource for PlanetLabTraceReader {
    fn load_traces(&mut self, count: usize, time_steps: usize) -> Result<Vec<Vec<f64>>> {
        let files = self.list_files()?;
        if files.len() < count {
            return Err(DatacenterError::NotEnoughTraces {
                required: count,
                available: files.len(),
            });
        }
        let selected: Vec<&PathBuf> = files.choose_multiple(&mut self.rand, count).collect();
        let mut traces = Vec::with_capacity(count);
        for path in selected {
            let content = fs::read_to_string(path)?;
            traces.push(parse_trace(&content, time_steps, &path.to_string_lossy())?);
        }
        Ok(traces)
    }
}

/// Traces kept in memory, cycled if more series are requested than available.
pub struct InMemoryTraces {
    traces: Vec<Vec<f64>>,
}

impl InMemoryTraces {
    pub fn new(traces: Vec<Vec<f64>>) -> Self {
        Self { traces }
    }
}

impl UtilizationTraceSource for InMemoryTraces {
    fn load_traces(&mut self, count: usize, time_steps: usize) -> Result<Vec<Vec<f64>>> {
        if self.traces.is_empty() && count > 0 {
            return Err(DatacenterError::NotEnoughTraces {
                required: count,
                available: 0,
            });
        }
        let mut result = Vec::with_capacity(count);
        for i in 0..count {
            let trace = &self.traces[i % self.traces.len()];
            if trace.len() < time_steps {
                return Err(DatacenterError::TraceTooShort {
                    path: format!("<memory #{}>", i % self.traces.len()),
                    length: trace.len(),
                    required: time_steps,
                });
            }
            result.push(trace[..time_steps].iter().map(|v| v.clamp(0., 1.)).collect());
        }
        Ok(result)
    }
}

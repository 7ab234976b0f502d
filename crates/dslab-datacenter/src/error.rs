//! Errors reported by the datacenter simulation.

use thiserror::Error;

/// Errors of simulation setup and input data.
///
/// Configuration and input errors are fatal for a run and are returned as soon as they are detected.
/// Runtime failures such as an unplaceable VM are not errors, they are reported via return values and the log.
#[derive(Error, Debug)]
pub enum DatacenterError {
    #[error("unknown VM placement algorithm: {0}")]
    UnknownPlacementAlgorithm(String),

    #[error("unknown VM migration strategy: {0}")]
    UnknownMigrationStrategy(String),

    #[error("invalid option {option} in {config}")]
    InvalidOption { config: String, option: String },

    #[error("DVFS level {level} is not defined for host #{host_id}")]
    InvalidDvfsLevel { host_id: u32, level: u32 },

    #[error("not enough trace files: {required} required, {available} available")]
    NotEnoughTraces { required: usize, available: usize },

    #[error("trace file {path} has {length} entries, {required} required")]
    TraceTooShort { path: String, length: usize, required: usize },

    #[error("utilization series of vm #{vm_id} has {length} entries, {required} required")]
    MissingUtilization { vm_id: u32, length: usize, required: usize },

    #[error("vm #{vm_id} is listed more than once")]
    DuplicateVm { vm_id: u32 },

    #[error("invalid distribution data: {0}")]
    InvalidDistribution(String),

    #[error("no VM types are configured")]
    NoVmTypes,

    #[error("workload section is missing in config")]
    NoWorkload,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DatacenterError>;

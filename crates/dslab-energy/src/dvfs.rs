//! Dynamic voltage and frequency scaling (DVFS) levels and governors.
//!
//! A DVFS level scales the effective core capacity of a host and replaces its power bounds.
//! Level 0 is the nominal frequency, higher levels run slower and consume less.

use dyn_clone::{clone_trait_object, DynClone};
use serde::{Deserialize, Serialize};

/// Single row of the DVFS table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DvfsLevel {
    /// Level identifier.
    pub level: u32,
    /// Multiplier applied to the base core capacity.
    pub scaling: f64,
    /// Idle power consumption at this level in W.
    pub power_idle: f64,
    /// Maximum power consumption at this level in W.
    pub power_max: f64,
}

impl DvfsLevel {
    pub fn new(level: u32, scaling: f64, power_idle: f64, power_max: f64) -> Self {
        Self {
            level,
            scaling,
            power_idle,
            power_max,
        }
    }
}

/// Builds the default three-level table from the nominal power bounds of a host.
///
/// | level | scaling | idle power | max power |
/// |---|---|---|---|
/// | 0 | 1.0 | idle | max |
/// | 1 | 0.8 | idle * 0.87 | max * 0.83 |
/// | 2 | 0.6 | idle * 0.75 | max * 0.65 |
pub fn default_dvfs_levels(power_idle: f64, power_max: f64) -> Vec<DvfsLevel> {
    vec![
        DvfsLevel::new(0, 1.0, power_idle, power_max),
        DvfsLevel::new(1, 0.8, power_idle * 0.87, power_max * 0.83),
        DvfsLevel::new(2, 0.6, power_idle * 0.75, power_max * 0.65),
    ]
}

/// Returns the table row with the specified level identifier.
pub fn find_level(levels: &[DvfsLevel], level: u32) -> Option<&DvfsLevel> {
    levels.iter().find(|l| l.level == level)
}

/// Selects the DVFS level of a host from its utilization.
///
/// Governors are stateless: the same utilization always produces the same level.
pub trait DvfsGovernor: DynClone {
    /// Returns the level identifier for the given host utilization (0-1) measured against the
    /// unscaled host capacity.
    fn select_level(&self, utilization: f64) -> u32;
}

clone_trait_object!(DvfsGovernor);

impl<F> DvfsGovernor for F
where
    F: Fn(f64) -> u32 + Clone,
{
    fn select_level(&self, utilization: f64) -> u32 {
        self(utilization)
    }
}

/// Default governor with two utilization thresholds.
///
/// `u < low` selects level 2, `low <= u < high` selects level 1, `u >= high` selects level 0.
#[derive(Clone, Debug)]
pub struct ThresholdGovernor {
    low: f64,
    high: f64,
}

impl ThresholdGovernor {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

impl Default for ThresholdGovernor {
    fn default() -> Self {
        Self::new(0.6, 0.8)
    }
}

impl DvfsGovernor for ThresholdGovernor {
    fn select_level(&self, utilization: f64) -> u32 {
        if utilization < self.low {
            2
        } else if utilization < self.high {
            1
        } else {
            0
        }
    }
}

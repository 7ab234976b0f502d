//! Power consumption models.

use dyn_clone::{clone_trait_object, DynClone};

/// Model for computing power consumption of a physical host from its CPU utilization.
///
/// The power bounds are passed on every call because they are owned by the host and change
/// together with its DVFS level.
pub trait PowerModel: DynClone {
    /// Computes the current power consumption in W.
    ///
    /// * `utilization` - current CPU utilization (0-1).
    /// * `idle_power` - power consumption of an idle powered on host at the current DVFS level.
    /// * `max_power` - power consumption of a fully loaded host at the current DVFS level.
    fn get_power(&self, utilization: f64, idle_power: f64, max_power: f64) -> f64;
}

clone_trait_object!(PowerModel);

impl<F> PowerModel for F
where
    F: Fn(f64) -> f64 + Clone,
{
    fn get_power(&self, utilization: f64, _idle_power: f64, _max_power: f64) -> f64 {
        self(utilization)
    }
}

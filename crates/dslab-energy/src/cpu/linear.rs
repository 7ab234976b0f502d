use crate::power_model::PowerModel;

/// A power model based on linear interpolation between the idle and maximum power consumption values.
///
/// `P = P_idle + (P_max - P_idle) * u`
#[derive(Clone, Default)]
pub struct LinearPowerModel;

impl LinearPowerModel {
    pub fn new() -> Self {
        Self
    }
}

impl PowerModel for LinearPowerModel {
    fn get_power(&self, utilization: f64, idle_power: f64, max_power: f64) -> f64 {
        idle_power + (max_power - idle_power) * utilization
    }
}

use crate::power_model::PowerModel;

/// A power model based on non-linear interpolation between the idle and maximum power consumption values.
/// Current power consumption is computed as P_curr = P_idle + (P_max - P_idle) * (2 * u - u ^ 1.4)
///
/// Priya, B., Pilli, E. S., & Joshi, R. C. (2013).
/// A survey on energy and power consumption models for Greener Cloud.
/// 2013 3rd IEEE International Advance Computing Conference (IACC).
#[derive(Clone, Default)]
pub struct UtilizationAwarePowerModel;

impl UtilizationAwarePowerModel {
    pub fn new() -> Self {
        Self
    }
}

impl PowerModel for UtilizationAwarePowerModel {
    fn get_power(&self, utilization: f64, idle_power: f64, max_power: f64) -> f64 {
        idle_power + (max_power - idle_power) * (2. * utilization - utilization.powf(1.4))
    }
}

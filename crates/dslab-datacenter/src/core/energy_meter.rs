//! Energy meter calculates the host energy consumption.

/// Energy meter structure.
///
/// Power is sampled once per simulation step and assumed constant for the step duration.
#[derive(Debug, Clone, Default)]
pub struct EnergyMeter {
    energy_consumed: f64,
    current_power: f64,
}

impl EnergyMeter {
    /// Creates component.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts `power` W drawn during `duration` seconds.
    pub fn update(&mut self, power: f64, duration: f64) {
        self.energy_consumed += power * duration;
        self.current_power = power;
    }

    /// Returns the last sampled power in W.
    pub fn current_power(&self) -> f64 {
        self.current_power
    }

    /// Returns the total energy consumption in J.
    pub fn energy_consumed(&self) -> f64 {
        self.energy_consumed
    }
}

//! Per-step history of host states.

use indexmap::IndexMap;
use serde::Serialize;

/// History of a single host, one entry per simulation step.
#[derive(Clone, Debug, Default, Serialize)]
pub struct HostHistory {
    /// CPU utilization against the unscaled capacity.
    pub utilization: Vec<f64>,
    /// Power draw in W.
    pub power: Vec<f64>,
    pub active: Vec<bool>,
}

/// This component accumulates host utilization and power samples and the number of running VMs.
///
/// Hosts are kept in the order they were first recorded.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Monitoring {
    hosts: IndexMap<u32, HostHistory>,
    active_vms: Vec<usize>,
}

impl Monitoring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_host(&mut self, host_id: u32, utilization: f64, power: f64, active: bool) {
        let history = self.hosts.entry(host_id).or_default();
        history.utilization.push(utilization);
        history.power.push(power);
        history.active.push(active);
    }

    pub fn record_active_vms(&mut self, count: usize) {
        self.active_vms.push(count);
    }

    pub fn host_history(&self, host_id: u32) -> Option<&HostHistory> {
        self.hosts.get(&host_id)
    }

    pub fn hosts(&self) -> &IndexMap<u32, HostHistory> {
        &self.hosts
    }

    /// Utilization series of all hosts keyed by host ID.
    pub fn utilization_history(&self) -> IndexMap<u32, Vec<f64>> {
        self.hosts
            .iter()
            .map(|(id, history)| (*id, history.utilization.clone()))
            .collect()
    }

    pub fn active_vm_counts(&self) -> &[usize] {
        &self.active_vms
    }
}

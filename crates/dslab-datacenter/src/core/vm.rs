//! Representation of virtual machine.

use serde::Serialize;

use crate::core::cloudlet::Cloudlet;

/// Length of the dedicated cloudlet of an online service VM.
/// Large enough to never finish within a realistic simulation horizon.
pub const ONLINE_SERVICE_CLOUDLET_LENGTH: f64 = 1e10;

/// Represents virtual machine (VM).
///
/// VM is a reservation of host resources: CPU in MIPS, RAM in MB and storage in GB.
/// The actual CPU demand is produced by the cloudlets running inside the VM.
/// An online service VM holds a single dedicated cloudlet whose demand ratio is driven from outside,
/// a batch VM holds a list of cloudlets executed until completion.
#[derive(Clone, Debug, Serialize)]
pub struct VirtualMachine {
    pub id: u32,
    pub cpu: f64,
    pub ram: u64,
    pub storage: u64,
    is_online_service: bool,
    cloudlets: Vec<Cloudlet>,
    current_host: Option<u32>,
}

impl VirtualMachine {
    /// Creates batch VM without cloudlets.
    pub fn new(id: u32, cpu: f64, ram: u64, storage: u64) -> Self {
        Self {
            id,
            cpu,
            ram,
            storage,
            is_online_service: false,
            cloudlets: Vec::new(),
            current_host: None,
        }
    }

    /// Creates online service VM with its dedicated cloudlet.
    pub fn online_service(id: u32, cpu: f64, ram: u64, storage: u64) -> Self {
        let mut vm = Self::new(id, cpu, ram, storage);
        vm.is_online_service = true;
        vm.assign_cloudlet(Cloudlet::new(id, ONLINE_SERVICE_CLOUDLET_LENGTH, 1.), -1.);
        vm
    }

    pub fn is_online_service(&self) -> bool {
        self.is_online_service
    }

    /// Returns the host this VM currently resides on.
    pub fn current_host(&self) -> Option<u32> {
        self.current_host
    }

    pub(crate) fn set_current_host(&mut self, host: Option<u32>) {
        self.current_host = host;
    }

    pub fn cloudlets(&self) -> &[Cloudlet] {
        &self.cloudlets
    }

    /// Binds cloudlet to this VM.
    pub fn assign_cloudlet(&mut self, mut cloudlet: Cloudlet, time: f64) {
        cloudlet.assign(time);
        self.cloudlets.push(cloudlet);
    }

    /// Sets the demand ratio of all unfinished cloudlets.
    pub fn set_cpu_demand_ratio(&mut self, ratio: f64, time: f64) {
        for cloudlet in self.cloudlets.iter_mut().filter(|c| !c.is_finished()) {
            cloudlet.set_cpu_demand_ratio(ratio, time);
        }
    }

    /// Caches the long-run average demand ratio in all cloudlets.
    pub fn set_trace_mean(&mut self, mean: f64) {
        for cloudlet in self.cloudlets.iter_mut() {
            cloudlet.set_trace_mean(mean);
        }
    }

    /// Executes unfinished cloudlets for `time_step` seconds, returns IDs of cloudlets finished during this step.
    pub fn update_cloudlets(&mut self, time: f64, time_step: f64) -> Vec<u32> {
        let cpu = self.cpu;
        self.cloudlets
            .iter_mut()
            .filter_map(|cloudlet| {
                if cloudlet.update_execution(cpu, time, time_step) {
                    Some(cloudlet.id)
                } else {
                    None
                }
            })
            .collect()
    }

    /// VM is completed when it has some cloudlets and all of them are finished.
    pub fn is_completed(&self) -> bool {
        !self.cloudlets.is_empty() && self.cloudlets.iter().all(|c| c.is_finished())
    }

    pub fn has_unfinished_cloudlets(&self) -> bool {
        self.cloudlets.iter().any(|c| !c.is_finished())
    }

    /// Current CPU demand in MIPS.
    pub fn demand(&self) -> f64 {
        self.cloudlets
            .iter()
            .filter(|c| !c.is_finished())
            .map(|c| self.cpu * c.cpu_demand_ratio())
            .sum()
    }

    /// CPU demand in MIPS estimated from the average demand ratio of cloudlets.
    ///
    /// Falls back to the current ratio for cloudlets without known average.
    pub fn mean_demand(&self) -> f64 {
        self.cloudlets
            .iter()
            .filter(|c| !c.is_finished())
            .map(|c| self.cpu * c.trace_mean().unwrap_or_else(|| c.cpu_demand_ratio()))
            .sum()
    }
}

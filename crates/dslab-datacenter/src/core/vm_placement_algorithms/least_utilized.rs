//! Least Utilized algorithm.

use crate::core::host::Host;
use crate::core::vm::VirtualMachine;
use crate::core::vm_placement_algorithm::{select_min_by, VMPlacementAlgorithm};

/// Uses the suitable host with the lowest current CPU utilization.
#[derive(Default)]
pub struct LeastUtilized;

impl LeastUtilized {
    pub fn new() -> Self {
        Self {}
    }
}

impl VMPlacementAlgorithm for LeastUtilized {
    fn select_host(&mut self, vm: &VirtualMachine, hosts: &[Host]) -> Option<usize> {
        select_min_by(vm, hosts, |host| host.cpu_utilization())
    }
}

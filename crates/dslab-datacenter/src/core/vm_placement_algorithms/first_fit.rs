//! First Fit algorithm.

use crate::core::host::Host;
use crate::core::vm::VirtualMachine;
use crate::core::vm_placement_algorithm::VMPlacementAlgorithm;

/// Uses the first suitable host.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VMPlacementAlgorithm for FirstFit {
    fn select_host(&mut self, vm: &VirtualMachine, hosts: &[Host]) -> Option<usize> {
        hosts.iter().position(|host| host.can_host(vm))
    }
}

//! Best Fit algorithm.

use crate::core::host::Host;
use crate::core::vm::VirtualMachine;
use crate::core::vm_placement_algorithm::{select_min_by, VMPlacementAlgorithm};

/// Uses the suitable host with the least CPU capacity left after placing the VM.
#[derive(Default)]
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VMPlacementAlgorithm for BestFit {
    fn select_host(&mut self, vm: &VirtualMachine, hosts: &[Host]) -> Option<usize> {
        select_min_by(vm, hosts, |host| host.remaining_cpu() - vm.cpu)
    }
}

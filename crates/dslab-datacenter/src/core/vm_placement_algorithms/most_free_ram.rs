//! Most Free RAM algorithm.

use crate::core::host::Host;
use crate::core::vm::VirtualMachine;
use crate::core::vm_placement_algorithm::{select_min_by, VMPlacementAlgorithm};

/// Uses the suitable host with the largest amount of uncommitted RAM.
#[derive(Default)]
pub struct MostFreeRam;

impl MostFreeRam {
    pub fn new() -> Self {
        Self {}
    }
}

impl VMPlacementAlgorithm for MostFreeRam {
    fn select_host(&mut self, vm: &VirtualMachine, hosts: &[Host]) -> Option<usize> {
        select_min_by(vm, hosts, |host| -(host.free_ram() as f64))
    }
}

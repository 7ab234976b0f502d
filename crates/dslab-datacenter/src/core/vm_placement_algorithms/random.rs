//! Random algorithm.

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::core::host::Host;
use crate::core::vm::VirtualMachine;
use crate::core::vm_placement_algorithm::VMPlacementAlgorithm;

/// Uses a host chosen uniformly at random among suitable hosts.
pub struct RandomFit {
    rand: Pcg64,
}

impl RandomFit {
    pub fn new(seed: u64) -> Self {
        Self {
            rand: Pcg64::seed_from_u64(seed),
        }
    }
}

impl VMPlacementAlgorithm for RandomFit {
    fn select_host(&mut self, vm: &VirtualMachine, hosts: &[Host]) -> Option<usize> {
        let candidates: Vec<usize> = hosts
            .iter()
            .enumerate()
            .filter(|(_, host)| host.can_host(vm))
            .map(|(idx, _)| idx)
            .collect();
        candidates.choose(&mut self.rand).copied()
    }
}

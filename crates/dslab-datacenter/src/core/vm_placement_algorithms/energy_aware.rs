//! Energy Aware algorithm.

use crate::core::host::Host;
use crate::core::vm::VirtualMachine;
use crate::core::vm_placement_algorithm::{select_min_by, VMPlacementAlgorithm};

/// Uses the suitable host with the smallest increase of power draw caused by the VM.
///
/// The VM load is estimated from its long-run mean demand rather than the current sample.
/// The power increase is computed with [`Host::projected_power`], so DVFS level changes caused
/// by the VM are taken into account while the hosts themselves stay untouched.
#[derive(Default)]
pub struct EnergyAware;

impl EnergyAware {
    pub fn new() -> Self {
        Self {}
    }
}

/// Power increase in W caused by adding `demand` MIPS to the host.
pub fn marginal_power(host: &Host, demand: f64) -> f64 {
    host.projected_power(demand) - host.projected_power(0.)
}

impl VMPlacementAlgorithm for EnergyAware {
    fn select_host(&mut self, vm: &VirtualMachine, hosts: &[Host]) -> Option<usize> {
        let demand = vm.mean_demand();
        select_min_by(vm, hosts, |host| marginal_power(host, demand))
    }
}

//! Virtual machine placement algorithms.

use crate::core::config::options::{option_or, parse_config_value, parse_options};
use crate::core::host::Host;
use crate::core::vm::VirtualMachine;
use crate::core::vm_placement_algorithms::best_fit::BestFit;
use crate::core::vm_placement_algorithms::energy_aware::EnergyAware;
use crate::core::vm_placement_algorithms::first_fit::FirstFit;
use crate::core::vm_placement_algorithms::least_utilized::LeastUtilized;
use crate::core::vm_placement_algorithms::most_free_ram::MostFreeRam;
use crate::core::vm_placement_algorithms::most_utilized::MostUtilized;
use crate::core::vm_placement_algorithms::random::RandomFit;
use crate::core::vm_placement_algorithms::worst_fit::WorstFit;
use crate::error::{DatacenterError, Result};

/// Trait for implementation of VM placement algorithms.
///
/// The algorithm is defined as a function of VM and current host states, which returns an index of host
/// selected for VM placement or `None` if there is no suitable host.
/// Only hosts passing [`Host::can_host`] may be selected, powered off hosts are valid candidates.
///
/// When several hosts are equally good, the first of them in the host list is selected.
pub trait VMPlacementAlgorithm {
    fn select_host(&mut self, vm: &VirtualMachine, hosts: &[Host]) -> Option<usize>;
}

impl<F> VMPlacementAlgorithm for F
where
    F: FnMut(&VirtualMachine, &[Host]) -> Option<usize>,
{
    fn select_host(&mut self, vm: &VirtualMachine, hosts: &[Host]) -> Option<usize> {
        self(vm, hosts)
    }
}

/// Returns the candidate with the minimal score among hosts able to host the VM.
/// Ties are resolved in favor of the first host.
pub(crate) fn select_min_by<S>(vm: &VirtualMachine, hosts: &[Host], score: S) -> Option<usize>
where
    S: Fn(&Host) -> f64,
{
    let mut result: Option<usize> = None;
    let mut best_score = f64::INFINITY;
    for (idx, host) in hosts.iter().enumerate() {
        if !host.can_host(vm) {
            continue;
        }
        let host_score = score(host);
        if result.is_none() || host_score < best_score {
            best_score = host_score;
            result = Some(idx);
        }
    }
    result
}

/// Creates placement algorithm by its config value.
///
/// Supported algorithms: `first_fit`, `random`, `least_utilized`, `most_utilized`, `best_fit`,
/// `worst_fit`, `most_free_ram`, `energy_aware`. The random algorithm accepts the `seed` option,
/// e.g. `random[seed=42]`, otherwise `seed` argument is used.
pub fn placement_algorithm_resolver(config_str: &str, seed: u64) -> Result<Box<dyn VMPlacementAlgorithm>> {
    let (algorithm_name, options) = parse_config_value(config_str);
    let options = options.map(|o| parse_options(&o)).unwrap_or_default();
    match algorithm_name.as_str() {
        "first_fit" => Ok(Box::new(FirstFit::new())),
        "random" => Ok(Box::new(RandomFit::new(option_or(&options, "seed", seed, config_str)?))),
        "least_utilized" => Ok(Box::new(LeastUtilized::new())),
        "most_utilized" => Ok(Box::new(MostUtilized::new())),
        "best_fit" => Ok(Box::new(BestFit::new())),
        "worst_fit" => Ok(Box::new(WorstFit::new())),
        "most_free_ram" => Ok(Box::new(MostFreeRam::new())),
        "energy_aware" => Ok(Box::new(EnergyAware::new())),
        _ => Err(DatacenterError::UnknownPlacementAlgorithm(config_str.to_string())),
    }
}

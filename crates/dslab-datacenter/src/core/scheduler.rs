//! Component performing placement of new VMs on hosts.

use crate::core::host::Host;
use crate::core::logger::SharedLogger;
use crate::core::vm::VirtualMachine;
use crate::core::vm_placement_algorithm::{placement_algorithm_resolver, VMPlacementAlgorithm};
use crate::error::Result;

/// Scheduler processes VM placement requests by selecting hosts for running new VMs.
///
/// The placement decision is delegated to the configured VM placement algorithm.
/// If the selected host is powered off, the scheduler starts it and accounts its boot energy.
/// A VM that cannot be placed is returned to the caller, the scheduler never retries on its own.
pub struct Scheduler {
    vm_placement_algorithm: Box<dyn VMPlacementAlgorithm>,
    boot_energy: f64,
    logger: SharedLogger,
}

impl Scheduler {
    /// Creates scheduler with specified VM placement algorithm.
    pub fn new(vm_placement_algorithm: Box<dyn VMPlacementAlgorithm>, logger: SharedLogger) -> Self {
        Self {
            vm_placement_algorithm,
            boot_energy: 0.,
            logger,
        }
    }

    /// Creates scheduler with placement algorithm resolved from its config value.
    pub fn from_config_value(algorithm: &str, seed: u64, logger: SharedLogger) -> Result<Self> {
        Ok(Self::new(placement_algorithm_resolver(algorithm, seed)?, logger))
    }

    pub fn set_placement_algorithm(&mut self, vm_placement_algorithm: Box<dyn VMPlacementAlgorithm>) {
        self.vm_placement_algorithm = vm_placement_algorithm;
    }

    /// Total energy in J spent on starting powered off hosts.
    pub fn boot_energy(&self) -> f64 {
        self.boot_energy
    }

    /// Places VM on a host selected by the placement algorithm, returns ID of this host.
    ///
    /// Returns the VM back if there is no suitable host.
    pub fn schedule(
        &mut self,
        vm: VirtualMachine,
        hosts: &mut [Host],
        time: f64,
    ) -> std::result::Result<u32, VirtualMachine> {
        let selected = self
            .vm_placement_algorithm
            .select_host(&vm, hosts)
            .filter(|idx| hosts.get(*idx).map_or(false, |host| host.can_host(&vm)));
        let idx = match selected {
            Some(idx) => idx,
            None => {
                self.logger
                    .borrow_mut()
                    .log_debug(time, "scheduler", format!("no suitable host for vm #{}", vm.id));
                return Err(vm);
            }
        };

        let host = &mut hosts[idx];
        if !host.is_active() {
            host.power_on();
            self.boot_energy += host.boot_energy();
            self.logger
                .borrow_mut()
                .log_debug(time, "scheduler", format!("host #{} powered on", host.id));
        }
        let vm_id = vm.id;
        match host.allocate(vm) {
            Ok(()) => {
                self.logger
                    .borrow_mut()
                    .log_debug(time, "scheduler", format!("vm #{} allocated on host #{}", vm_id, host.id));
                Ok(host.id)
            }
            Err(vm) => {
                self.logger
                    .borrow_mut()
                    .log_warn(time, "scheduler", format!("host #{} rejected vm #{}", host.id, vm_id));
                Err(vm)
            }
        }
    }
}

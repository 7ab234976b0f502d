//! VM migration strategies run at the end of each simulation step.

use serde::Serialize;

use crate::core::config::options::{option_or, parse_config_value, parse_options};
use crate::core::host::Host;
use crate::core::logger::SharedLogger;
use crate::error::{DatacenterError, Result};

/// Single executed VM migration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Migration {
    pub vm_id: u32,
    pub source_host: u32,
    pub target_host: u32,
}

/// Changes made by a migration strategy during one step.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MigrationOutcome {
    pub migrations: Vec<Migration>,
    pub powered_off: Vec<u32>,
}

/// Strategy that relocates VMs between hosts and powers hosts off.
///
/// Strategies are invoked once per step after power accounting, with exclusive access to the hosts.
pub trait VmMigrationStrategy {
    fn perform_migrations(&mut self, hosts: &mut [Host], time: f64, logger: &SharedLogger) -> MigrationOutcome;
}

impl<F> VmMigrationStrategy for F
where
    F: FnMut(&mut [Host], f64) -> MigrationOutcome,
{
    fn perform_migrations(&mut self, hosts: &mut [Host], time: f64, _logger: &SharedLogger) -> MigrationOutcome {
        self(hosts, time)
    }
}

/// Creates migration strategy by its config value.
///
/// * `disable` - no migrations, idle hosts are powered off.
/// * `Consolidation[underload=0.2,target=0.8]` - consolidation of underutilized hosts, options are optional.
///   `default` is an alias with default thresholds.
pub fn migration_strategy_resolver(config_str: &str) -> Result<Box<dyn VmMigrationStrategy>> {
    let (name, options) = parse_config_value(config_str);
    match name.as_str() {
        "disable" => Ok(Box::new(IdleShutdown::new())),
        "Consolidation" | "default" => {
            let options = options.map(|o| parse_options(&o)).unwrap_or_default();
            Ok(Box::new(ConsolidationMigrator::new(
                option_or(&options, "underload", 0.2, config_str)?,
                option_or(&options, "target", 0.8, config_str)?,
            )))
        }
        _ => Err(DatacenterError::UnknownMigrationStrategy(config_str.to_string())),
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Powers off active hosts without VMs, never moves VMs.
#[derive(Default)]
pub struct IdleShutdown;

impl IdleShutdown {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmMigrationStrategy for IdleShutdown {
    fn perform_migrations(&mut self, hosts: &mut [Host], time: f64, logger: &SharedLogger) -> MigrationOutcome {
        let mut outcome = MigrationOutcome::default();
        for host in hosts.iter_mut().filter(|h| h.is_active() && h.is_empty()) {
            host.power_off();
            logger
                .borrow_mut()
                .log_debug(time, "migrator", format!("host #{} is idle and powered off", host.id));
            outcome.powered_off.push(host.id);
        }
        outcome
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Greedy consolidation of underutilized hosts.
///
/// Hosts with utilization (against unscaled capacity) below `underload_threshold` are drained in ascending
/// utilization order. Each VM of a drained host goes to the first candidate whose projected utilization stays within
/// `target_threshold`, where candidates are not underutilized hosts in ascending utilization order followed by the
/// remaining active hosts. A host is drained only if all its VMs find a target, then it is powered off.
pub struct ConsolidationMigrator {
    underload_threshold: f64,
    target_threshold: f64,
}

impl ConsolidationMigrator {
    pub fn new(underload_threshold: f64, target_threshold: f64) -> Self {
        Self {
            underload_threshold,
            target_threshold,
        }
    }

    /// Finds a target for every VM of the source host, updating the projected utilization.
    /// Returns `None` and leaves the projection unchanged if some VM cannot be placed.
    fn plan_host(
        &self,
        hosts: &[Host],
        src: usize,
        candidates: &[usize],
        projected: &mut [f64],
    ) -> Option<Vec<(u32, usize)>> {
        let mut plan: Vec<(u32, usize, f64)> = Vec::new();
        for vm in hosts[src].vms() {
            let target = candidates.iter().copied().find(|&idx| {
                projected[idx] + vm.cpu / hosts[idx].base_core_capacity() <= self.target_threshold
            });
            match target {
                Some(idx) => {
                    let increment = vm.cpu / hosts[idx].base_core_capacity();
                    projected[idx] += increment;
                    plan.push((vm.id, idx, increment));
                }
                None => {
                    for (_, idx, increment) in plan {
                        projected[idx] -= increment;
                    }
                    return None;
                }
            }
        }
        Some(plan.into_iter().map(|(vm_id, idx, _)| (vm_id, idx)).collect())
    }
}

impl Default for ConsolidationMigrator {
    fn default() -> Self {
        Self::new(0.2, 0.8)
    }
}

impl VmMigrationStrategy for ConsolidationMigrator {
    fn perform_migrations(&mut self, hosts: &mut [Host], time: f64, logger: &SharedLogger) -> MigrationOutcome {
        let mut outcome = MigrationOutcome::default();

        let utilization: Vec<f64> = hosts.iter().map(|h| h.base_cpu_utilization()).collect();
        let by_utilization = |a: &usize, b: &usize| utilization[*a].total_cmp(&utilization[*b]);
        let mut underutilized: Vec<usize> = (0..hosts.len())
            .filter(|&idx| hosts[idx].is_active() && utilization[idx] < self.underload_threshold)
            .collect();
        underutilized.sort_by(by_utilization);
        let mut non_underutilized: Vec<usize> = (0..hosts.len())
            .filter(|&idx| hosts[idx].is_active() && utilization[idx] >= self.underload_threshold)
            .collect();
        non_underutilized.sort_by(by_utilization);

        let mut is_non_underutilized = vec![false; hosts.len()];
        for idx in non_underutilized.iter() {
            is_non_underutilized[*idx] = true;
        }
        let mut projected = utilization.clone();

        for src in underutilized {
            let mut candidates = non_underutilized.clone();
            candidates.extend(
                (0..hosts.len()).filter(|&idx| idx != src && hosts[idx].is_active() && !is_non_underutilized[idx]),
            );

            let plan = match self.plan_host(hosts, src, &candidates, &mut projected) {
                Some(plan) => plan,
                None => {
                    logger.borrow_mut().log_debug(
                        time,
                        "migrator",
                        format!("host #{} cannot migrate all vms, skipping", hosts[src].id),
                    );
                    continue;
                }
            };

            let source_id = hosts[src].id;
            for (vm_id, target) in plan {
                let vm = match hosts[src].deallocate(vm_id) {
                    Some(vm) => vm,
                    None => continue,
                };
                match hosts[target].allocate(vm) {
                    Ok(()) => {
                        let target_id = hosts[target].id;
                        logger.borrow_mut().log_trace(
                            time,
                            "migrator",
                            format!("vm #{} migrated from host #{} to host #{}", vm_id, source_id, target_id),
                        );
                        outcome.migrations.push(Migration {
                            vm_id,
                            source_host: source_id,
                            target_host: target_id,
                        });
                    }
                    Err(vm) => {
                        let _ = hosts[src].allocate(vm);
                    }
                }
            }
            if hosts[src].is_empty() {
                hosts[src].power_off();
                outcome.powered_off.push(source_id);
                logger.borrow_mut().log_debug(
                    time,
                    "migrator",
                    format!("host #{} underutilized, all vms migrated, host powered off", source_id),
                );
            }
        }
        outcome
    }
}

//! Main simulation loop.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use rand::prelude::*;
use rand_pcg::Pcg64;
use serde::Serialize;

use crate::core::config::sim_config::{SimulationConfig, VmTypeConfig};
use crate::core::host::Host;
use crate::core::load_model::{LoadModel, TraceLoadModel};
use crate::core::logger::{shared_logger, Logger, SharedLogger, StdoutLogger};
use crate::core::monitoring::Monitoring;
use crate::core::scheduler::Scheduler;
use crate::core::vm::VirtualMachine;
use crate::core::vm_placement_algorithm::VMPlacementAlgorithm;
use crate::error::{DatacenterError, Result};
use crate::extensions::vm_migrator::{migration_strategy_resolver, VmMigrationStrategy};
use crate::extensions::vm_profile_generator::{validate_profiles, VmProfile};

/// VM waiting for its arrival step.
struct VmRequest {
    vm: VirtualMachine,
    lifetime: Option<u64>,
    load_model: Option<Box<dyn LoadModel>>,
}

/// Bookkeeping of an admitted VM.
struct RunningVm {
    expiration_step: Option<u64>,
    load_model: Option<Box<dyn LoadModel>>,
}

/// Results of a simulation run.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationResult {
    /// Energy in J consumed by hosts.
    pub host_energy: f64,
    /// Energy in J spent on starting powered off hosts.
    pub boot_energy: f64,
    /// Host CPU utilization (against unscaled capacity) at each step.
    pub utilization_history: IndexMap<u32, Vec<f64>>,
    /// Number of running VMs at each step.
    pub active_vm_counts: Vec<usize>,
    pub admitted_vms: u64,
    pub rejected_vms: u64,
    pub completed_vms: u64,
    pub expired_vms: u64,
    pub migrations: u64,
    /// Number of executed steps.
    pub steps: u64,
}

impl SimulationResult {
    pub fn total_energy(&self) -> f64 {
        self.host_energy + self.boot_energy
    }
}

/// Datacenter simulation advancing in fixed time steps.
///
/// Each step performs the following phases:
///
/// 1. VMs arriving at this step are placed by the scheduler, unplaceable VMs are dropped.
/// 2. CPU demand of running VMs is refreshed from their load models, VMs with ended lifetime are removed.
/// 3. The number of running VMs is recorded.
/// 4. Power draw of each host is accounted for the step duration.
/// 5. Cloudlets are executed and VMs with all cloudlets finished are removed.
/// 6. The migration strategy is invoked.
pub struct DatacenterSimulation {
    config: SimulationConfig,
    hosts: Vec<Host>,
    scheduler: Scheduler,
    migration_strategy: Box<dyn VmMigrationStrategy>,
    monitoring: Monitoring,
    logger: SharedLogger,
    arrivals: BTreeMap<u64, Vec<VmRequest>>,
    running: HashMap<u32, RunningVm>,
    finished_vms: Vec<VirtualMachine>,
    vm_types: Vec<VmTypeConfig>,
    rand: Pcg64,

    step: u64,
    time: f64,
    admitted_vms: u64,
    rejected_vms: u64,
    completed_vms: u64,
    expired_vms: u64,
    migrations: u64,
}

impl DatacenterSimulation {
    /// Creates simulation with hosts, placement algorithm and migration strategy from the config.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let logger = shared_logger(StdoutLogger::new());
        let scheduler = Scheduler::from_config_value(&config.placement_algorithm, config.seed, logger.clone())?;
        let migration_strategy = migration_strategy_resolver(&config.migration)?;

        let mut hosts = Vec::with_capacity(config.host_count());
        for (name, host_config) in config.host_names() {
            let mut host = Host::from_config(hosts.len() as u32, name, host_config);
            host.enable_dvfs(config.dvfs_enabled);
            hosts.push(host);
        }

        Ok(Self {
            vm_types: config.vm_types.clone(),
            rand: Pcg64::seed_from_u64(config.seed),
            config,
            hosts,
            scheduler,
            migration_strategy,
            monitoring: Monitoring::new(),
            logger,
            arrivals: BTreeMap::new(),
            running: HashMap::new(),
            finished_vms: Vec::new(),
            step: 0,
            time: 0.,
            admitted_vms: 0,
            rejected_vms: 0,
            completed_vms: 0,
            expired_vms: 0,
            migrations: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Adds host, returns its index in the host list.
    pub fn add_host(&mut self, host: Host) -> usize {
        self.hosts.push(host);
        self.hosts.len() - 1
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn hosts_mut(&mut self) -> &mut [Host] {
        &mut self.hosts
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.iter().find(|h| h.id == host_id)
    }

    /// Returns the host the VM currently resides on.
    pub fn vm_location(&self, vm_id: u32) -> Option<u32> {
        self.hosts
            .iter()
            .find_map(|h| h.vm(vm_id).and_then(|vm| vm.current_host()))
    }

    pub fn monitoring(&self) -> &Monitoring {
        &self.monitoring
    }

    /// Index of the next step to execute.
    pub fn current_step(&self) -> u64 {
        self.step
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Replaces the logger of all simulation components.
    pub fn set_logger<L: Logger + 'static>(&mut self, logger: L) {
        *self.logger.borrow_mut() = Box::new(logger);
    }

    pub fn save_log(&self, path: &str) -> Result<()> {
        self.logger.borrow().save_log(path)
    }

    pub fn set_placement_algorithm(&mut self, algorithm: Box<dyn VMPlacementAlgorithm>) {
        self.scheduler.set_placement_algorithm(algorithm);
    }

    pub fn set_migration_strategy(&mut self, strategy: Box<dyn VmMigrationStrategy>) {
        self.migration_strategy = strategy;
    }

    /// Submits VM arriving at the given step.
    ///
    /// The VM is removed after `lifetime` steps, if set. The load model, if set, drives the CPU demand ratio
    /// of VM cloudlets at each step. Arrival steps in the past are moved to the current step.
    /// A VM arriving while another VM with the same ID is running is dropped and counted as rejected.
    pub fn submit_vm(
        &mut self,
        vm: VirtualMachine,
        arrival_step: u64,
        lifetime: Option<u64>,
        load_model: Option<Box<dyn LoadModel>>,
    ) {
        self.arrivals
            .entry(arrival_step.max(self.step))
            .or_default()
            .push(VmRequest { vm, lifetime, load_model });
    }

    /// Submits online service VMs replaying generated profiles.
    ///
    /// Each VM gets a type chosen at random from the configured VM types.
    pub fn add_vm_profiles(&mut self, profiles: Vec<VmProfile>) -> Result<()> {
        validate_profiles(&profiles, self.config.time_steps)?;
        if self.vm_types.is_empty() {
            return Err(DatacenterError::NoVmTypes);
        }
        for profile in profiles {
            let vm_type = match self.vm_types.choose(&mut self.rand) {
                Some(vm_type) => vm_type.clone(),
                None => return Err(DatacenterError::NoVmTypes),
            };
            let vm = VirtualMachine::online_service(profile.vm_id, vm_type.cpu, vm_type.ram, vm_type.storage);
            let load_model = TraceLoadModel::new(profile.cpu_utilization);
            self.submit_vm(vm, profile.arrival_time, Some(profile.lifetime), Some(Box::new(load_model)));
        }
        Ok(())
    }

    /// VMs released after all their cloudlets have finished.
    pub fn finished_vms(&self) -> &[VirtualMachine] {
        &self.finished_vms
    }

    pub fn pending_arrivals(&self) -> usize {
        self.arrivals.values().map(|requests| requests.len()).sum()
    }

    pub fn active_vm_count(&self) -> usize {
        self.hosts.iter().map(|h| h.vm_count()).sum()
    }

    fn has_unfinished_cloudlets(&self) -> bool {
        self.hosts
            .iter()
            .any(|h| h.vms().iter().any(|vm| vm.has_unfinished_cloudlets()))
    }

    fn admit_arrivals(&mut self) {
        let requests = match self.arrivals.remove(&self.step) {
            Some(requests) => requests,
            None => return,
        };
        for request in requests {
            let mut vm = request.vm;
            if let Some(model) = &request.load_model {
                vm.set_cpu_demand_ratio(model.get_resource_load(self.step, self.time), self.time);
                if let Some(mean) = model.mean_load() {
                    vm.set_trace_mean(mean);
                }
            }
            let vm_id = vm.id;
            if self.running.contains_key(&vm_id) {
                self.rejected_vms += 1;
                self.logger.borrow_mut().log_warn(
                    self.time,
                    "simulation",
                    format!("vm #{} is already running, duplicate dropped", vm_id),
                );
                continue;
            }
            match self.scheduler.schedule(vm, &mut self.hosts, self.time) {
                Ok(_) => {
                    self.admitted_vms += 1;
                    self.running.insert(
                        vm_id,
                        RunningVm {
                            expiration_step: request.lifetime.map(|l| self.step.saturating_add(l)),
                            load_model: request.load_model,
                        },
                    );
                }
                Err(_) => {
                    self.rejected_vms += 1;
                    self.logger.borrow_mut().log_info(
                        self.time,
                        "simulation",
                        format!("vm #{} could not be scheduled", vm_id),
                    );
                }
            }
        }
    }

    fn refresh_running_vms(&mut self) {
        let (step, time) = (self.step, self.time);
        for host in self.hosts.iter_mut() {
            let mut expired = Vec::new();
            for vm in host.vms_mut() {
                let running = match self.running.get(&vm.id) {
                    Some(running) => running,
                    None => continue,
                };
                if running.expiration_step.map_or(false, |exp| step >= exp) {
                    expired.push(vm.id);
                } else if let Some(model) = &running.load_model {
                    vm.set_cpu_demand_ratio(model.get_resource_load(step, time), time);
                }
            }
            for vm_id in expired {
                if host.deallocate(vm_id).is_some() {
                    self.running.remove(&vm_id);
                    self.expired_vms += 1;
                    self.logger.borrow_mut().log_debug(
                        time,
                        "simulation",
                        format!("vm #{} expired on host #{}", vm_id, host.id),
                    );
                }
            }
        }
    }

    fn account_power(&mut self) {
        let duration = self.config.step_duration;
        for host in self.hosts.iter_mut() {
            if host.dvfs_enabled() {
                if let Err(err) = host.update_dvfs() {
                    self.logger.borrow_mut().log_warn(
                        self.time,
                        "simulation",
                        format!("{}, keeping level {}", err, host.current_dvfs_level()),
                    );
                }
            }
            let power = host.power_draw();
            host.energy_meter.update(power, duration);
            self.monitoring
                .record_host(host.id, host.base_cpu_utilization(), power, host.is_active());
            self.logger.borrow_mut().log_trace(
                self.time,
                "simulation",
                format!(
                    "host #{} util {:.2} power {:.2} W level {}",
                    host.id,
                    host.base_cpu_utilization(),
                    power,
                    host.current_dvfs_level()
                ),
            );
        }
    }

    fn execute_cloudlets(&mut self) {
        let (time, duration) = (self.time, self.config.step_duration);
        for host in self.hosts.iter_mut() {
            for (vm_id, cloudlet_id) in host.execute_cloudlets(time, duration) {
                self.logger.borrow_mut().log_debug(
                    time,
                    "simulation",
                    format!("cloudlet #{} of vm #{} finished", cloudlet_id, vm_id),
                );
            }
            for vm in host.release_completed() {
                self.running.remove(&vm.id);
                self.completed_vms += 1;
                self.logger.borrow_mut().log_debug(
                    time,
                    "simulation",
                    format!("vm #{} completed and released from host #{}", vm.id, host.id),
                );
                self.finished_vms.push(vm);
            }
        }
    }

    /// Executes a single simulation step.
    pub fn step(&mut self) {
        self.admit_arrivals();
        self.refresh_running_vms();
        self.monitoring.record_active_vms(self.active_vm_count());
        self.account_power();
        self.execute_cloudlets();

        let outcome = self
            .migration_strategy
            .perform_migrations(&mut self.hosts, self.time, &self.logger);
        self.migrations += outcome.migrations.len() as u64;

        self.step += 1;
        self.time += self.config.step_duration;
    }

    /// Executes `count` simulation steps.
    pub fn steps(&mut self, count: u64) {
        for _ in 0..count {
            self.step();
        }
    }

    /// Runs the simulation until the configured number of steps is reached.
    pub fn run(&mut self) -> SimulationResult {
        while self.step < self.config.time_steps {
            self.step();
        }
        self.result()
    }

    /// Runs the simulation until there are no unfinished cloudlets and no pending arrivals,
    /// but at most `max_steps` steps in total.
    pub fn run_until_complete(&mut self, max_steps: u64) -> SimulationResult {
        while self.step < max_steps {
            if !self.has_unfinished_cloudlets() && self.arrivals.is_empty() {
                break;
            }
            self.step();
        }
        self.result()
    }

    pub fn result(&self) -> SimulationResult {
        SimulationResult {
            host_energy: self.hosts.iter().map(|h| h.energy_meter.energy_consumed()).sum(),
            boot_energy: self.scheduler.boot_energy(),
            utilization_history: self.monitoring.utilization_history(),
            active_vm_counts: self.monitoring.active_vm_counts().to_vec(),
            admitted_vms: self.admitted_vms,
            rejected_vms: self.rejected_vms,
            completed_vms: self.completed_vms,
            expired_vms: self.expired_vms,
            migrations: self.migrations,
            steps: self.step,
        }
    }
}

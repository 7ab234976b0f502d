//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub time_steps: Option<u64>,
    pub step_duration: Option<f64>,
    pub seed: Option<u64>,
    pub placement_algorithm: Option<String>,
    pub dvfs_enabled: Option<bool>,
    pub migration: Option<String>,
    pub hosts: Option<Vec<RawHostConfig>>,
    pub vm_types: Option<Vec<VmTypeConfig>>,
    pub workload: Option<RawWorkloadConfig>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawHostConfig {
    pub name: Option<String>,
    pub name_prefix: Option<String>,
    pub count: Option<u32>,
    pub cores: u32,
    pub core_capacity: f64,
    pub ram: u64,
    pub storage: u64,
    pub cpu_oversubscription: Option<f64>,
    pub ram_oversubscription: Option<f64>,
    pub storage_oversubscription: Option<f64>,
    pub power_idle: Option<f64>,
    pub power_max: Option<f64>,
    pub boot_energy: Option<f64>,
    pub active: Option<bool>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawWorkloadConfig {
    pub trace_dir: String,
    pub lifetime_distribution: String,
    pub arrival_rates: String,
    pub num_initial_vms: usize,
    pub num_peak_arrive: f64,
    pub long_lived_ratio: Option<f64>,
    pub traces_per_host: Option<usize>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Host name.
    /// Should be set if count = 1.
    pub name: Option<String>,
    /// Host name prefix.
    /// Full name is produced by appending host instance number to the prefix.
    pub name_prefix: Option<String>,
    /// Number of such hosts.
    pub count: u32,
    /// Number of CPU cores.
    pub cores: u32,
    /// Capacity of a single core in MIPS.
    pub core_capacity: f64,
    /// RAM capacity in MB.
    pub ram: u64,
    /// Storage capacity in GB.
    pub storage: u64,
    pub cpu_oversubscription: f64,
    pub ram_oversubscription: f64,
    pub storage_oversubscription: f64,
    /// Power consumption of an idle host in W.
    pub power_idle: f64,
    /// Power consumption of a fully loaded host in W.
    pub power_max: f64,
    /// Energy in J spent when a powered off host is started.
    pub boot_energy: f64,
    /// Whether the host is powered on at the start.
    pub active: bool,
}

impl From<RawHostConfig> for HostConfig {
    fn from(raw: RawHostConfig) -> Self {
        Self {
            name: raw.name,
            name_prefix: raw.name_prefix,
            count: raw.count.unwrap_or(1),
            cores: raw.cores,
            core_capacity: raw.core_capacity,
            ram: raw.ram,
            storage: raw.storage,
            cpu_oversubscription: raw.cpu_oversubscription.unwrap_or(1.),
            ram_oversubscription: raw.ram_oversubscription.unwrap_or(1.),
            storage_oversubscription: raw.storage_oversubscription.unwrap_or(1.),
            power_idle: raw.power_idle.unwrap_or(100.),
            power_max: raw.power_max.unwrap_or(250.),
            boot_energy: raw.boot_energy.unwrap_or(500.),
            active: raw.active.unwrap_or(true),
        }
    }
}

/// Resource reservation of a VM type.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct VmTypeConfig {
    /// CPU capacity in MIPS.
    pub cpu: f64,
    /// RAM in MB.
    pub ram: u64,
    /// Storage in GB.
    pub storage: u64,
}

impl VmTypeConfig {
    pub fn new(cpu: f64, ram: u64, storage: u64) -> Self {
        Self { cpu, ram, storage }
    }
}

/// Default VM type catalogue.
pub fn default_vm_types() -> Vec<VmTypeConfig> {
    [1250., 1000., 500., 250.]
        .iter()
        .map(|cpu| VmTypeConfig::new(*cpu, 5, 5))
        .collect()
}

/// Parameters of the generated workload.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct WorkloadConfig {
    /// Directory with utilization trace files.
    pub trace_dir: String,
    /// CSV file with VM lifetime density.
    pub lifetime_distribution: String,
    /// CSV file with normalized VM arrival rate over the day.
    pub arrival_rates: String,
    /// Number of VMs submitted at step 0.
    pub num_initial_vms: usize,
    /// Number of VMs arriving per step at the peak of the arrival rate curve.
    pub num_peak_arrive: f64,
    /// Fraction of initial VMs living through the whole simulation.
    pub long_lived_ratio: f64,
    /// Number of trace files loaded per host for dynamic arrivals.
    pub traces_per_host: usize,
}

impl From<RawWorkloadConfig> for WorkloadConfig {
    fn from(raw: RawWorkloadConfig) -> Self {
        Self {
            trace_dir: raw.trace_dir,
            lifetime_distribution: raw.lifetime_distribution,
            arrival_rates: raw.arrival_rates,
            num_initial_vms: raw.num_initial_vms,
            num_peak_arrive: raw.num_peak_arrive,
            long_lived_ratio: raw.long_lived_ratio.unwrap_or(1.).clamp(0., 1.),
            traces_per_host: raw.traces_per_host.unwrap_or(4),
        }
    }
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Number of simulation steps.
    pub time_steps: u64,
    /// Duration of a simulation step in seconds.
    pub step_duration: f64,
    /// Seed of the random generators.
    pub seed: u64,
    /// VM placement algorithm, see [`placement_algorithm_resolver`](crate::core::vm_placement_algorithm::placement_algorithm_resolver).
    pub placement_algorithm: String,
    /// Whether hosts adjust their DVFS level to utilization.
    pub dvfs_enabled: bool,
    /// VM migration strategy, see [`migration_strategy_resolver`](crate::extensions::vm_migrator::migration_strategy_resolver).
    pub migration: String,
    /// Configurations of physical hosts.
    pub hosts: Vec<HostConfig>,
    /// VM types assigned to generated VMs.
    pub vm_types: Vec<VmTypeConfig>,
    /// Generated workload parameters.
    pub workload: Option<WorkloadConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_steps: 288,
            step_duration: 300.,
            seed: 123,
            placement_algorithm: "first_fit".to_string(),
            dvfs_enabled: false,
            migration: "Consolidation".to_string(),
            hosts: Vec::new(),
            vm_types: default_vm_types(),
            workload: None,
        }
    }
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self> {
        Self::from_yaml_str(&std::fs::read_to_string(file_name)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: RawSimulationConfig = serde_yaml::from_str(yaml)?;
        let default = Self::default();
        Ok(Self {
            time_steps: raw.time_steps.unwrap_or(default.time_steps),
            step_duration: raw.step_duration.unwrap_or(default.step_duration),
            seed: raw.seed.unwrap_or(default.seed),
            placement_algorithm: raw.placement_algorithm.unwrap_or(default.placement_algorithm),
            dvfs_enabled: raw.dvfs_enabled.unwrap_or(default.dvfs_enabled),
            migration: raw.migration.unwrap_or(default.migration),
            hosts: raw
                .hosts
                .unwrap_or_default()
                .into_iter()
                .map(HostConfig::from)
                .collect(),
            vm_types: raw.vm_types.unwrap_or(default.vm_types),
            workload: raw.workload.map(WorkloadConfig::from),
        })
    }

    /// Total number of hosts described by the config.
    pub fn host_count(&self) -> usize {
        self.hosts.iter().map(|h| h.count as usize).sum()
    }

    /// Expands host configs into `(name, config)` pairs in list order.
    ///
    /// Hosts of a group are named by appending the instance number within the group (starting from 0)
    /// to the prefix, a single host with `name` set keeps this name.
    pub fn host_names(&self) -> Vec<(String, &HostConfig)> {
        let mut result = Vec::new();
        for host in &self.hosts {
            if let (1, Some(name)) = (host.count, &host.name) {
                result.push((name.clone(), host));
                continue;
            }
            let prefix = host.name_prefix.as_deref().or(host.name.as_deref()).unwrap_or("host");
            for instance in 0..host.count {
                result.push((format!("{}{}", prefix, instance), host));
            }
        }
        result
    }
}

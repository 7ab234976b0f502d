//! Generator of VM workload profiles.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::core::config::sim_config::{SimulationConfig, WorkloadConfig};
use crate::error::{DatacenterError, Result};
use crate::extensions::arrival_rates::ArrivalRateCurve;
use crate::extensions::lifetime_distribution::LifetimeDistribution;
use crate::extensions::trace_reader::{PlanetLabTraceReader, UtilizationTraceSource};

/// Lifetime in steps of long-lived VMs, never reached within a run.
pub const LONG_LIVED_LIFETIME: u64 = 1_000_000_000;

/// Workload of a single VM.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VmProfile {
    pub vm_id: u32,
    /// Index of the step at which the VM arrives.
    pub arrival_time: u64,
    /// Lifetime in steps.
    pub lifetime: u64,
    /// CPU demand ratio (0-1) of the VM at each simulation step.
    pub cpu_utilization: Vec<f64>,
}

/// Generates VMs present at step 0.
///
/// The first `long_lived_ratio` share of VMs live through the whole run, the rest get lifetimes sampled from
/// the distribution. VM `i` replays trace `i % traces.len()`.
pub fn generate_initial_vm_profiles<R: Rng>(
    num_vms: usize,
    traces: &[Vec<f64>],
    lifetimes: &LifetimeDistribution,
    long_lived_ratio: f64,
    time_steps: u64,
    step_duration: f64,
    rng: &mut R,
) -> Result<Vec<VmProfile>> {
    if num_vms > 0 && traces.is_empty() {
        return Err(DatacenterError::NotEnoughTraces {
            required: num_vms,
            available: 0,
        });
    }
    let num_long_lived = (num_vms as f64 * long_lived_ratio.clamp(0., 1.)) as usize;
    let mut profiles = Vec::with_capacity(num_vms);
    for vm_index in 0..num_vms {
        let lifetime = if vm_index < num_long_lived {
            LONG_LIVED_LIFETIME
        } else {
            lifetimes.sample_steps(rng, step_duration, time_steps)?
        };
        profiles.push(VmProfile {
            vm_id: vm_index as u32,
            arrival_time: 0,
            lifetime,
            cpu_utilization: traces[vm_index % traces.len()].clone(),
        });
    }
    Ok(profiles)
}

/// Generates VMs arriving during the run, `arrivals[t]` VMs at step `t`.
///
/// VM IDs start from `initial_vm_id`, VM with ID `id` replays trace `id % traces.len()`.
pub fn generate_dynamic_vm_profiles<R: Rng>(
    arrivals: &[u64],
    traces: &[Vec<f64>],
    lifetimes: &LifetimeDistribution,
    initial_vm_id: u32,
    time_steps: u64,
    step_duration: f64,
    rng: &mut R,
) -> Result<Vec<VmProfile>> {
    let total: u64 = arrivals.iter().sum();
    if total > 0 && traces.is_empty() {
        return Err(DatacenterError::NotEnoughTraces {
            required: 1,
            available: 0,
        });
    }
    let mut profiles = Vec::with_capacity(total as usize);
    let mut vm_id = initial_vm_id;
    for (step, count) in arrivals.iter().enumerate() {
        for _ in 0..*count {
            profiles.push(VmProfile {
                vm_id,
                arrival_time: step as u64,
                lifetime: lifetimes.sample_steps(rng, step_duration, time_steps)?,
                cpu_utilization: traces[vm_id as usize % traces.len()].clone(),
            });
            vm_id += 1;
        }
    }
    Ok(profiles)
}

/// Checks that VM IDs are unique and every profile has a utilization value for each step.
pub fn validate_profiles(profiles: &[VmProfile], time_steps: u64) -> Result<()> {
    let mut vm_ids = HashSet::new();
    for profile in profiles {
        if !vm_ids.insert(profile.vm_id) {
            return Err(DatacenterError::DuplicateVm { vm_id: profile.vm_id });
        }
        if profile.cpu_utilization.len() as u64 != time_steps {
            return Err(DatacenterError::MissingUtilization {
                vm_id: profile.vm_id,
                length: profile.cpu_utilization.len(),
                required: time_steps as usize,
            });
        }
    }
    Ok(())
}

pub fn save_profiles(profiles: &[VmProfile], path: &str) -> Result<()> {
    serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), profiles)?;
    Ok(())
}

pub fn load_profiles(path: &str) -> Result<Vec<VmProfile>> {
    Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
}

/// Combines trace data with lifetime and arrival rate distributions into a complete workload.
pub struct WorkloadGenerator {
    lifetimes: LifetimeDistribution,
    arrival_rates: ArrivalRateCurve,
    traces: Box<dyn UtilizationTraceSource>,
    num_initial_vms: usize,
    num_peak_arrive: f64,
    long_lived_ratio: f64,
    traces_per_host: usize,
    time_steps: u64,
    step_duration: f64,
    rand: Pcg64,
}

impl WorkloadGenerator {
    pub fn new(
        lifetimes: LifetimeDistribution,
        arrival_rates: ArrivalRateCurve,
        traces: Box<dyn UtilizationTraceSource>,
        workload: &WorkloadConfig,
        time_steps: u64,
        step_duration: f64,
        seed: u64,
    ) -> Self {
        Self {
            lifetimes,
            arrival_rates,
            traces,
            num_initial_vms: workload.num_initial_vms,
            num_peak_arrive: workload.num_peak_arrive,
            long_lived_ratio: workload.long_lived_ratio,
            traces_per_host: workload.traces_per_host,
            time_steps,
            step_duration,
            rand: Pcg64::seed_from_u64(seed),
        }
    }

    /// Creates generator reading distributions and traces from the files named in the workload config.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let workload = config.workload.as_ref().ok_or(DatacenterError::NoWorkload)?;
        Ok(Self::new(
            LifetimeDistribution::from_csv(&workload.lifetime_distribution)?,
            ArrivalRateCurve::from_csv(&workload.arrival_rates)?,
            Box::new(PlanetLabTraceReader::new(&workload.trace_dir, config.seed)),
            workload,
            config.time_steps,
            config.step_duration,
            config.seed,
        ))
    }

    /// Generates initial and dynamic VM profiles sorted by arrival time.
    ///
    /// Initial VMs use one trace each, dynamic VMs share `traces_per_host` traces per host.
    pub fn generate(&mut self, num_hosts: usize) -> Result<Vec<VmProfile>> {
        let time_steps = self.time_steps as usize;
        let initial_traces = self.traces.load_traces(self.num_initial_vms, time_steps)?;
        let mut profiles = generate_initial_vm_profiles(
            self.num_initial_vms,
            &initial_traces,
            &self.lifetimes,
            self.long_lived_ratio,
            self.time_steps,
            self.step_duration,
            &mut self.rand,
        )?;

        let arrivals = self
            .arrival_rates
            .arrivals_per_step(self.time_steps, self.step_duration, self.num_peak_arrive);
        if arrivals.iter().any(|count| *count > 0) {
            let dynamic_traces = self
                .traces
                .load_traces(num_hosts * self.traces_per_host, time_steps)?;
            profiles.extend(generate_dynamic_vm_profiles(
                &arrivals,
                &dynamic_traces,
                &self.lifetimes,
                self.num_initial_vms as u32,
                self.time_steps,
                self.step_duration,
                &mut self.rand,
            )?);
        }
        profiles.sort_by_key(|p| p.arrival_time);
        validate_profiles(&profiles, self.time_steps)?;
        Ok(profiles)
    }
}

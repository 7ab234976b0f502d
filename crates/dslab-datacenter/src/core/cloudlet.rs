//! Unit of computational work executed inside a VM.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::Serialize;

/// Cloudlet is a unit of work measured in million instructions (MI) bound to exactly one VM.
///
/// The share of VM CPU capacity requested by the cloudlet is given by its demand ratio, which may change over
/// time. All changes are recorded in the demand timeline. Once finished, a cloudlet never resumes.
#[derive(Clone, Debug, Serialize)]
pub struct Cloudlet {
    pub id: u32,
    length: f64,
    remaining: f64,
    cpu_demand_ratio: f64,
    finished: bool,
    start_time: Option<f64>,
    end_time: Option<f64>,
    cpu_demand_timeline: BTreeMap<OrderedFloat<f64>, f64>,
    trace_mean: Option<f64>,
}

impl Cloudlet {
    /// Creates cloudlet with `length` MI of work and the initial demand ratio.
    pub fn new(id: u32, length: f64, cpu_demand_ratio: f64) -> Self {
        Self {
            id,
            length,
            remaining: length,
            cpu_demand_ratio: cpu_demand_ratio.clamp(0., 1.),
            finished: false,
            start_time: None,
            end_time: None,
            cpu_demand_timeline: BTreeMap::new(),
            trace_mean: None,
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn cpu_demand_ratio(&self) -> f64 {
        self.cpu_demand_ratio
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<f64> {
        self.end_time
    }

    /// Cached average demand ratio of the workload trace driving this cloudlet.
    pub fn trace_mean(&self) -> Option<f64> {
        self.trace_mean
    }

    pub fn set_trace_mean(&mut self, mean: f64) {
        self.trace_mean = Some(mean);
    }

    /// Recorded demand ratio changes keyed by simulation time.
    pub fn cpu_demand_timeline(&self) -> &BTreeMap<OrderedFloat<f64>, f64> {
        &self.cpu_demand_timeline
    }

    /// Called when the cloudlet is bound to a VM.
    pub(crate) fn assign(&mut self, time: f64) {
        self.start_time = Some(time);
        self.cpu_demand_timeline.insert(OrderedFloat(time), self.cpu_demand_ratio);
    }

    /// Updates the demand ratio and records it in the timeline.
    pub fn set_cpu_demand_ratio(&mut self, ratio: f64, time: f64) {
        self.cpu_demand_ratio = ratio.clamp(0., 1.);
        self.cpu_demand_timeline
            .insert(OrderedFloat(time), self.cpu_demand_ratio);
    }

    /// Executes the cloudlet for `time_step` seconds on a VM with `vm_cpu` MIPS.
    ///
    /// Returns true if the cloudlet has finished during this step.
    pub fn update_execution(&mut self, vm_cpu: f64, time: f64, time_step: f64) -> bool {
        if self.finished {
            return false;
        }
        self.cpu_demand_timeline.insert(OrderedFloat(time), self.cpu_demand_ratio);

        let executed = vm_cpu * self.cpu_demand_ratio * time_step;
        self.remaining -= executed;
        if self.remaining <= 0. {
            self.remaining = 0.;
            self.finished = true;
            self.end_time = Some(time + time_step);
            return true;
        }
        false
    }

    /// Time left until completion at the current demand ratio, `None` if the cloudlet makes no progress.
    pub fn estimated_runtime(&self, vm_cpu: f64) -> Option<f64> {
        let speed = vm_cpu * self.cpu_demand_ratio;
        if speed <= 0. {
            return None;
        }
        Some(self.remaining / speed)
    }
}

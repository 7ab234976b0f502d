//! Resource load models.

use dyn_clone::{clone_trait_object, DynClone};

/// A resource load model defines the CPU demand ratio (0-1) of a VM at each simulation step.
///
/// `step` is the index of the current simulation step and `time` is the current simulation time.
pub trait LoadModel: DynClone {
    fn get_resource_load(&self, step: u64, time: f64) -> f64;

    /// Long-run average load, if the model knows it in advance.
    fn mean_load(&self) -> Option<f64> {
        None
    }
}

clone_trait_object!(LoadModel);

/// The simplest load model, the constant load.
#[derive(Clone)]
pub struct ConstantLoadModel {
    load: f64,
}

impl ConstantLoadModel {
    pub fn new(load: f64) -> Self {
        Self { load }
    }
}

impl LoadModel for ConstantLoadModel {
    fn get_resource_load(&self, _step: u64, _time: f64) -> f64 {
        self.load
    }

    fn mean_load(&self) -> Option<f64> {
        Some(self.load)
    }
}

/// Load model replaying a utilization trace, one value per simulation step.
///
/// Steps beyond the end of the trace repeat the last value.
#[derive(Clone)]
pub struct TraceLoadModel {
    series: Vec<f64>,
    mean: f64,
}

impl TraceLoadModel {
    pub fn new(series: Vec<f64>) -> Self {
        let mean = if series.is_empty() {
            0.
        } else {
            series.iter().sum::<f64>() / series.len() as f64
        };
        Self { series, mean }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl LoadModel for TraceLoadModel {
    fn get_resource_load(&self, step: u64, _time: f64) -> f64 {
        match self.series.get(step as usize) {
            Some(load) => *load,
            None => self.series.last().copied().unwrap_or(0.),
        }
    }

    fn mean_load(&self) -> Option<f64> {
        Some(self.mean)
    }
}

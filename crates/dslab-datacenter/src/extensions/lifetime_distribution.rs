//! Empirical distribution of VM lifetimes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;

use ordered_float::OrderedFloat;
use rand::Rng;
use serde::Deserialize;

use crate::error::{DatacenterError, Result};

/// Number of attempts to sample a lifetime fitting into the simulation horizon.
const MAX_SAMPLE_ATTEMPTS: usize = 10000;

#[derive(Deserialize, Debug)]
struct LifetimeRecord {
    #[serde(rename = "Lifetime (mins)")]
    lifetime: f64,
    #[serde(rename = "Density (%)")]
    density: f64,
}

/// VM lifetime distribution defined by a density curve over lifetime in minutes on logarithmic scale.
///
/// The density is normalized so that its integral over `log10(lifetime)` is 1, then integrated into a CDF
/// which is inverted by linear interpolation. A lifetime is sampled as `10^inverse_cdf(u)` for uniform `u`.
#[derive(Clone, Debug)]
pub struct LifetimeDistribution {
    log_x: Vec<f64>,
    pdf: Vec<f64>,
    cdf: Vec<f64>,
}

impl LifetimeDistribution {
    /// Builds distribution from `(lifetime in minutes, density)` points.
    ///
    /// Densities of duplicate lifetimes are averaged, points are sorted by lifetime.
    pub fn from_points(points: &[(f64, f64)]) -> Result<Self> {
        let mut grouped: BTreeMap<OrderedFloat<f64>, (f64, usize)> = BTreeMap::new();
        for (x, y) in points {
            if !(*x > 0.) || !(*y >= 0.) {
                return Err(DatacenterError::InvalidDistribution(format!(
                    "invalid lifetime point ({}, {})",
                    x, y
                )));
            }
            let entry = grouped.entry(OrderedFloat(*x)).or_insert((0., 0));
            entry.0 += y;
            entry.1 += 1;
        }
        if grouped.len() < 2 {
            return Err(DatacenterError::InvalidDistribution(
                "at least two distinct lifetimes are required".to_string(),
            ));
        }

        let log_x: Vec<f64> = grouped.keys().map(|x| x.into_inner().log10()).collect();
        let y: Vec<f64> = grouped.values().map(|(sum, count)| sum / *count as f64).collect();

        let area = trapezoid(&y, &log_x);
        if !(area > 0.) {
            return Err(DatacenterError::InvalidDistribution(
                "density integrates to zero".to_string(),
            ));
        }
        let pdf: Vec<f64> = y.iter().map(|v| v / area).collect();

        let mut cdf = Vec::with_capacity(pdf.len());
        let mut acc = 0.;
        for i in 0..pdf.len() {
            let delta = if i == 0 { 0. } else { log_x[i] - log_x[i - 1] };
            acc += pdf[i] * delta;
            cdf.push(acc);
        }
        let total = acc;
        if !(total > 0.) {
            return Err(DatacenterError::InvalidDistribution(
                "cumulative density is zero".to_string(),
            ));
        }
        for value in cdf.iter_mut() {
            *value /= total;
        }

        Ok(Self { log_x, pdf, cdf })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut points = Vec::new();
        for record in reader.deserialize() {
            let record: LifetimeRecord = record?;
            points.push((record.lifetime, record.density));
        }
        Self::from_points(&points)
    }

    /// Loads distribution from CSV file with `Lifetime (mins)` and `Density (%)` columns.
    pub fn from_csv(path: &str) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Lifetimes in minutes of the distribution points.
    pub fn lifetimes(&self) -> Vec<f64> {
        self.log_x.iter().map(|x| 10f64.powf(*x)).collect()
    }

    /// Normalized density at the distribution points.
    pub fn pdf(&self) -> &[f64] {
        &self.pdf
    }

    /// Cumulative probability at the distribution points.
    pub fn cdf_values(&self) -> &[f64] {
        &self.cdf
    }

    /// Cumulative probability of `log10(lifetime)`, clamped outside of the distribution domain.
    pub fn cdf(&self, log_x: f64) -> f64 {
        interpolate(&self.log_x, &self.cdf, log_x)
    }

    /// Returns `log10(lifetime)` with cumulative probability `u` (0-1).
    pub fn inverse_cdf(&self, u: f64) -> f64 {
        interpolate(&self.cdf, &self.log_x, u.clamp(0., 1.))
    }

    /// Samples lifetime in minutes.
    pub fn sample_minutes<R: Rng>(&self, rng: &mut R) -> f64 {
        10f64.powf(self.inverse_cdf(rng.gen::<f64>()))
    }

    /// Samples lifetime in simulation steps, re-sampling lifetimes longer than `horizon` steps.
    ///
    /// The lifetime is rounded up to whole steps and is at least one step.
    pub fn sample_steps<R: Rng>(&self, rng: &mut R, step_duration: f64, horizon: u64) -> Result<u64> {
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let steps = minutes_to_steps(self.sample_minutes(rng), step_duration);
            if steps <= horizon {
                return Ok(steps);
            }
        }
        Err(DatacenterError::InvalidDistribution(format!(
            "no lifetime within {} steps after {} attempts",
            horizon, MAX_SAMPLE_ATTEMPTS
        )))
    }
}

/// Converts lifetime in minutes into the number of steps, rounding up.
pub fn minutes_to_steps(minutes: f64, step_duration: f64) -> u64 {
    ((minutes * 60. / step_duration).ceil() as u64).max(1)
}

fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.)
        .sum()
}

/// Piecewise linear interpolation over ascending `xs`, constant outside of the range.
///
/// For repeated `xs` values the first matching segment is used.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if x <= xs[0] {
        return ys[0];
    }
    let last = xs.len() - 1;
    if x >= xs[last] {
        return ys[last];
    }
    let idx = xs.partition_point(|v| *v < x);
    let (x0, x1) = (xs[idx - 1], xs[idx]);
    let (y0, y1) = (ys[idx - 1], ys[idx]);
    if x1 == x0 {
        return y1;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

//! Time-of-day curve of VM arrival rate.

use std::fs::File;
use std::io::Read;

use serde::Deserialize;

use crate::error::{DatacenterError, Result};

const DAY_HOURS: f64 = 24.;

#[derive(Deserialize, Debug)]
struct ArrivalRecord {
    #[serde(rename = "Time (hours)")]
    time: f64,
    #[serde(rename = "Normalized reqs/sec")]
    rate: f64,
}

/// Normalized arrival rate (0-1) over a 24 hour day.
///
/// The curve is linearly interpolated between points and wraps around midnight.
#[derive(Clone, Debug)]
pub struct ArrivalRateCurve {
    hours: Vec<f64>,
    rates: Vec<f64>,
}

impl ArrivalRateCurve {
    /// Builds curve from `(hour, rate)` points, rate is already normalized to 0-1.
    pub fn from_points(points: &[(f64, f64)]) -> Result<Self> {
        if points.is_empty() {
            return Err(DatacenterError::InvalidDistribution(
                "arrival rate curve is empty".to_string(),
            ));
        }
        let mut points: Vec<(f64, f64)> = points
            .iter()
            .map(|(hour, rate)| (hour.rem_euclid(DAY_HOURS), rate.max(0.)))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self {
            hours: points.iter().map(|p| p.0).collect(),
            rates: points.iter().map(|p| p.1).collect(),
        })
    }

    /// Reads CSV with `Time (hours)` and `Normalized reqs/sec` columns, the rate is given in percent.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut points = Vec::new();
        for record in reader.deserialize() {
            let record: ArrivalRecord = record?;
            points.push((record.time, record.rate / 100.));
        }
        Self::from_points(&points)
    }

    pub fn from_csv(path: &str) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Normalized arrival rate at the given time of day in hours.
    pub fn rate_at(&self, hour: f64) -> f64 {
        let hour = hour.rem_euclid(DAY_HOURS);
        let n = self.hours.len();
        if n == 1 {
            return self.rates[0];
        }
        let idx = self.hours.partition_point(|h| *h <= hour);
        // points surrounding the hour, wrapping over midnight
        let (h0, r0, h1, r1) = if idx == 0 {
            (self.hours[n - 1] - DAY_HOURS, self.rates[n - 1], self.hours[0], self.rates[0])
        } else if idx == n {
            (self.hours[n - 1], self.rates[n - 1], self.hours[0] + DAY_HOURS, self.rates[0])
        } else {
            (self.hours[idx - 1], self.rates[idx - 1], self.hours[idx], self.rates[idx])
        };
        if h1 <= h0 {
            return r0;
        }
        r0 + (r1 - r0) * (hour - h0) / (h1 - h0)
    }

    /// Number of VMs arriving at each step, the curve scaled by `peak` and rounded.
    pub fn arrivals_per_step(&self, time_steps: u64, step_duration: f64, peak: f64) -> Vec<u64> {
        (0..time_steps)
            .map(|step| {
                let hour = step as f64 * step_duration / 3600.;
                (self.rate_at(hour) * peak).round().max(0.) as u64
            })
            .collect()
    }
}

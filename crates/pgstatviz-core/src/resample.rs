//! Bounded-point downsampling of chart series.
//!
//! Long ranges are cut into fixed-width buckets starting at the first
//! timestamp; each bucket is labelled by its start and aggregates the points
//! that fall into it. Series at or below the point budget pass through with
//! their exact timestamps.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::units::round_to;

/// Default number of points per plotted series.
pub const MAX_POINTS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Undefined values ignored; an empty bucket is undefined.
    #[default]
    Mean,
    /// Undefined values ignored; an empty bucket is 0.
    Sum,
    /// Undefined values ignored; an empty bucket is undefined.
    Max,
}

impl Aggregation {
    fn apply(self, values: &[f64]) -> Option<f64> {
        match self {
            Aggregation::Mean if values.is_empty() => None,
            Aggregation::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Aggregation::Sum => Some(values.iter().sum()),
            Aggregation::Max => values.iter().copied().reduce(f64::max),
        }
    }
}

/// Bucket assignment for one timestamp axis.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketLayout {
    /// Bucket start timestamps; every bucket from the first to the last point.
    pub starts: Vec<DateTime<Utc>>,
    /// Bucket index of each input point.
    pub index: Vec<usize>,
}

impl BucketLayout {
    /// Aggregates one series (aligned with the input axis) per bucket.
    pub fn aggregate(&self, values: &[Option<f64>], agg: Aggregation) -> Vec<Option<f64>> {
        let mut grouped: Vec<Vec<f64>> = vec![Vec::new(); self.starts.len()];
        for (&idx, v) in self.index.iter().zip(values) {
            if let Some(v) = v {
                grouped[idx].push(*v);
            }
        }
        grouped.iter().map(|g| agg.apply(g)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    budget: usize,
}

impl Default for Resampler {
    fn default() -> Self {
        Self { budget: MAX_POINTS }
    }
}

impl Resampler {
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Bucket width in seconds, rounded to 2 decimals; `None` when the axis
    /// fits in the budget.
    pub fn bucket_width_secs(&self, x: &[DateTime<Utc>]) -> Option<f64> {
        if x.len() <= self.budget || self.budget == 0 {
            return None;
        }
        let span = (x[x.len() - 1] - x[0]).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0;
        let width = round_to(span / self.budget as f64, 2);
        (width > 0.0).then_some(width)
    }

    /// Bucket layout for an axis, `None` for pass-through.
    pub fn layout(&self, x: &[DateTime<Utc>]) -> Option<BucketLayout> {
        let width_secs = self.bucket_width_secs(x)?;
        let width_us = (width_secs * 1_000_000.0).round() as i64;
        let first = x[0];
        let index: Vec<usize> = x
            .iter()
            .map(|t| {
                let offset = (*t - first).num_microseconds().unwrap_or(0).max(0);
                (offset / width_us) as usize
            })
            .collect();
        let count = index.last().map_or(0, |&i| i + 1);
        let starts = (0..count)
            .map(|k| first + Duration::microseconds(width_us * k as i64))
            .collect();
        Some(BucketLayout { starts, index })
    }

    /// Resamples one series. Returns the new axis and values.
    pub fn resample(
        &self,
        x: &[DateTime<Utc>],
        values: &[Option<f64>],
        agg: Aggregation,
    ) -> (Vec<DateTime<Utc>>, Vec<Option<f64>>) {
        match self.layout(x) {
            Some(layout) => {
                let out = layout.aggregate(values, agg);
                (layout.starts, out)
            }
            None => (x.to_vec(), values.to_vec()),
        }
    }
}

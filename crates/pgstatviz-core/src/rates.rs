//! Shared rate computation for every cumulative-counter chart.
//!
//! This module is the single place where per-step deltas become rates. Chart
//! modules describe *what* to differentiate (a counter name or an accessor)
//! and the [`RateEngine`] handles the step rules:
//!
//! - output index 0 is undefined
//! - a step across a reset-epoch boundary is undefined for every counter
//! - a null counter at either endpoint makes that step undefined
//! - a decreasing counter within one epoch yields a negative rate

use crate::model::ResetEpoch;
use crate::series::{CounterSeries, Counters};

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Signed i64 delta; `None` when either side is null.
pub fn delta(curr: Option<i64>, prev: Option<i64>) -> Option<i64> {
    Some(curr? - prev?)
}

/// Default epoch-boundary predicate: the stats-reset token changed.
pub fn epoch_changed(prev: &ResetEpoch, curr: &ResetEpoch) -> bool {
    prev != curr
}

// ---------------------------------------------------------------------------
// RateEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatePeriod {
    Second,
    Minute,
}

impl RatePeriod {
    pub fn secs(self) -> f64 {
        match self {
            RatePeriod::Second => 1.0,
            RatePeriod::Minute => 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateEngine {
    period: RatePeriod,
    /// Applied after delta / interval (e.g. blocks to bytes, bytes to MB).
    scale: f64,
    boundary: fn(&ResetEpoch, &ResetEpoch) -> bool,
}

impl Default for RateEngine {
    fn default() -> Self {
        Self {
            period: RatePeriod::Second,
            scale: 1.0,
            boundary: epoch_changed,
        }
    }
}

impl RateEngine {
    pub fn per_second() -> Self {
        Self::default()
    }

    pub fn per_minute() -> Self {
        Self {
            period: RatePeriod::Minute,
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_boundary(mut self, boundary: fn(&ResetEpoch, &ResetEpoch) -> bool) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn period(&self) -> RatePeriod {
        self.period
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Whether the step `i-1 → i` crosses an epoch boundary.
    pub fn crosses_boundary<T>(&self, series: &CounterSeries<T>, i: usize) -> bool {
        (self.boundary)(&series.reset_epoch(i - 1), &series.reset_epoch(i))
    }

    /// Runs `step(prev, curr, interval)` over every adjacent pair.
    ///
    /// `interval` is in the engine's period. Index 0 and boundary-crossing
    /// steps are `None` without calling `step`.
    pub fn steps<T, R>(
        &self,
        series: &CounterSeries<T>,
        mut step: impl FnMut(&T, &T, f64) -> Option<R>,
    ) -> Vec<Option<R>> {
        let mut out = Vec::with_capacity(series.len());
        out.push(None);
        for i in 1..series.len() {
            if self.crosses_boundary(series, i) {
                out.push(None);
                continue;
            }
            let secs = series.interval_secs(i - 1);
            debug_assert!(secs > 0.0, "zero interval between snapshots {} and {i}", i - 1);
            let interval = secs / self.period.secs();
            let (Some(prev), Some(curr)) = (series.get(i - 1), series.get(i)) else {
                out.push(None);
                continue;
            };
            out.push(step(&prev.data, &curr.data, interval));
        }
        out
    }

    /// Rate of a counter read through `value`.
    pub fn rates_by<T>(
        &self,
        series: &CounterSeries<T>,
        value: impl Fn(&T) -> Option<i64>,
    ) -> Vec<Option<f64>> {
        let scale = self.scale;
        self.steps(series, |prev, curr, interval| {
            delta(value(curr), value(prev)).map(|d| d as f64 / interval * scale)
        })
    }

    /// Rate of a named counter.
    pub fn rates<T: Counters>(&self, series: &CounterSeries<T>, name: &str) -> Vec<Option<f64>> {
        self.rates_by(series, |row| row.counter(name))
    }
}

/// Element-wise sum of the defined parts; undefined only when every part is.
pub fn sum_rates(parts: &[&[Option<f64>]]) -> Vec<Option<f64>> {
    let len = parts.first().map_or(0, |p| p.len());
    (0..len)
        .map(|i| {
            parts
                .iter()
                .filter_map(|p| p[i])
                .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
        })
        .collect()
}

//! Ordered counter series built from snapshot rows.
//!
//! A [`CounterSeries`] gives indexed access to timestamps, reset epochs and
//! any named counter, aligned 1:1 with the snapshots. It never reorders or
//! transforms: callers hand it rows ascending by `tstamp`.

use chrono::{DateTime, Utc};

use crate::model::{ResetEpoch, Snapshot, StatRow};

/// Named access to the cumulative counters of a typed row.
pub trait Counters {
    /// Counter value, `None` when the counter is null or unknown.
    fn counter(&self, name: &str) -> Option<i64>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    /// No snapshots in the requested range.
    EmptySeries,
    /// A row of a different table ended up in the series.
    UnexpectedRow { expected: &'static str },
}

impl std::fmt::Display for SeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySeries => write!(f, "no snapshots in range"),
            Self::UnexpectedRow { expected } => {
                write!(f, "unexpected row type, expected {expected}")
            }
        }
    }
}

impl std::error::Error for SeriesError {}

// ---------------------------------------------------------------------------
// CounterSeries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CounterSeries<T> {
    snapshots: Vec<Snapshot<T>>,
}

impl<T> CounterSeries<T> {
    pub fn new(snapshots: Vec<Snapshot<T>>) -> Result<Self, SeriesError> {
        if snapshots.is_empty() {
            return Err(SeriesError::EmptySeries);
        }
        debug_assert!(
            snapshots.windows(2).all(|w| w[0].tstamp < w[1].tstamp),
            "snapshots must be strictly ascending by tstamp"
        );
        Ok(Self { snapshots })
    }

    /// Builds a typed series from raw rows, unwrapping each row with `extract`.
    pub fn from_rows(
        rows: Vec<Snapshot<StatRow>>,
        expected: &'static str,
        extract: fn(StatRow) -> Option<T>,
    ) -> Result<Self, SeriesError> {
        let snapshots = rows
            .into_iter()
            .map(|s| {
                let Snapshot {
                    tstamp,
                    reset_epoch,
                    data,
                } = s;
                extract(data)
                    .map(|d| Snapshot::new(tstamp, reset_epoch, d))
                    .ok_or(SeriesError::UnexpectedRow { expected })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(snapshots)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false; an empty series cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn tstamp(&self, i: usize) -> DateTime<Utc> {
        self.snapshots[i].tstamp
    }

    pub fn tstamps(&self) -> Vec<DateTime<Utc>> {
        self.snapshots.iter().map(|s| s.tstamp).collect()
    }

    pub fn reset_epoch(&self, i: usize) -> ResetEpoch {
        self.snapshots[i].reset_epoch
    }

    pub fn get(&self, i: usize) -> Option<&Snapshot<T>> {
        self.snapshots.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot<T>> {
        self.snapshots.iter()
    }

    /// Rows in series order.
    pub fn rows(&self) -> impl Iterator<Item = &T> {
        self.snapshots.iter().map(|s| &s.data)
    }

    /// Seconds between the first and last snapshot.
    pub fn span_secs(&self) -> f64 {
        let first = self.snapshots[0].tstamp;
        let last = self.snapshots[self.snapshots.len() - 1].tstamp;
        (last - first).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0
    }

    /// Seconds between snapshot `i` and `i + 1`.
    pub fn interval_secs(&self, i: usize) -> f64 {
        let dt = self.snapshots[i + 1].tstamp - self.snapshots[i].tstamp;
        dt.num_microseconds().unwrap_or(0) as f64 / 1_000_000.0
    }
}

impl<T: Counters> CounterSeries<T> {
    /// One named counter, aligned with [`tstamps`](Self::tstamps).
    pub fn counter(&self, name: &str) -> Vec<Option<i64>> {
        self.snapshots.iter().map(|s| s.data.counter(name)).collect()
    }
}

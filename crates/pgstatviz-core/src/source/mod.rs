//! Snapshot sources.
//!
//! - [`SnapshotSource`]: ordered rows of one `pgstatviz.*` table in a range
//! - [`InfoProvider`]: hostname, port, block size and server version
//!
//! [`PostgresSource`] reads the tables written by the `pg_statviz`
//! extension; [`MemorySource`] serves fixed rows for tests.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
mod queries;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Snapshot, StatTable};

pub use memory::MemorySource;
#[cfg(feature = "postgres")]
pub use postgres::{ConnectionParams, PostgresSource};

/// Error type for snapshot sources.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Connection failed.
    ConnectionError(String),
    /// Query execution failed.
    QueryError(String),
    /// A row could not be decoded.
    Decode(String),
    /// The `pg_statviz` extension is not installed in the database.
    ExtensionMissing,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::ConnectionError(msg) => write!(f, "PostgreSQL: {}", msg),
            SourceError::QueryError(msg) => write!(f, "PostgreSQL query error: {}", msg),
            SourceError::Decode(msg) => write!(f, "decode error: {}", msg),
            SourceError::ExtensionMissing => {
                write!(f, "pg_statviz extension is not installed in this database")
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// Inclusive time range; an open end is unbounded (`-infinity` / `now()`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Builds a range, swapping reversed bounds.
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        match (from, to) {
            (Some(f), Some(t)) if f > t => Self {
                from: Some(t),
                to: Some(f),
            },
            _ => Self { from, to },
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.is_none_or(|f| ts >= f) && self.to.is_none_or(|t| ts <= t)
    }
}

/// Instance metadata used for titles, file names and unit conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceInfo {
    pub hostname: String,
    pub port: u16,
    pub block_size: i64,
    pub server_version_num: i32,
}

pub trait SnapshotSource {
    /// Rows of `table` within `range`, ascending by `tstamp`. May be empty.
    fn fetch(&mut self, table: StatTable, range: &DateRange) -> Result<Vec<Snapshot>, SourceError>;

    /// Latest row of `table` at or before `before`.
    fn baseline(
        &mut self,
        table: StatTable,
        before: Option<DateTime<Utc>>,
    ) -> Result<Option<Snapshot>, SourceError>;
}

pub trait InfoProvider {
    fn info(&mut self) -> Result<InstanceInfo, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reversed_range_is_swapped() {
        let a = Utc.timestamp_opt(100, 0).unwrap();
        let b = Utc.timestamp_opt(200, 0).unwrap();
        let r = DateRange::new(Some(b), Some(a));
        assert_eq!(r.from, Some(a));
        assert_eq!(r.to, Some(b));
        assert!(r.contains(a) && r.contains(b));
        assert!(!r.contains(Utc.timestamp_opt(201, 0).unwrap()));
    }

    #[test]
    fn open_range_contains_everything() {
        let r = DateRange::unbounded();
        assert!(r.contains(Utc.timestamp_opt(0, 0).unwrap()));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            SourceError::ConnectionError("connection refused".into()).to_string(),
            "PostgreSQL: connection refused"
        );
        assert_eq!(
            SourceError::ExtensionMissing.to_string(),
            "pg_statviz extension is not installed in this database"
        );
    }
}

//! In-memory snapshot source.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{DateRange, InfoProvider, InstanceInfo, SnapshotSource, SourceError};
use crate::model::{Snapshot, StatTable};
use crate::units::DEFAULT_BLOCK_SIZE;

/// Serves fixed rows per table, applying the same range filter, ordering
/// and row caps as the database.
#[derive(Debug, Clone)]
pub struct MemorySource {
    info: InstanceInfo,
    tables: HashMap<StatTable, Vec<Snapshot>>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new(InstanceInfo {
            hostname: "localhost".to_string(),
            port: 5432,
            block_size: DEFAULT_BLOCK_SIZE,
            server_version_num: 170000,
        })
    }
}

impl MemorySource {
    pub fn new(info: InstanceInfo) -> Self {
        Self {
            info,
            tables: HashMap::new(),
        }
    }

    pub fn with_rows(mut self, table: StatTable, rows: Vec<Snapshot>) -> Self {
        self.insert(table, rows);
        self
    }

    pub fn insert(&mut self, table: StatTable, mut rows: Vec<Snapshot>) {
        rows.sort_by_key(|s| s.tstamp);
        self.tables.insert(table, rows);
    }
}

impl SnapshotSource for MemorySource {
    fn fetch(&mut self, table: StatTable, range: &DateRange) -> Result<Vec<Snapshot>, SourceError> {
        let cap = table.row_cap().map_or(usize::MAX, |n| n as usize);
        Ok(self
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|s| range.contains(s.tstamp))
                    .take(cap)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn baseline(
        &mut self,
        table: StatTable,
        before: Option<DateTime<Utc>>,
    ) -> Result<Option<Snapshot>, SourceError> {
        let Some(before) = before else {
            return Ok(None);
        };
        Ok(self
            .tables
            .get(&table)
            .and_then(|rows| rows.iter().rev().find(|s| s.tstamp <= before).cloned()))
    }
}

impl InfoProvider for MemorySource {
    fn info(&mut self) -> Result<InstanceInfo, SourceError> {
        Ok(self.info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnRow, ResetEpoch, StatRow, WalRow};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn wal(secs: i64) -> Snapshot {
        Snapshot::new(
            ts(secs),
            ResetEpoch::NONE,
            StatRow::Wal(WalRow {
                wal_bytes: Some(secs),
            }),
        )
    }

    #[test]
    fn fetch_filters_and_orders() {
        let mut src =
            MemorySource::default().with_rows(StatTable::Wal, vec![wal(30), wal(10), wal(20)]);
        let rows = src
            .fetch(StatTable::Wal, &DateRange::new(Some(ts(15)), None))
            .unwrap();
        let secs: Vec<_> = rows.iter().map(|s| s.tstamp).collect();
        assert_eq!(secs, vec![ts(20), ts(30)]);
        assert!(src.fetch(StatTable::Io, &DateRange::unbounded()).unwrap().is_empty());
    }

    #[test]
    fn conn_rows_are_capped() {
        let rows = (0..1100)
            .map(|i| Snapshot::new(ts(i), ResetEpoch::NONE, StatRow::Conn(ConnRow::default())))
            .collect();
        let mut src = MemorySource::default().with_rows(StatTable::Conn, rows);
        let fetched = src.fetch(StatTable::Conn, &DateRange::unbounded()).unwrap();
        assert_eq!(fetched.len(), 1000);
    }

    #[test]
    fn baseline_is_latest_at_or_before() {
        let mut src = MemorySource::default().with_rows(StatTable::Wal, vec![wal(0), wal(10)]);
        let b = src.baseline(StatTable::Wal, Some(ts(10))).unwrap().unwrap();
        assert_eq!(b.tstamp, ts(10));
        let b = src.baseline(StatTable::Wal, Some(ts(5))).unwrap().unwrap();
        assert_eq!(b.tstamp, ts(0));
        assert!(src.baseline(StatTable::Wal, None).unwrap().is_none());
    }
}

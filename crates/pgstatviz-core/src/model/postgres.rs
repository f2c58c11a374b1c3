//! Typed rows of the `pgstatviz.*` snapshot tables.
//!
//! Scalar tables (`buf`, `db`, `wal`) expose their cumulative counters by name
//! through [`Counters`], which is what the rate engine consumes. Tables with a
//! JSON breakdown column (`io`, `lock`, `wait`, `conn`, `repl`, `slru`) carry
//! the decoded entries; their category keys are defined here as well.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::series::Counters;

// ---------------------------------------------------------------------------
// Scalar tables
// ---------------------------------------------------------------------------

/// Buffer and checkpoint counters.
///
/// Source: `pgstatviz.buf` (snapshot of `pg_stat_bgwriter`, plus
/// `pg_stat_checkpointer` on PostgreSQL 17+).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BufRow {
    /// Buffers written during checkpoints.
    pub buffers_checkpoint: Option<i64>,
    /// Buffers written by the background writer.
    pub buffers_clean: Option<i64>,
    /// Buffers written directly by backends. Null from PostgreSQL 17 on.
    pub buffers_backend: Option<i64>,
    /// Requested checkpoints.
    pub checkpoints_req: Option<i64>,
    /// Scheduled checkpoints.
    pub checkpoints_timed: Option<i64>,
}

impl Counters for BufRow {
    fn counter(&self, name: &str) -> Option<i64> {
        match name {
            "buffers_checkpoint" => self.buffers_checkpoint,
            "buffers_clean" => self.buffers_clean,
            "buffers_backend" => self.buffers_backend,
            "checkpoints_req" => self.checkpoints_req,
            "checkpoints_timed" => self.checkpoints_timed,
            _ => None,
        }
    }
}

/// Database-wide counters.
///
/// Source: `pgstatviz.db` (snapshot of `pg_stat_database` for the current database).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DbRow {
    pub xact_commit: Option<i64>,
    pub xact_rollback: Option<i64>,
    pub blks_read: Option<i64>,
    pub blks_hit: Option<i64>,
    pub tup_returned: Option<i64>,
    pub tup_fetched: Option<i64>,
    pub tup_inserted: Option<i64>,
    pub tup_updated: Option<i64>,
    pub tup_deleted: Option<i64>,
    /// Null when data checksums are disabled.
    pub checksum_failures: Option<i64>,
    /// Time of the last checksum failure (epoch microseconds).
    pub checksum_last_failure: Option<i64>,
}

impl Counters for DbRow {
    fn counter(&self, name: &str) -> Option<i64> {
        match name {
            "xact_commit" => self.xact_commit,
            "xact_rollback" => self.xact_rollback,
            "blks_read" => self.blks_read,
            "blks_hit" => self.blks_hit,
            "tup_returned" => self.tup_returned,
            "tup_fetched" => self.tup_fetched,
            "tup_inserted" => self.tup_inserted,
            "tup_updated" => self.tup_updated,
            "tup_deleted" => self.tup_deleted,
            "checksum_failures" => self.checksum_failures,
            _ => None,
        }
    }
}

/// WAL generation counter.
///
/// Source: `pgstatviz.wal` (snapshot of `pg_stat_wal`, PostgreSQL 15+).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WalRow {
    pub wal_bytes: Option<i64>,
}

impl Counters for WalRow {
    fn counter(&self, name: &str) -> Option<i64> {
        match name {
            "wal_bytes" => self.wal_bytes,
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Breakdown tables
// ---------------------------------------------------------------------------

/// I/O statistics by backend type, object and context.
///
/// Source: `pgstatviz.io.io_stats` (JSON array built from `pg_stat_io`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IoRow {
    pub io_stats: Vec<IoEntry>,
}

/// One `pg_stat_io` row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IoEntry {
    pub backend_type: String,
    pub object: String,
    pub context: String,
    /// Read operations, in blocks. Null for backend types that never read.
    #[serde(default)]
    pub reads: Option<i64>,
    /// Write operations, in blocks.
    #[serde(default)]
    pub writes: Option<i64>,
    /// Bytes read (PostgreSQL 18+).
    #[serde(default)]
    pub read_bytes: Option<i64>,
    /// Bytes written (PostgreSQL 18+).
    #[serde(default)]
    pub write_bytes: Option<i64>,
}

impl IoEntry {
    pub fn kind(&self) -> IoKind {
        IoKind {
            backend_type: self.backend_type.clone(),
            object: self.object.clone(),
            context: self.context.clone(),
        }
    }

    pub fn is_kind(&self, kind: &IoKind) -> bool {
        self.backend_type == kind.backend_type
            && self.object == kind.object
            && self.context == kind.context
    }
}

/// Category key of an I/O entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IoKind {
    pub backend_type: String,
    pub object: String,
    pub context: String,
}

impl IoKind {
    /// Legend label: `backend_type/context`, prefixed with the object for
    /// temp relations.
    pub fn label(&self) -> String {
        if self.object == "temp relation" {
            format!("{}/{}/{}", self.object, self.backend_type, self.context)
        } else {
            format!("{}/{}", self.backend_type, self.context)
        }
    }
}

/// Lock counts by mode.
///
/// Source: `pgstatviz.lock`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LockRow {
    pub locks_total: i64,
    pub locks: Vec<LockEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LockEntry {
    #[serde(default)]
    pub lock_mode: Option<String>,
    #[serde(default)]
    pub lock_count: i64,
}

/// Wait event counts.
///
/// Source: `pgstatviz.wait`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WaitRow {
    pub wait_events_total: i64,
    pub wait_events: Vec<WaitEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WaitEntry {
    #[serde(default)]
    pub wait_event_type: Option<String>,
    #[serde(default)]
    pub wait_event: Option<String>,
    #[serde(default)]
    pub wait_event_count: i64,
}

impl WaitEntry {
    /// Category key; entries without an event name are not categorized.
    pub fn kind(&self) -> Option<WaitKind> {
        let event = self.wait_event.clone()?;
        Some(WaitKind {
            event_type: self.wait_event_type.clone().unwrap_or_default(),
            event,
        })
    }
}

/// Category key of a wait event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaitKind {
    pub event_type: String,
    pub event: String,
}

impl WaitKind {
    pub fn label(&self) -> String {
        format!("{}/{}", self.event_type, self.event)
    }
}

/// Connection counts by state and by user.
///
/// Source: `pgstatviz.conn`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnRow {
    pub conn_total: i64,
    pub conn_active: i64,
    pub conn_idle: i64,
    pub conn_idle_trans: i64,
    pub conn_idle_trans_abort: i64,
    pub conn_fastpath: i64,
    pub conn_users: Vec<ConnUser>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnUser {
    pub user: String,
    #[serde(default)]
    pub connections: i64,
}

/// Standby lag and slot retention.
///
/// Source: `pgstatviz.repl`. Both lists are null when the server has no
/// standbys or no slots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplRow {
    pub standby_lag: Option<Vec<StandbyLag>>,
    pub slot_stats: Option<Vec<SlotStat>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StandbyLag {
    pub application_name: String,
    #[serde(default)]
    pub lag_bytes: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotStat {
    pub slot_name: String,
    #[serde(default)]
    pub wal_bytes: Option<i64>,
}

/// SLRU cache statistics.
///
/// Source: `pgstatviz.slru` (snapshot of `pg_stat_slru`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlruRow {
    pub slru_stats: Option<Vec<SlruStat>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlruStat {
    pub name: String,
    #[serde(default)]
    pub blks_hit: i64,
    #[serde(default)]
    pub blks_read: i64,
}

impl SlruStat {
    /// Hit percentage, 0 when the cache saw no traffic.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.blks_hit + self.blks_read;
        if total > 0 {
            self.blks_hit as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Server configuration at snapshot time.
///
/// Source: `pgstatviz.conf` (JSON object of parameter → setting).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfRow {
    pub conf: BTreeMap<String, serde_json::Value>,
}

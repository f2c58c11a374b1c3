//! Snapshot envelope shared by every stat domain.
//!
//! A snapshot is one row of a `pgstatviz.*` table: the collection instant,
//! the stats-reset token that was current at that instant, and the
//! domain-specific payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::postgres::{
    BufRow, ConfRow, ConnRow, DbRow, IoRow, LockRow, ReplRow, SlruRow, WaitRow, WalRow,
};

/// Stats-reset token of a snapshot.
///
/// Source: `stats_reset` column, as microseconds since the Unix epoch.
/// `None` means the view never reported a reset; two `None` tokens are equal,
/// so such rows all belong to the same epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ResetEpoch(pub Option<i64>);

impl ResetEpoch {
    /// Epoch token for tables that carry no `stats_reset` column.
    pub const NONE: ResetEpoch = ResetEpoch(None);

    pub fn from_micros(micros: Option<i64>) -> Self {
        Self(micros)
    }
}

/// One collection instant of one stat domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T = StatRow> {
    /// Source: `snapshot_tstamp`.
    pub tstamp: DateTime<Utc>,
    pub reset_epoch: ResetEpoch,
    pub data: T,
}

impl<T> Snapshot<T> {
    pub fn new(tstamp: DateTime<Utc>, reset_epoch: ResetEpoch, data: T) -> Self {
        Self {
            tstamp,
            reset_epoch,
            data,
        }
    }
}

/// Domain payload of a snapshot row.
///
/// StatRow is a tagged union over the `pgstatviz.*` tables. Several chart
/// modules read the same table (checkpoints come from `buf`; transactions,
/// tuples, cache and checksums come from `db`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StatRow {
    /// Source: `pgstatviz.buf`
    Buf(BufRow),
    /// Source: `pgstatviz.db`
    Db(DbRow),
    /// Source: `pgstatviz.wal`
    Wal(WalRow),
    /// Source: `pgstatviz.io`
    Io(IoRow),
    /// Source: `pgstatviz.lock`
    Lock(LockRow),
    /// Source: `pgstatviz.wait`
    Wait(WaitRow),
    /// Source: `pgstatviz.conn`
    Conn(ConnRow),
    /// Source: `pgstatviz.repl`
    Repl(ReplRow),
    /// Source: `pgstatviz.slru`
    Slru(SlruRow),
    /// Source: `pgstatviz.conf`
    Conf(ConfRow),
}

macro_rules! stat_row_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(self) -> Option<$ty> {
            match self {
                StatRow::$variant(row) => Some(row),
                _ => None,
            }
        }
    };
}

impl StatRow {
    stat_row_accessor!(into_buf, Buf, BufRow);
    stat_row_accessor!(into_db, Db, DbRow);
    stat_row_accessor!(into_wal, Wal, WalRow);
    stat_row_accessor!(into_io, Io, IoRow);
    stat_row_accessor!(into_lock, Lock, LockRow);
    stat_row_accessor!(into_wait, Wait, WaitRow);
    stat_row_accessor!(into_conn, Conn, ConnRow);
    stat_row_accessor!(into_repl, Repl, ReplRow);
    stat_row_accessor!(into_slru, Slru, SlruRow);
    stat_row_accessor!(into_conf, Conf, ConfRow);
}

/// Source table behind a chart module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatTable {
    Buf,
    Db,
    Wal,
    Io,
    Lock,
    Wait,
    Conn,
    Repl,
    Slru,
    Conf,
}

impl StatTable {
    pub fn name(self) -> &'static str {
        match self {
            StatTable::Buf => "buf",
            StatTable::Db => "db",
            StatTable::Wal => "wal",
            StatTable::Io => "io",
            StatTable::Lock => "lock",
            StatTable::Wait => "wait",
            StatTable::Conn => "conn",
            StatTable::Repl => "repl",
            StatTable::Slru => "slru",
            StatTable::Conf => "conf",
        }
    }

    /// Whether the table records the view's `stats_reset`.
    pub fn has_stats_reset(self) -> bool {
        matches!(
            self,
            StatTable::Buf | StatTable::Db | StatTable::Wal | StatTable::Io
        )
    }

    /// Soft cap on rows read for one analysis pass.
    pub fn row_cap(self) -> Option<i64> {
        match self {
            StatTable::Conn => Some(1000),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pgstatviz.{}", self.name())
    }
}

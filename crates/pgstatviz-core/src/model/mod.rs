//! Data models for snapshot rows.
//!
//! - [`snapshot`]: the envelope (`tstamp`, `reset_epoch`) and the tagged
//!   [`StatRow`] payload
//! - [`postgres`]: typed rows and category keys per `pgstatviz.*` table

mod postgres;
mod snapshot;

pub use postgres::{
    BufRow, ConfRow, ConnRow, ConnUser, DbRow, IoEntry, IoKind, IoRow, LockEntry, LockRow,
    ReplRow, SlotStat, SlruRow, SlruStat, StandbyLag, WaitEntry, WaitKind, WaitRow, WalRow,
};
pub use snapshot::{ResetEpoch, Snapshot, StatRow, StatTable};

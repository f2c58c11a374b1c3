//! pgstatviz-core - time-series analysis of `pg_statviz` snapshots.
//!
//! Provides:
//! - `model` - typed snapshot rows per `pgstatviz.*` table, reset epochs
//! - `series` - ordered counter series with named counter access
//! - `rates` - delta/rate engine with reset-epoch boundaries
//! - `align` - per-category alignment of breakdown tables
//! - `units` - block/byte conversion and rounding
//! - `resample` - time-bucket downsampling to a point budget
//! - `chart` - chart model and renderers
//! - `source` - snapshot sources (PostgreSQL, in-memory)
//! - `analysis` - one chart module per domain, and the runner
//! - `util` - date range parsing and helpers
//!
//! With `postgres` feature (default):
//! - `source::PostgresSource` - reads the `pgstatviz` schema over libpq

pub mod align;
pub mod analysis;
pub mod chart;
pub mod model;
pub mod rates;
pub mod resample;
pub mod series;
pub mod source;
pub mod units;
pub mod util;

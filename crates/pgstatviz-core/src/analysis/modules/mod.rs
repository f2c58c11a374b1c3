//! One chart module per `pgstatviz.*` domain.

pub mod buf;
pub mod cache;
pub mod checkp;
pub mod checksum;
pub mod conf;
pub mod conn;
pub mod io;
pub mod lock;
pub mod repl;
pub mod slru;
pub mod tuple;
pub mod wait;
pub mod wal;
pub mod xact;

use crate::align::Aligned;
use crate::chart::{Panel, Series};
use crate::resample::Aggregation;

/// Counter values as plot values.
pub(crate) fn as_values(counts: Vec<Option<i64>>) -> Vec<Option<f64>> {
    counts.into_iter().map(|v| v.map(|x| x as f64)).collect()
}

/// Adds one suppressible series per aligned category.
pub(crate) fn with_categories<K>(
    panel: Panel,
    aligned: Vec<Aligned<K>>,
    label: impl Fn(&K) -> String,
    aggregation: Aggregation,
) -> Panel {
    aligned.into_iter().fold(panel, |panel, a| {
        panel.with_series(Series::category(label(&a.key), a.values).aggregated(aggregation))
    })
}

//! Lock counts by lock mode.

use crate::align::{Aligned, CategoricalAligner};
use crate::analysis::modules::with_categories;
use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel, Series};
use crate::model::{LockRow, StatRow, StatTable};
use crate::resample::Aggregation;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;

/// Lock count per mode at snapshot time; entries without a mode are ignored.
pub fn lock_counts(series: &CounterSeries<LockRow>) -> Vec<Aligned<String>> {
    CategoricalAligner::discover(series, |row: &LockRow| {
        row.locks.iter().filter_map(|l| l.lock_mode.clone()).collect()
    })
    .align(series, |row, mode| {
        row.locks
            .iter()
            .rev()
            .find(|l| l.lock_mode.as_ref() == Some(mode))
            .map(|l| Some(l.lock_count as f64))
    })
}

pub struct LockModule;

impl ChartModule for LockModule {
    fn id(&self) -> &'static str {
        "lock"
    }

    fn description(&self) -> &'static str {
        "locks"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Lock, StatRow::into_lock)?;
        let total: Vec<Option<f64>> = series.rows().map(|r| Some(r.locks_total as f64)).collect();
        let panel = with_categories(
            Panel::new("Locks", "Lock count (at time of snapshot)", series.tstamps()),
            lock_counts(&series),
            String::clone,
            Aggregation::Mean,
        )
        .with_series(Series::new("Total", total));
        Ok(vec![ctx.chart("lock").with_panel(ctx.fit(panel))])
    }
}

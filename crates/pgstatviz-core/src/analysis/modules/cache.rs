//! Buffer cache hit ratio.

use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel, Series};
use crate::model::{DbRow, StatRow, StatTable};
use crate::series::CounterSeries;
use crate::source::SnapshotSource;
use crate::units::round_to;

/// Hit percentage, two decimals. Undefined when nothing was read yet.
pub fn hit_ratio(blks_hit: i64, blks_read: i64) -> Option<f64> {
    let total = blks_hit + blks_read;
    if total == 0 {
        return None;
    }
    Some(round_to(blks_hit as f64 / total as f64 * 100.0, 2))
}

/// Per-snapshot hit ratio; undefined where either counter is null.
pub fn hit_ratios(series: &CounterSeries<DbRow>) -> Vec<Option<f64>> {
    series
        .rows()
        .map(|row| hit_ratio(row.blks_hit?, row.blks_read?))
        .collect()
}

pub struct CacheModule;

impl ChartModule for CacheModule {
    fn id(&self) -> &'static str {
        "cache"
    }

    fn description(&self) -> &'static str {
        "cache hit ratio"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Db, StatRow::into_db)?;
        let panel = Panel::new("Cache hit ratio", "Cache hit %", series.tstamps())
            .with_series(Series::new("hit ratio", hit_ratios(&series)));
        Ok(vec![ctx.chart("cache").with_panel(ctx.fit(panel))])
    }
}

//! Data checksum failures.

use tracing::debug;

use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel, Series};
use crate::model::{DbRow, StatRow, StatTable};
use crate::resample::Aggregation;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;

/// Cumulative failures; null (checksums disabled) plots as 0.
pub fn failures(series: &CounterSeries<DbRow>) -> Vec<Option<f64>> {
    series
        .rows()
        .map(|row| Some(row.checksum_failures.unwrap_or(0) as f64))
        .collect()
}

pub struct ChecksumModule;

impl ChartModule for ChecksumModule {
    fn id(&self) -> &'static str {
        "checksum"
    }

    fn description(&self) -> &'static str {
        "checksum failure"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Db, StatRow::into_db)?;
        if let Some(last) = series.rows().filter_map(|r| r.checksum_last_failure).max() {
            debug!(last_failure_us = last, "checksum failures recorded");
        }
        let panel = Panel::new(
            "Checksum failures",
            "Cumulative checksum failures",
            series.tstamps(),
        )
        .with_series(
            Series::new("Checksum failures", failures(&series)).aggregated(Aggregation::Max),
        );
        Ok(vec![ctx.chart("checksum").with_panel(ctx.fit(panel))])
    }
}

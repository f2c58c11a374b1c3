//! Wait events by type and event name.

use crate::align::{Aligned, CategoricalAligner};
use crate::analysis::modules::with_categories;
use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel, Series};
use crate::model::{StatRow, StatTable, WaitKind, WaitRow};
use crate::resample::Aggregation;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;

/// Waiters per `(type, event)` at snapshot time. Entries without an event
/// name only count towards the total.
pub fn wait_counts(series: &CounterSeries<WaitRow>) -> Vec<Aligned<WaitKind>> {
    CategoricalAligner::discover(series, |row: &WaitRow| {
        row.wait_events.iter().filter_map(|e| e.kind()).collect()
    })
    .align(series, |row, kind| {
        row.wait_events
            .iter()
            .rev()
            .find(|e| e.kind().as_ref() == Some(kind))
            .map(|e| Some(e.wait_event_count as f64))
    })
}

pub struct WaitModule;

impl ChartModule for WaitModule {
    fn id(&self) -> &'static str {
        "wait"
    }

    fn description(&self) -> &'static str {
        "wait events"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Wait, StatRow::into_wait)?;
        let total: Vec<Option<f64>> = series
            .rows()
            .map(|r| Some(r.wait_events_total as f64))
            .collect();
        let panel = with_categories(
            Panel::new(
                "Wait events",
                "Wait event count (at time of snapshot)",
                series.tstamps(),
            ),
            wait_counts(&series),
            WaitKind::label,
            Aggregation::Mean,
        )
        .with_series(Series::new("Total", total));
        Ok(vec![ctx.chart("wait").with_panel(ctx.fit(panel))])
    }
}

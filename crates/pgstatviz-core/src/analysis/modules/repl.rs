//! Standby lag and replication slot WAL retention.

use crate::align::{Aligned, CategoricalAligner};
use crate::analysis::modules::with_categories;
use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel};
use crate::model::{ReplRow, SlotStat, StandbyLag, StatRow, StatTable};
use crate::resample::Aggregation;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;

fn standbys(row: &ReplRow) -> &[StandbyLag] {
    row.standby_lag.as_deref().unwrap_or_default()
}

fn slots(row: &ReplRow) -> &[SlotStat] {
    row.slot_stats.as_deref().unwrap_or_default()
}

/// Lag in bytes per standby `application_name`; null lag plots as 0.
pub fn standby_lag(series: &CounterSeries<ReplRow>) -> Vec<Aligned<String>> {
    CategoricalAligner::discover(series, |row: &ReplRow| {
        standbys(row).iter().map(|s| s.application_name.clone()).collect()
    })
    .align(series, |row, name| {
        standbys(row)
            .iter()
            .rev()
            .find(|s| &s.application_name == name)
            .map(|s| s.lag_bytes.map(|b| b as f64))
    })
}

/// Retained WAL in bytes per slot; null retention plots as 0.
pub fn slot_retention(series: &CounterSeries<ReplRow>) -> Vec<Aligned<String>> {
    CategoricalAligner::discover(series, |row: &ReplRow| {
        slots(row).iter().map(|s| s.slot_name.clone()).collect()
    })
    .align(series, |row, name| {
        slots(row)
            .iter()
            .rev()
            .find(|s| &s.slot_name == name)
            .map(|s| s.wal_bytes.map(|b| b as f64))
    })
}

pub struct ReplModule;

impl ChartModule for ReplModule {
    fn id(&self) -> &'static str {
        "repl"
    }

    fn description(&self) -> &'static str {
        "replication"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Repl, StatRow::into_repl)?;
        let x = series.tstamps();
        let lag = with_categories(
            Panel::new("Standby replication lag", "Lag (bytes)", x.clone()),
            standby_lag(&series),
            String::clone,
            Aggregation::Max,
        );
        let retention = with_categories(
            Panel::new("Replication slot WAL retention", "WAL retention (bytes)", x),
            slot_retention(&series),
            String::clone,
            Aggregation::Max,
        );
        Ok(vec![
            ctx.chart("repl")
                .with_panel(ctx.fit(lag))
                .with_panel(ctx.fit(retention)),
        ])
    }
}

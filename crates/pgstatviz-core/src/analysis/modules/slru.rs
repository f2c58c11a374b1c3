//! SLRU cache hit ratios and block reads.

use crate::align::{Aligned, CategoricalAligner};
use crate::analysis::modules::with_categories;
use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel};
use crate::model::{SlruRow, SlruStat, StatRow, StatTable};
use crate::resample::Aggregation;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;

fn stats(row: &SlruRow) -> &[SlruStat] {
    row.slru_stats.as_deref().unwrap_or_default()
}

fn slru_names(series: &CounterSeries<SlruRow>) -> CategoricalAligner<String> {
    CategoricalAligner::discover(series, |row: &SlruRow| {
        stats(row).iter().map(|s| s.name.clone()).collect()
    })
}

fn project(
    series: &CounterSeries<SlruRow>,
    value: fn(&SlruStat) -> f64,
) -> Vec<Aligned<String>> {
    slru_names(series).align(series, |row, name| {
        stats(row)
            .iter()
            .rev()
            .find(|s| &s.name == name)
            .map(|s| Some(value(s)))
    })
}

/// Hit percentage per SLRU; idle or absent caches plot as 0.
pub fn hit_ratios(series: &CounterSeries<SlruRow>) -> Vec<Aligned<String>> {
    project(series, SlruStat::hit_ratio)
}

/// Cumulative blocks read per SLRU.
pub fn blocks_read(series: &CounterSeries<SlruRow>) -> Vec<Aligned<String>> {
    project(series, |s| s.blks_read as f64)
}

pub struct SlruModule;

impl ChartModule for SlruModule {
    fn id(&self) -> &'static str {
        "slru"
    }

    fn description(&self) -> &'static str {
        "SLRU"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Slru, StatRow::into_slru)?;
        let x = series.tstamps();
        let hits = with_categories(
            Panel::new("SLRU cache hit ratio", "Hit ratio (%)", x.clone()),
            hit_ratios(&series),
            String::clone,
            Aggregation::Mean,
        );
        let reads = with_categories(
            Panel::new("SLRU block reads", "Blocks read", x),
            blocks_read(&series),
            String::clone,
            Aggregation::Sum,
        );
        Ok(vec![
            ctx.chart("slru")
                .with_panel(ctx.fit(hits))
                .with_panel(ctx.fit(reads)),
        ])
    }
}

//! Requested and scheduled checkpoints.

use crate::analysis::modules::as_values;
use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel, Series};
use crate::model::{BufRow, StatRow, StatTable};
use crate::rates::RateEngine;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;
use crate::units::round_series;

/// (requested, timed) checkpoints per minute, one decimal.
pub fn checkpoint_rates(series: &CounterSeries<BufRow>) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let engine = RateEngine::per_minute();
    (
        round_series(&engine.rates(series, "checkpoints_req"), 1),
        round_series(&engine.rates(series, "checkpoints_timed"), 1),
    )
}

pub struct CheckpModule;

impl ChartModule for CheckpModule {
    fn id(&self) -> &'static str {
        "checkp"
    }

    fn description(&self) -> &'static str {
        "checkpoint"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Buf, StatRow::into_buf)?;
        let x = series.tstamps();

        let counts = Panel::new("Checkpoints", "Checkpoints (since stats reset)", x.clone())
            .with_series(Series::new(
                "Requested",
                as_values(series.counter("checkpoints_req")),
            ))
            .with_series(Series::new(
                "Timed",
                as_values(series.counter("checkpoints_timed")),
            ));

        let (requested, timed) = checkpoint_rates(&series);
        let rates = Panel::new("Checkpoint rate", "Avg. checkpoints per minute", x)
            .with_series(Series::new("requested", requested))
            .with_series(Series::new("timed", timed));

        Ok(vec![
            ctx.chart("checkp").with_panel(ctx.fit(counts)),
            ctx.chart("checkp_rate").with_panel(ctx.fit(rates)),
        ])
    }
}

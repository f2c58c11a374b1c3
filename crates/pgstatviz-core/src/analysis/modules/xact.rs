//! Committed and rolled back transactions.

use crate::analysis::modules::as_values;
use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel, Series};
use crate::model::{DbRow, StatRow, StatTable};
use crate::rates::RateEngine;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;
use crate::units::round_series;

/// (committed, rolled back) transactions per minute, one decimal.
pub fn xact_rates(series: &CounterSeries<DbRow>) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let engine = RateEngine::per_minute();
    (
        round_series(&engine.rates(series, "xact_commit"), 1),
        round_series(&engine.rates(series, "xact_rollback"), 1),
    )
}

pub struct XactModule;

impl ChartModule for XactModule {
    fn id(&self) -> &'static str {
        "xact"
    }

    fn description(&self) -> &'static str {
        "transaction count"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Db, StatRow::into_db)?;
        let x = series.tstamps();

        let counts = Panel::new("Transactions", "Transactions (since stats reset)", x.clone())
            .with_series(Series::new("Committed", as_values(series.counter("xact_commit"))))
            .with_series(Series::new(
                "Rolled back",
                as_values(series.counter("xact_rollback")),
            ));
        let (committed, rolled_back) = xact_rates(&series);
        let rates = Panel::new("Transaction rate", "Avg. transactions per minute", x)
            .with_series(Series::new("Committed", committed))
            .with_series(Series::new("Rolled back", rolled_back));

        Ok(vec![
            ctx.chart("xact").with_panel(ctx.fit(counts)),
            ctx.chart("xact_rate").with_panel(ctx.fit(rates)),
        ])
    }
}

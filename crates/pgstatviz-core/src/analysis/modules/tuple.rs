//! Tuples read and written.

use crate::analysis::modules::as_values;
use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel, Series};
use crate::model::{DbRow, StatRow, StatTable};
use crate::rates::RateEngine;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;
use crate::units::round_series;

const READ: [(&str, &str); 2] = [("returned", "tup_returned"), ("fetched", "tup_fetched")];
const WRITTEN: [(&str, &str); 3] = [
    ("inserted", "tup_inserted"),
    ("updated", "tup_updated"),
    ("deleted", "tup_deleted"),
];

/// Tuples per minute for one counter, one decimal.
pub fn tuple_rate(series: &CounterSeries<DbRow>, counter: &str) -> Vec<Option<f64>> {
    round_series(&RateEngine::per_minute().rates(series, counter), 1)
}

fn panel(
    title: &str,
    ylabel: &str,
    series: &CounterSeries<DbRow>,
    columns: &[(&str, &str)],
    values: impl Fn(&str) -> Vec<Option<f64>>,
) -> Panel {
    columns.iter().fold(
        Panel::new(title, ylabel, series.tstamps()),
        |panel, &(label, counter)| panel.with_series(Series::new(label, values(counter))),
    )
}

pub struct TupleModule;

impl ChartModule for TupleModule {
    fn id(&self) -> &'static str {
        "tuple"
    }

    fn description(&self) -> &'static str {
        "tuple count"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Db, StatRow::into_db)?;
        let counts = |counter: &str| as_values(series.counter(counter));
        let rates = |counter: &str| tuple_rate(&series, counter);

        let count_chart = ctx
            .chart("tuple")
            .with_panel(ctx.fit(panel("Tuples read", "Tuple count", &series, &READ, counts)))
            .with_panel(ctx.fit(panel("Tuples written", "Tuple count", &series, &WRITTEN, counts)));
        let rate_chart = ctx
            .chart("tuple_rate")
            .with_panel(ctx.fit(panel(
                "Tuple read rate",
                "Avg. tuples per minute",
                &series,
                &READ,
                rates,
            )))
            .with_panel(ctx.fit(panel(
                "Tuple write rate",
                "Avg. tuples per minute",
                &series,
                &WRITTEN,
                rates,
            )));
        Ok(vec![count_chart, rate_chart])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{assert_close, ctx, snap};
    use crate::source::MemorySource;

    fn row(returned: i64, inserted: i64) -> StatRow {
        StatRow::Db(DbRow {
            tup_returned: Some(returned),
            tup_inserted: Some(inserted),
            ..Default::default()
        })
    }

    #[test]
    fn rates_are_per_minute() {
        let s = CounterSeries::from_rows(
            vec![
                snap(0, Some(7), row(100, 0)),
                snap(30, Some(7), row(150, 1)),
                snap(60, Some(8), row(10, 1)),
            ],
            "db",
            StatRow::into_db,
        )
        .unwrap();
        assert_close(&tuple_rate(&s, "tup_returned"), &[None, Some(100.0), None]);
        assert_close(&tuple_rate(&s, "tup_inserted"), &[None, Some(2.0), None]);
    }

    #[test]
    fn module_panels_and_labels() {
        let mut source = MemorySource::default().with_rows(
            StatTable::Db,
            vec![snap(0, None, row(1, 2)), snap(60, None, row(3, 4))],
        );
        let charts = TupleModule.charts(&mut source, &ctx()).unwrap();
        let written: Vec<_> = charts[0].panels[1].series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(written, vec!["inserted", "updated", "deleted"]);
        assert_eq!(charts[0].panels[0].series[0].values, vec![Some(1.0), Some(3.0)]);
        assert_eq!(charts[1].panels[0].title, "Tuple read rate");
        assert_eq!(charts[1].panels[1].series[0].values, vec![None, Some(2.0)]);
    }
}

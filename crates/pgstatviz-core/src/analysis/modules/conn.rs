//! Connection counts by status and by user.

use crate::align::{Aligned, CategoricalAligner};
use crate::analysis::modules::with_categories;
use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel, Series};
use crate::model::{ConnRow, StatRow, StatTable};
use crate::resample::Aggregation;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;

const YLABEL: &str = "No. of connections";

/// Status breakdown columns and their labels.
fn statuses() -> [(&'static str, fn(&ConnRow) -> i64); 5] {
    [
        ("active", |r| r.conn_active),
        ("idle", |r| r.conn_idle),
        ("idle in transaction", |r| r.conn_idle_trans),
        ("idle in transaction (aborted)", |r| r.conn_idle_trans_abort),
        ("fastpath function call", |r| r.conn_fastpath),
    ]
}

fn column(series: &CounterSeries<ConnRow>, get: fn(&ConnRow) -> i64) -> Vec<Option<f64>> {
    series.rows().map(|r| Some(get(r) as f64)).collect()
}

/// Connections per user. With an empty filter every user seen is plotted,
/// in first-seen order.
pub fn user_counts(series: &CounterSeries<ConnRow>, users: &[String]) -> Vec<Aligned<String>> {
    let aligner = if users.is_empty() {
        CategoricalAligner::discover(series, |row: &ConnRow| {
            row.conn_users.iter().map(|u| u.user.clone()).collect()
        })
    } else {
        CategoricalAligner::with_keys(users.iter().cloned())
    };
    aligner.align(series, |row, user| {
        row.conn_users
            .iter()
            .rev()
            .find(|u| &u.user == user)
            .map(|u| Some(u.connections as f64))
    })
}

pub struct ConnModule;

impl ChartModule for ConnModule {
    fn id(&self) -> &'static str {
        "conn"
    }

    fn description(&self) -> &'static str {
        "connection count"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Conn, StatRow::into_conn)?;
        let x = series.tstamps();

        let status = statuses().into_iter().fold(
            Panel::new("Connection/status count", YLABEL, x.clone())
                .with_series(Series::new("total", column(&series, |r| r.conn_total))),
            |panel, (label, get)| panel.with_series(Series::category(label, column(&series, get))),
        );
        let users = with_categories(
            Panel::new("Connection/user count", YLABEL, x),
            user_counts(&series, &ctx.users),
            String::clone,
            Aggregation::Mean,
        );

        Ok(vec![
            ctx.chart("conn_status").with_panel(ctx.fit(status)),
            ctx.chart("conn_user").with_panel(ctx.fit(users)),
        ])
    }
}

//! WAL generated and WAL generation rate.

use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel, Series};
use crate::model::{StatRow, StatTable, WalRow};
use crate::rates::RateEngine;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;
use crate::units::{GIB, MIB, round_series_adaptive, round_to};

/// `pg_stat_wal` first appeared in this release.
const MIN_SERVER_VERSION: i32 = 150000;

/// GB generated since the last stats reset, one decimal.
pub fn wal_gb(series: &CounterSeries<WalRow>) -> Vec<Option<f64>> {
    series
        .rows()
        .map(|row| row.wal_bytes.map(|b| round_to(b as f64 / GIB, 1)))
        .collect()
}

/// MB/s; one decimal from 100 MB/s up, two below.
pub fn wal_rate_mb(series: &CounterSeries<WalRow>) -> Vec<Option<f64>> {
    let rates = RateEngine::per_second()
        .with_scale(1.0 / MIB)
        .rates(series, "wal_bytes");
    round_series_adaptive(&rates)
}

pub struct WalModule;

impl ChartModule for WalModule {
    fn id(&self) -> &'static str {
        "wal"
    }

    fn description(&self) -> &'static str {
        "WAL generation"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let rows = source.fetch(StatTable::Wal, &ctx.range)?;
        if rows.is_empty() && ctx.info.server_version_num < MIN_SERVER_VERSION {
            return Err(AnalysisError::Unsupported(
                "WAL generation analysis is only available from PostgreSQL release 15 onwards"
                    .to_string(),
            ));
        }
        let series = CounterSeries::from_rows(rows, "wal", StatRow::into_wal)?;
        let x = series.tstamps();

        let generated = Panel::new("WAL generated", "GB generated (since stats reset)", x.clone())
            .with_series(Series::new("WAL", wal_gb(&series)));
        let rate = Panel::new("WAL generation rate", "Avg. WAL generation rate (MB/s)", x)
            .with_series(Series::new("WAL", wal_rate_mb(&series)));
        Ok(vec![
            ctx.chart("wal").with_panel(ctx.fit(generated)),
            ctx.chart("wal_rate").with_panel(ctx.fit(rate)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{assert_close, ctx, snap};
    use crate::source::MemorySource;

    fn wal(secs: i64, epoch: i64, bytes: i64) -> crate::model::Snapshot {
        snap(
            secs,
            Some(epoch),
            StatRow::Wal(WalRow {
                wal_bytes: Some(bytes),
            }),
        )
    }

    fn series() -> CounterSeries<WalRow> {
        CounterSeries::from_rows(
            vec![
                wal(0, 1, 15_000_000_000),
                wal(10, 1, 16_000_000_000),
                wal(20, 2, 17_000_000_000),
                wal(30, 2, 18_000_000_000),
                wal(40, 2, 20_000_000_000),
            ],
            "wal",
            StatRow::into_wal,
        )
        .unwrap()
    }

    #[test]
    fn generated_gb() {
        assert_close(
            &wal_gb(&series()),
            &[Some(14.0), Some(14.9), Some(15.8), Some(16.8), Some(18.6)],
        );
    }

    #[test]
    fn generation_rate_skips_reset() {
        assert_close(
            &wal_rate_mb(&series()),
            &[None, Some(95.37), None, Some(95.37), Some(190.7)],
        );
    }

    #[test]
    fn null_wal_bytes_leave_gaps() {
        let s = CounterSeries::from_rows(
            vec![
                wal(0, 1, 1_048_576),
                snap(10, Some(1), StatRow::Wal(WalRow { wal_bytes: None })),
                wal(20, 1, 11_534_336),
                wal(30, 1, 22_020_096),
            ],
            "wal",
            StatRow::into_wal,
        )
        .unwrap();
        assert_eq!(wal_gb(&s)[1], None);
        assert_close(&wal_rate_mb(&s), &[None, None, None, Some(1.0)]);
    }

    #[test]
    fn old_servers_without_data_are_unsupported() {
        let mut ctx = ctx();
        ctx.info.server_version_num = 140011;
        let err = WalModule.charts(&mut MemorySource::default(), &ctx).unwrap_err();
        assert!(matches!(err, AnalysisError::Unsupported(_)));
        assert!(err.to_string().contains("PostgreSQL release 15"));
    }

    #[test]
    fn new_servers_without_data_are_empty() {
        let err = WalModule
            .charts(&mut MemorySource::default(), &ctx())
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Series(crate::series::SeriesError::EmptySeries)
        ));
    }
}

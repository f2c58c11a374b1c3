//! Buffers written by checkpoints, the background writer and backends.

use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel, Series};
use crate::model::{BufRow, StatRow, StatTable};
use crate::rates::{RateEngine, sum_rates};
use crate::series::CounterSeries;
use crate::source::SnapshotSource;
use crate::units::{GIB, MIB, round_adaptive, round_to};

/// Buffer counters split by writer, plus their total.
#[derive(Debug, Clone, PartialEq)]
pub struct BufWrites {
    pub total: Vec<Option<f64>>,
    pub checkpoints: Vec<Option<f64>>,
    pub bgwriter: Vec<Option<f64>>,
    pub backends: Vec<Option<f64>>,
}

impl BufWrites {
    fn panel(self, title: &str, ylabel: &str, x: Vec<chrono::DateTime<chrono::Utc>>) -> Panel {
        Panel::new(title, ylabel, x)
            .with_series(Series::new("total", self.total))
            .with_series(Series::new("checkpoints", self.checkpoints))
            .with_series(Series::new("bgwriter", self.bgwriter))
            .with_series(Series::new("backends", self.backends))
    }
}

/// GB written since the last stats reset, one decimal.
///
/// A null component stays undefined in its own series and counts as 0 in
/// the total.
pub fn written_gb(series: &CounterSeries<BufRow>, block_size: i64) -> BufWrites {
    let gb = |blocks: i64| round_to(blocks as f64 * block_size as f64 / GIB, 1);
    let mut out = BufWrites {
        total: Vec::with_capacity(series.len()),
        checkpoints: Vec::with_capacity(series.len()),
        bgwriter: Vec::with_capacity(series.len()),
        backends: Vec::with_capacity(series.len()),
    };
    for row in series.rows() {
        let total = [row.buffers_checkpoint, row.buffers_clean, row.buffers_backend]
            .iter()
            .map(|b| b.unwrap_or(0))
            .sum();
        out.total.push(Some(gb(total)));
        out.checkpoints.push(row.buffers_checkpoint.map(gb));
        out.bgwriter.push(row.buffers_clean.map(gb));
        out.backends.push(row.buffers_backend.map(gb));
    }
    out
}

/// Write rates in MB/s.
///
/// Every component is rounded with the precision chosen by the checkpoint
/// buffer rate of the same step.
pub fn write_rates_mb(series: &CounterSeries<BufRow>, block_size: i64) -> BufWrites {
    let engine = RateEngine::per_second();
    let checkpoints = engine.rates(series, "buffers_checkpoint");
    let bgwriter = engine.rates(series, "buffers_clean");
    let backends = engine.rates(series, "buffers_backend");
    let total = sum_rates(&[&checkpoints, &bgwriter, &backends]);

    let to_mb = |raw: &[Option<f64>]| -> Vec<Option<f64>> {
        raw.iter()
            .zip(&checkpoints)
            .map(|(v, reference)| {
                v.map(|buffers| round_adaptive(buffers * block_size as f64 / MIB, *reference))
            })
            .collect()
    };
    BufWrites {
        total: to_mb(&total),
        checkpoints: to_mb(&checkpoints),
        bgwriter: to_mb(&bgwriter),
        backends: to_mb(&backends),
    }
}

pub struct BufModule;

impl ChartModule for BufModule {
    fn id(&self) -> &'static str {
        "buf"
    }

    fn description(&self) -> &'static str {
        "buffers written"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Buf, StatRow::into_buf)?;
        let block_size = ctx.info.block_size;
        let x = series.tstamps();

        let written = written_gb(&series, block_size).panel(
            "Buffers written",
            "GB written (since stats reset)",
            x.clone(),
        );
        let rates = write_rates_mb(&series, block_size).panel(
            "Buffer write rate",
            "Avg. write rate in MB/s",
            x,
        );
        Ok(vec![
            ctx.chart("buf").with_panel(ctx.fit(written)),
            ctx.chart("buf_rate").with_panel(ctx.fit(rates)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{assert_close, ctx, snap};
    use crate::source::MemorySource;

    fn row(ckpt: i64, clean: i64, backend: i64) -> StatRow {
        row_with_backend(ckpt, clean, Some(backend))
    }

    fn row_with_backend(ckpt: i64, clean: i64, backend: Option<i64>) -> StatRow {
        StatRow::Buf(BufRow {
            buffers_checkpoint: Some(ckpt),
            buffers_clean: Some(clean),
            buffers_backend: backend,
            ..Default::default()
        })
    }

    fn series(rows: Vec<crate::model::Snapshot>) -> CounterSeries<BufRow> {
        CounterSeries::from_rows(rows, "buf", StatRow::into_buf).unwrap()
    }

    #[test]
    fn decreasing_counters_give_negative_rates() {
        let s = series(vec![
            snap(0, Some(1), row(500, 800, 1200)),
            snap(1, Some(1), row(300, 600, 900)),
        ]);
        let r = write_rates_mb(&s, 8192);
        assert_close(&r.checkpoints, &[None, Some(-1.56)]);
        assert_close(&r.bgwriter, &[None, Some(-1.56)]);
        assert_close(&r.backends, &[None, Some(-2.34)]);
        assert_close(&r.total, &[None, Some(-5.47)]);
    }

    #[test]
    fn large_checkpoint_rate_drops_to_one_decimal() {
        // 1280 buffers/s at 8 KiB = 10 MB/s; 1000 bgwriter buffers/s = 7.8125
        let s = series(vec![
            snap(0, None, row(0, 0, 0)),
            snap(1, None, row(1280, 1000, 0)),
        ]);
        let r = write_rates_mb(&s, 8192);
        assert_close(&r.checkpoints, &[None, Some(10.0)]);
        assert_close(&r.bgwriter, &[None, Some(7.8)]);
    }

    #[test]
    fn reset_makes_every_component_undefined() {
        let s = series(vec![
            snap(0, Some(1), row(100, 100, 100)),
            snap(10, Some(2), row(0, 0, 0)),
        ]);
        let r = write_rates_mb(&s, 8192);
        assert_eq!(r.total, vec![None, None]);
        assert_eq!(r.backends, vec![None, None]);
    }

    #[test]
    fn written_gb_sums_components() {
        // 131072 blocks of 8 KiB = 1 GiB
        let s = series(vec![snap(0, None, row(131072, 65536, 65536))]);
        let w = written_gb(&s, 8192);
        assert_eq!(w.total, vec![Some(2.0)]);
        assert_eq!(w.checkpoints, vec![Some(1.0)]);
        assert_eq!(w.bgwriter, vec![Some(0.5)]);
        assert_eq!(w.backends, vec![Some(0.5)]);
    }

    #[test]
    fn null_backend_counter_is_undefined_but_zero_in_total() {
        // 1280 buffers at 8 KiB = 10 MB
        let s = series(vec![
            snap(0, None, row(0, 0, 0)),
            snap(1, None, row_with_backend(1280, 0, None)),
            snap(2, None, row(2560, 0, 1280)),
        ]);
        let r = write_rates_mb(&s, 8192);
        assert_eq!(r.backends, vec![None, None, None]);
        assert_close(&r.checkpoints, &[None, Some(10.0), Some(10.0)]);
        assert_close(&r.total, &[None, Some(10.0), Some(10.0)]);

        let w = written_gb(&s, 8192);
        assert_eq!(w.backends[1], None);
        assert_eq!(w.total[1], Some(0.0));
    }

    #[test]
    fn module_builds_two_charts() {
        let mut source = MemorySource::default().with_rows(
            StatTable::Buf,
            vec![snap(0, None, row(0, 0, 0)), snap(10, None, row(10, 0, 0))],
        );
        let charts = BufModule.charts(&mut source, &ctx()).unwrap();
        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].name, "pg_statviz_db1_5432_buf");
        assert_eq!(charts[1].name, "pg_statviz_db1_5432_buf_rate");
        assert_eq!(charts[1].panels[0].title, "Buffer write rate");
        let labels: Vec<_> = charts[0].panels[0].series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["total", "checkpoints", "bgwriter", "backends"]);
    }
}

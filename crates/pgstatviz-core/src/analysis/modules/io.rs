//! I/O volume and rates per backend type, object and context.

use crate::align::{Aligned, CategoricalAligner};
use crate::analysis::modules::with_categories;
use crate::analysis::{AnalysisError, ChartContext, ChartModule};
use crate::chart::{Chart, Panel};
use crate::model::{IoEntry, IoKind, IoRow, StatRow, StatTable};
use crate::rates::RateEngine;
use crate::resample::Aggregation;
use crate::series::CounterSeries;
use crate::source::SnapshotSource;
use crate::units::{GIB, MIB, io_volume_bytes, round_adaptive};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoDirection {
    Read,
    Write,
}

impl IoDirection {
    /// Volume in bytes; byte-native counters win over blocks × block size.
    pub fn bytes(self, entry: &IoEntry, block_size: i64) -> Option<i64> {
        match self {
            IoDirection::Read => io_volume_bytes(entry.read_bytes, entry.reads, block_size),
            IoDirection::Write => io_volume_bytes(entry.write_bytes, entry.writes, block_size),
        }
    }
}

fn lookup<'a>(row: &'a IoRow, kind: &IoKind) -> Option<&'a IoEntry> {
    row.io_stats.iter().rev().find(|e| e.is_kind(kind))
}

pub fn io_kinds(series: &CounterSeries<IoRow>) -> CategoricalAligner<IoKind> {
    CategoricalAligner::discover(series, |row: &IoRow| {
        row.io_stats.iter().map(IoEntry::kind).collect()
    })
}

/// Cumulative GB per kind; absent or null counters plot as 0.
pub fn volumes_gb(
    series: &CounterSeries<IoRow>,
    kinds: &CategoricalAligner<IoKind>,
    direction: IoDirection,
    block_size: i64,
) -> Vec<Aligned<IoKind>> {
    let mut aligned = kinds.align(series, |row, kind| {
        lookup(row, kind).map(|e| direction.bytes(e, block_size).map(|b| b as f64))
    });
    for a in &mut aligned {
        for v in a.values.iter_mut().flatten() {
            *v = round_adaptive(*v / GIB, Some(*v));
        }
    }
    aligned
}

/// MB/s per kind, with precision chosen by the bytes/s rate itself.
pub fn rates_mb(
    series: &CounterSeries<IoRow>,
    kinds: &CategoricalAligner<IoKind>,
    direction: IoDirection,
    block_size: i64,
) -> Vec<Aligned<IoKind>> {
    let mut aligned = kinds.rates(series, &RateEngine::per_second(), |row, kind| {
        lookup(row, kind).map(|e| direction.bytes(e, block_size))
    });
    for a in &mut aligned {
        for v in a.values.iter_mut().flatten() {
            *v = round_adaptive(*v / MIB, Some(*v));
        }
    }
    aligned
}

pub struct IoModule;

impl ChartModule for IoModule {
    fn id(&self) -> &'static str {
        "io"
    }

    fn description(&self) -> &'static str {
        "I/O"
    }

    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError> {
        let series = ctx.series(source, StatTable::Io, StatRow::into_io)?;
        let kinds = io_kinds(&series);
        let block_size = ctx.info.block_size;
        let x = series.tstamps();

        let panel = |title: &str, ylabel: &str, aligned: Vec<Aligned<IoKind>>| {
            ctx.fit(with_categories(
                Panel::new(title, ylabel, x.clone()),
                aligned,
                IoKind::label,
                Aggregation::Mean,
            ))
        };

        let volume = ctx
            .chart("io")
            .with_panel(panel(
                "I/O Reads",
                "GB read (at time of snapshot)",
                volumes_gb(&series, &kinds, IoDirection::Read, block_size),
            ))
            .with_panel(panel(
                "I/O Writes",
                "GB written (at time of snapshot)",
                volumes_gb(&series, &kinds, IoDirection::Write, block_size),
            ));
        let rate = ctx
            .chart("io_rate")
            .with_panel(panel(
                "I/O Read Rate",
                "Avg. read rate in MB/s",
                rates_mb(&series, &kinds, IoDirection::Read, block_size),
            ))
            .with_panel(panel(
                "I/O Write Rate",
                "Avg. write rate in MB/s",
                rates_mb(&series, &kinds, IoDirection::Write, block_size),
            ));
        Ok(vec![volume, rate])
    }
}

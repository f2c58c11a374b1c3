//! Chart modules and the analysis runner.
//!
//! Every module reads one `pgstatviz.*` table, turns its counters into chart
//! panels (absolute values, rates, per-category breakdowns) and hands the
//! charts to a [`Renderer`]. Modules are independent: [`analyze_all`] logs a
//! failing module and moves on.

pub mod modules;

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::chart::{Chart, Panel, RenderError, Renderer};
use crate::model::{Snapshot, StatRow, StatTable};
use crate::resample::Resampler;
use crate::series::{CounterSeries, SeriesError};
use crate::source::{DateRange, InstanceInfo, SnapshotSource, SourceError};
use crate::util::file_safe;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum AnalysisError {
    Source(SourceError),
    Series(SeriesError),
    Render(RenderError),
    /// The server cannot provide this analysis.
    Unsupported(String),
    UnknownModule(String),
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(e) => write!(f, "{e}"),
            Self::Series(e) => write!(f, "{e}"),
            Self::Render(e) => write!(f, "render failed: {e}"),
            Self::Unsupported(msg) => write!(f, "{msg}"),
            Self::UnknownModule(id) => write!(f, "unknown analysis module: {id}"),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Source(e) => Some(e),
            Self::Series(e) => Some(e),
            Self::Render(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SourceError> for AnalysisError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

impl From<SeriesError> for AnalysisError {
    fn from(e: SeriesError) -> Self {
        Self::Series(e)
    }
}

impl From<RenderError> for AnalysisError {
    fn from(e: RenderError) -> Self {
        Self::Render(e)
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Read-only inputs shared by every module in one run.
#[derive(Debug, Clone)]
pub struct ChartContext {
    pub info: InstanceInfo,
    pub range: DateRange,
    /// Users to plot in the connection chart; empty means all seen.
    pub users: Vec<String>,
    pub resampler: Resampler,
}

impl ChartContext {
    pub fn new(info: InstanceInfo, range: DateRange) -> Self {
        Self {
            info,
            range,
            users: Vec::new(),
            resampler: Resampler::default(),
        }
    }

    pub fn with_users(mut self, users: Vec<String>) -> Self {
        self.users = users;
        self
    }

    /// Heading shared by every chart of the instance.
    pub fn heading(&self) -> String {
        format!("pg_statviz · {}:{}", self.info.hostname, self.info.port)
    }

    /// `pg_statviz_{host}_{port}_{suffix}`.
    pub fn chart_name(&self, suffix: &str) -> String {
        format!(
            "pg_statviz_{}_{}_{}",
            file_safe(&self.info.hostname),
            self.info.port,
            suffix
        )
    }

    /// Empty chart with the instance heading.
    pub fn chart(&self, suffix: &str) -> Chart {
        Chart::new(self.chart_name(suffix), self.heading())
    }

    /// Resamples a panel to the point budget.
    pub fn fit(&self, panel: Panel) -> Panel {
        panel.resampled(&self.resampler)
    }

    /// Fetches `table` in the context range as a typed series.
    pub fn series<T>(
        &self,
        source: &mut dyn SnapshotSource,
        table: StatTable,
        extract: fn(StatRow) -> Option<T>,
    ) -> Result<CounterSeries<T>, AnalysisError> {
        let rows: Vec<Snapshot> = source.fetch(table, &self.range)?;
        Ok(CounterSeries::from_rows(rows, table.name(), extract)?)
    }
}

// ---------------------------------------------------------------------------
// Module trait and runner
// ---------------------------------------------------------------------------

pub trait ChartModule {
    /// Subcommand name, also the base of the chart suffixes.
    fn id(&self) -> &'static str;
    /// Used in "Running {description} analysis".
    fn description(&self) -> &'static str;
    fn charts(
        &self,
        source: &mut dyn SnapshotSource,
        ctx: &ChartContext,
    ) -> Result<Vec<Chart>, AnalysisError>;
}

/// Modules in `analyze` order.
pub fn all_modules() -> Vec<Box<dyn ChartModule>> {
    vec![
        Box::new(modules::buf::BufModule),
        Box::new(modules::checkp::CheckpModule),
        Box::new(modules::cache::CacheModule),
        Box::new(modules::conn::ConnModule),
        Box::new(modules::io::IoModule),
        Box::new(modules::lock::LockModule),
        Box::new(modules::tuple::TupleModule),
        Box::new(modules::wait::WaitModule),
        Box::new(modules::wal::WalModule),
        Box::new(modules::xact::XactModule),
        Box::new(modules::repl::ReplModule),
        Box::new(modules::slru::SlruModule),
        Box::new(modules::checksum::ChecksumModule),
        Box::new(modules::conf::ConfModule),
    ]
}

pub fn module_by_id(id: &str) -> Result<Box<dyn ChartModule>, AnalysisError> {
    all_modules()
        .into_iter()
        .find(|m| m.id() == id)
        .ok_or_else(|| AnalysisError::UnknownModule(id.to_string()))
}

/// Runs one module and renders its charts. An empty range is a warning, not
/// an error.
pub fn run_module(
    module: &dyn ChartModule,
    source: &mut dyn SnapshotSource,
    renderer: &mut dyn Renderer,
    ctx: &ChartContext,
) -> Result<Vec<PathBuf>, AnalysisError> {
    info!("Running {} analysis", module.description());
    let charts = match module.charts(source, ctx) {
        Ok(charts) => charts,
        Err(AnalysisError::Series(SeriesError::EmptySeries)) => {
            warn!(module = module.id(), "No pg_statviz snapshots found in range, skipping");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };
    let mut written = Vec::with_capacity(charts.len());
    for chart in &charts {
        info!("Saving {}", chart.name);
        written.push(renderer.render(chart)?);
    }
    Ok(written)
}

/// Runs every module in order, continuing past failures.
///
/// Returns the written paths and the number of failed modules.
pub fn analyze_all(
    source: &mut dyn SnapshotSource,
    renderer: &mut dyn Renderer,
    ctx: &ChartContext,
) -> (Vec<PathBuf>, usize) {
    let mut written = Vec::new();
    let mut failed = 0;
    for module in all_modules() {
        match run_module(module.as_ref(), source, renderer, ctx) {
            Ok(paths) => written.extend(paths),
            Err(e) => {
                failed += 1;
                error!(module = module.id(), error = %e, "analysis failed");
            }
        }
    }
    (written, failed)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixture helpers shared by module tests.

    use chrono::{DateTime, TimeZone, Utc};

    use crate::model::{ResetEpoch, Snapshot, StatRow};
    use crate::source::{DateRange, InstanceInfo};

    use super::ChartContext;

    pub fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    pub fn snap(secs: i64, epoch: Option<i64>, row: StatRow) -> Snapshot {
        Snapshot::new(ts(secs), ResetEpoch(epoch), row)
    }

    pub fn info() -> InstanceInfo {
        InstanceInfo {
            hostname: "db1".to_string(),
            port: 5432,
            block_size: 8192,
            server_version_num: 170000,
        }
    }

    pub fn ctx() -> ChartContext {
        ChartContext::new(info(), DateRange::unbounded())
    }

    pub fn assert_close(actual: &[Option<f64>], expected: &[Option<f64>]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            match (a, e) {
                (Some(a), Some(e)) => assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}"),
                (None, None) => {}
                _ => panic!("{actual:?} vs {expected:?}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::chart::JsonRenderer;
    use crate::model::{BufRow, DbRow, StatRow, WalRow};
    use crate::source::MemorySource;

    #[test]
    fn module_order_and_ids() {
        let ids: Vec<_> = all_modules().iter().map(|m| m.id()).collect();
        assert_eq!(
            ids,
            vec![
                "buf", "checkp", "cache", "conn", "io", "lock", "tuple", "wait", "wal", "xact",
                "repl", "slru", "checksum", "conf"
            ]
        );
        assert!(module_by_id("wal").is_ok());
        assert!(matches!(
            module_by_id("nope"),
            Err(AnalysisError::UnknownModule(_))
        ));
    }

    #[test]
    fn chart_names_are_file_safe() {
        let mut ctx = ctx();
        ctx.info.hostname = "/var/run/postgresql".to_string();
        assert_eq!(
            ctx.chart_name("buf_rate"),
            "pg_statviz_-var-run-postgresql_5432_buf_rate"
        );
        assert_eq!(ctx.heading(), "pg_statviz · /var/run/postgresql:5432");
    }

    #[test]
    fn empty_domain_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = JsonRenderer::new(dir.path());
        let mut source = MemorySource::default();
        let module = module_by_id("buf").unwrap();
        let written = run_module(module.as_ref(), &mut source, &mut renderer, &ctx()).unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn analyze_all_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = JsonRenderer::new(dir.path());
        let mut source = MemorySource::new(InstanceInfo {
            server_version_num: 140000,
            ..info()
        })
        .with_rows(
            crate::model::StatTable::Buf,
            vec![
                snap(0, None, StatRow::Buf(BufRow::default())),
                snap(10, None, StatRow::Buf(BufRow::default())),
            ],
        )
        .with_rows(
            crate::model::StatTable::Db,
            vec![snap(0, None, StatRow::Db(DbRow::default()))],
        );
        let mut ctx = ctx();
        ctx.info.server_version_num = 140000;

        let (written, failed) = analyze_all(&mut source, &mut renderer, &ctx);
        // wal fails on a pre-15 server without data; the rest carry on.
        assert_eq!(failed, 1);
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"pg_statviz_db1_5432_buf.json".to_string()));
        assert!(names.contains(&"pg_statviz_db1_5432_xact_rate.json".to_string()));
        assert!(names.contains(&"pg_statviz_db1_5432_checksum.json".to_string()));
        assert!(!names.iter().any(|n| n.contains("_wal")));
    }

    #[test]
    fn wal_rows_render_on_new_servers() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = JsonRenderer::new(dir.path());
        let mut source = MemorySource::default().with_rows(
            crate::model::StatTable::Wal,
            vec![snap(
                0,
                None,
                StatRow::Wal(WalRow {
                    wal_bytes: Some(1),
                }),
            )],
        );
        let module = module_by_id("wal").unwrap();
        let written = run_module(module.as_ref(), &mut source, &mut renderer, &ctx()).unwrap();
        assert_eq!(written.len(), 2);
    }
}

//! pgstatviz - charts from `pg_statviz` snapshots.
//!
//! Reads the `pgstatviz.*` snapshot tables of one database, computes
//! counters, rates and breakdowns per domain and writes one JSON chart
//! document per chart into the output directory.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

use pgstatviz_core::analysis::{ChartContext, analyze_all, module_by_id, run_module};
use pgstatviz_core::chart::JsonRenderer;
use pgstatviz_core::source::{ConnectionParams, DateRange, InfoProvider, PostgresSource};
use pgstatviz_core::util::parse_date_range;

/// Charts from pg_statviz snapshots.
#[derive(Parser)]
#[command(
    name = "pgstatviz",
    about = "Stats visualization and time series analysis for pg_statviz snapshots",
    version,
    disable_help_flag = true
)]
struct Args {
    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// Database name to analyze.
    #[arg(short = 'd', long, env = "PGDATABASE")]
    dbname: Option<String>,

    /// Database server host or socket directory.
    #[arg(
        short = 'h',
        long,
        env = "PGHOST",
        value_name = "HOSTNAME",
        default_value = "/var/run/postgresql"
    )]
    host: String,

    /// Database server port.
    #[arg(short = 'p', long, env = "PGPORT", default_value_t = 5432)]
    port: u16,

    /// Database user name.
    #[arg(short = 'U', long, env = "PGUSER")]
    username: Option<String>,

    /// Date range to analyze, e.g. 2024-01-01T00:00 2024-01-01T23:59 or -1d now.
    /// Accepts ISO 8601, YYYY-MM-DD:HH:MM, Unix seconds and relative (-1h, -2d).
    #[arg(
        short = 'D',
        long,
        num_args = 2,
        value_names = ["FROM", "TO"],
        allow_hyphen_values = true
    )]
    daterange: Option<Vec<String>>,

    /// Output directory.
    #[arg(short = 'O', long, default_value = ".")]
    outputdir: PathBuf,

    /// Users to plot in the connection chart (comma-separated or repeated).
    #[arg(short = 'u', long, value_delimiter = ',')]
    users: Vec<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    /// Run all analysis modules (default).
    Analyze,
    /// Run buffers written analysis module.
    Buf,
    /// Run cache hit ratio analysis module.
    Cache,
    /// Run checkpoint analysis module.
    Checkp,
    /// Run checksum failure analysis module.
    Checksum,
    /// Run configuration changes analysis module.
    Conf,
    /// Run connection count analysis module.
    Conn,
    /// Run I/O analysis module.
    Io,
    /// Run locks analysis module.
    Lock,
    /// Run replication analysis module.
    Repl,
    /// Run SLRU analysis module.
    Slru,
    /// Run tuple count analysis module.
    Tuple,
    /// Run wait events analysis module.
    Wait,
    /// Run WAL generation analysis module.
    Wal,
    /// Run transaction count analysis module.
    Xact,
}

impl Command {
    /// Chart module id, `None` for the full run.
    fn module_id(self) -> Option<&'static str> {
        match self {
            Command::Analyze => None,
            Command::Buf => Some("buf"),
            Command::Cache => Some("cache"),
            Command::Checkp => Some("checkp"),
            Command::Checksum => Some("checksum"),
            Command::Conf => Some("conf"),
            Command::Conn => Some("conn"),
            Command::Io => Some("io"),
            Command::Lock => Some("lock"),
            Command::Repl => Some("repl"),
            Command::Slru => Some("slru"),
            Command::Tuple => Some("tuple"),
            Command::Wait => Some("wait"),
            Command::Wal => Some("wal"),
            Command::Xact => Some("xact"),
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["pgstatviz", "pgstatviz_core"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn connection_params(args: &Args) -> ConnectionParams {
    let user = args
        .username
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "postgres".to_string());
    ConnectionParams {
        host: args.host.clone(),
        port: args.port,
        dbname: args.dbname.clone().unwrap_or_else(|| user.clone()),
        user,
        password: std::env::var("PGPASSWORD").ok().filter(|p| !p.is_empty()),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let range = match args.daterange.as_deref() {
        Some([from, to]) => match parse_date_range(from, to) {
            Ok(range) => range,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        _ => DateRange::unbounded(),
    };
    debug!(from = ?range.from, to = ?range.to, "date range");

    let params = connection_params(&args);
    info!(
        "Connecting to {}:{} as {} (database {})",
        params.host, params.port, params.user, params.dbname
    );
    let mut source = PostgresSource::new(params);
    let instance = match source.info() {
        Ok(info) => info,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        hostname = %instance.hostname,
        server_version_num = instance.server_version_num,
        block_size = instance.block_size,
        "connected"
    );

    let ctx = ChartContext::new(instance, range).with_users(args.users);
    let mut renderer = JsonRenderer::new(args.outputdir);

    match args.command.unwrap_or(Command::Analyze).module_id() {
        None => {
            let (written, failed) = analyze_all(&mut source, &mut renderer, &ctx);
            info!(charts = written.len(), failed, "analysis complete");
            ExitCode::SUCCESS
        }
        Some(id) => {
            let result = module_by_id(id)
                .and_then(|module| run_module(module.as_ref(), &mut source, &mut renderer, &ctx));
            match result {
                Ok(written) => {
                    debug!(charts = written.len(), "module complete");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

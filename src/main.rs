//! CLI entry point for the GTFS route atlas.
//!
//! Turns a static GTFS feed into the route geometry, stop cross-reference and
//! weekday frequency documents read by the map viewer, and offers a few
//! diagnostics over the feed and the written documents.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gtfs_route_atlas::analyzers::{inspect, stop_codes};
use gtfs_route_atlas::config::FieldDefaults;
use gtfs_route_atlas::feed::{Feed, Table};
use gtfs_route_atlas::join::FeedJoin;
use gtfs_route_atlas::output::STOPS_WITH_ROUTES_FILE;
use gtfs_route_atlas::{pipeline, validate};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_route_atlas")]
#[command(about = "Build map-ready route, stop and frequency documents from a GTFS feed", long_about = None)]
struct Cli {
    /// JSON file overriding the defaults of missing route and stop fields
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// GTFS directory, zip archive or URL of a zip archive
    #[arg(short, long, env = "GTFS_SOURCE", value_name = "DIR_ZIP_OR_URL")]
    source: String,
}

#[derive(Args)]
struct OutputArgs {
    /// Directory holding the output documents
    #[arg(short = 'd', long, env = "ROUTES_DATA_DIR", default_value = "routes_data")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the geometry, stops and frequency pipelines
    Build {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Write per-route geometries, the aggregate collection and the route index
    Routes {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Write the stop/route cross-reference documents
    Stops {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Write the weekday frequency document
    Frequencies {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Check a written per-route document, picked at random unless given
    Validate {
        #[command(flatten)]
        output: OutputArgs,

        /// Validate this document instead of a random one
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print headway diagnostics for every route with the given short name
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        /// Route short name, e.g. "539"
        #[arg(value_name = "SHORT_NAME")]
        short_name: String,
    },
    /// Audit stop codes in the written stop list
    StopCodes {
        #[command(flatten)]
        output: OutputArgs,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _file_guard = init_tracing();

    let cli = Cli::parse();
    let defaults = FieldDefaults::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Build { source, output } => {
            pipeline::build_all(&source.source, &defaults, &output.output_dir)?;
        }
        Commands::Routes { source, output } => {
            let feed = Feed::load(&source.source, Table::GEOMETRY)?;
            pipeline::build_routes(&feed, &defaults, &output.output_dir)?;
        }
        Commands::Stops { source, output } => {
            let feed = Feed::load(&source.source, Table::CROSS_REFERENCE)?;
            pipeline::build_stops(&feed, &defaults, &output.output_dir)?;
        }
        Commands::Frequencies { source, output } => {
            let feed = Feed::load(&source.source, Table::FREQUENCIES)?;
            pipeline::build_frequencies(&feed, &defaults, &output.output_dir)?;
        }
        Commands::Validate { output, file } => {
            let result = match file {
                Some(path) => validate::validate_document(&path),
                None => validate::validate_random(&output.output_dir, &mut rand::rng()),
            };
            if let Err(e) = &result {
                error!(error = %e, "Validation failed");
            }
            result?;
        }
        Commands::Inspect { source, short_name } => {
            let feed = Feed::load(&source.source, Table::FREQUENCIES)?;
            let join = FeedJoin::new(&feed);
            let inspections = inspect::inspect_routes(&join, &short_name, &defaults)?;
            if inspections.is_empty() {
                warn!(short_name = %short_name, "No route with this short name");
            }
            info!(short_name = %short_name, variants = inspections.len(), "Route variants");
            for inspection in &inspections {
                inspect::log_inspection(inspection);
            }
        }
        Commands::StopCodes { output } => {
            let report = stop_codes::audit_file(&output.output_dir.join(STOPS_WITH_ROUTES_FILE))?;
            stop_codes::log_report(&report);
        }
    }

    Ok(())
}

/// Logging setup: colored stderr plus a JSON rolling log file.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/gtfs_route_atlas.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_route_atlas.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", LevelFilter::INFO));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

fn env_filter(var: &str, default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var(var)
        .from_env_lossy()
}

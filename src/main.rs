//! Completion Bounds CLI
//!
//! Computes completion design ranges for one basin / flow unit and prints
//! them as JSON on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # From a CSV export of the analog well table
//! completion-bounds --basin Permian --flow-unit WCA --csv wells.csv
//!
//! # Excluding comparison groups, with a custom year floor
//! completion-bounds --basin Permian --flow-unit WCA --csv wells.csv \
//!     --exclude-group TCA-12 --exclude-group TCA-40 --min-year 2018
//!
//! # From PostgreSQL (feature `postgres`)
//! DATABASE_URL=postgresql://... completion-bounds --basin Permian --flow-unit WCA
//! ```
//!
//! # Environment Variables
//!
//! - `COMPLETION_BOUNDS_CONFIG`: Path to the pipeline TOML (default: ./completion_bounds.toml)
//! - `DATABASE_URL`: Connection string for the PostgreSQL source (`.env` is honoured)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use completion_bounds::types::{DEFAULT_MIN_COMPLETION_YEAR, INSUFFICIENT_DATA_MESSAGE};
use completion_bounds::{
    BoundsAnalyzer, BoundsConfig, BoundsRequest, CsvWellSource, PipelineOutcome, WellDataSource,
    WellFeature,
};

#[derive(Parser, Debug)]
#[command(name = "completion-bounds")]
#[command(about = "Completion design bounds from analog wells")]
#[command(version)]
struct CliArgs {
    /// Basin name (e.g. "Permian")
    #[arg(long)]
    basin: String,

    /// Analog flow-unit code
    #[arg(long)]
    flow_unit: String,

    /// Earliest completion year considered
    #[arg(long, default_value_t = DEFAULT_MIN_COMPLETION_YEAR)]
    min_year: i32,

    /// Comparison group (TCA) id to exclude; repeatable
    #[arg(long = "exclude-group", value_name = "ID")]
    exclude_groups: Vec<String>,

    /// Feature compared between completion years
    #[arg(long, default_value = "LateralLength_FT")]
    feature: WellFeature,

    /// Path to a CSV export of the well table
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// PostgreSQL connection string
    #[cfg(feature = "postgres")]
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Query timeout in seconds for the database source
    #[cfg(feature = "postgres")]
    #[arg(long, value_name = "SECS")]
    query_timeout: Option<u64>,

    /// Pipeline configuration file (overrides COMPLETION_BOUNDS_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the tagged pipeline outcome instead of the bare bounds
    #[arg(long)]
    outcome: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

// ============================================================================
// Helpers
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<BoundsConfig> {
    match path {
        Some(path) => BoundsConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(BoundsConfig::load()),
    }
}

fn build_source(args: &CliArgs) -> Result<Box<dyn WellDataSource>> {
    match &args.csv {
        Some(path) => Ok(Box::new(CsvWellSource::new(path))),
        None => database_source(args),
    }
}

#[cfg(feature = "postgres")]
fn database_source(args: &CliArgs) -> Result<Box<dyn WellDataSource>> {
    use completion_bounds::{DatabaseConfig, PostgresWellSource};

    let mut db = match &args.database_url {
        Some(url) => DatabaseConfig::from_connection_string(url),
        None => DatabaseConfig::from_env().context("No --csv given and no database configured")?,
    };
    if let Some(secs) = args.query_timeout {
        db = db.with_timeout(secs);
    }
    Ok(Box::new(PostgresWellSource::new(db)))
}

#[cfg(not(feature = "postgres"))]
fn database_source(_args: &CliArgs) -> Result<Box<dyn WellDataSource>> {
    anyhow::bail!("No data source: pass --csv <PATH> (or build with the `postgres` feature)")
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.json_logs);

    let config = load_config(args.config.as_ref())?;
    let source = build_source(&args)?;

    let request = BoundsRequest::new(&args.basin, &args.flow_unit)
        .with_excluded_groups(args.exclude_groups.iter().cloned())
        .with_min_completion_year(args.min_year)
        .with_year_window_feature(args.feature);

    info!(
        basin = %request.basin,
        flow_unit = %request.flow_unit,
        excluded_groups = request.excluded_group_ids.len(),
        "Starting bounds pipeline"
    );
    let outcome = BoundsAnalyzer::run(source.as_ref(), &request, &config)
        .context("Bounds pipeline failed")?;

    let output = match (&outcome, args.outcome) {
        (_, true) => serde_json::to_string_pretty(&outcome)?,
        (PipelineOutcome::Bounds { bounds, .. }, false) => serde_json::to_string_pretty(bounds)?,
        (PipelineOutcome::InsufficientData(detail), false) => {
            warn!(
                stage = %detail.stage,
                available = detail.available,
                required = detail.required,
                "Insufficient data"
            );
            INSUFFICIENT_DATA_MESSAGE.to_string()
        }
    };
    println!("{output}");

    Ok(())
}

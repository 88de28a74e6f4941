//! Synthetic Analog Well Table
//!
//! Generates a CSV well table in the column layout read by
//! `completion-bounds --csv`. Each completion year gets its own lateral
//! length trend, and the generator can plant:
//! - Completion design outliers (proppant/fluid far off trend)
//! - Unbound wells
//! - Missing or non-numeric cells
//!
//! # Usage
//! ```bash
//! ./synthetic-wells --rows 400 --seed 7 --output wells.csv
//! ./completion-bounds --basin Permian --flow-unit WCA --csv wells.csv
//! ```

use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use completion_bounds::source::LocatedRow;
use completion_bounds::types::{RawWellRow, PRODUCING_STATUS, UNBOUND_CATEGORY};
use completion_bounds::CsvWellSource;

// ============================================================================
// Completion Design Constants
// ============================================================================

/// Baseline proppant intensity (lbs/ft)
const BASE_PROPPANT: f64 = 2000.0;
/// Baseline fluid intensity (bbl/ft)
const BASE_FLUID: f64 = 45.0;
/// Baseline horizontal spacing (ft)
const BASE_SPACING: f64 = 700.0;
/// Lateral length of the first year (ft)
const BASE_LATERAL: f64 = 7500.0;
/// Lateral length gained per year (ft)
const LATERAL_GROWTH: f64 = 350.0;

const OPERATORS: [&str; 4] = [
    "Mesa Operating",
    "Caprock Energy",
    "Llano Resources",
    "Pecos Partners",
];
const BOUNDARY_CATEGORIES: [&str; 2] = ["BOUNDED", "HALF_BOUNDED"];

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "synthetic-wells")]
#[command(about = "Synthetic analog well table for completion-bounds testing")]
#[command(version = "1.0")]
struct Args {
    /// Total wells to generate
    #[arg(short, long, default_value = "300")]
    rows: usize,

    /// First completion year
    #[arg(long, default_value = "2016")]
    first_year: i32,

    /// Last completion year
    #[arg(long, default_value = "2023")]
    last_year: i32,

    /// Basin written to every row
    #[arg(long, default_value = "Permian")]
    basin: String,

    /// Flow unit written to every row
    #[arg(long, default_value = "WCA")]
    flow_unit: String,

    /// Fraction of wells with off-trend completion designs
    #[arg(long, default_value = "0.05")]
    outlier_fraction: f64,

    /// Fraction of wells marked unbound
    #[arg(long, default_value = "0.05")]
    unbound_fraction: f64,

    /// Fraction of wells with a missing or garbled cell
    #[arg(long, default_value = "0.02")]
    missing_fraction: f64,

    /// Random seed for reproducibility
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suppress the summary on stderr
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Generator
// ============================================================================

struct WellGenerator {
    rng: StdRng,
    proppant: Normal<f64>,
    fluid: Normal<f64>,
    spacing: Normal<f64>,
    lateral_noise: Normal<f64>,
}

impl WellGenerator {
    fn new(seed: u64) -> Result<Self, rand_distr::NormalError> {
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            proppant: Normal::new(BASE_PROPPANT, 180.0)?,
            fluid: Normal::new(BASE_FLUID, 5.0)?,
            spacing: Normal::new(BASE_SPACING, 70.0)?,
            lateral_noise: Normal::new(0.0, 900.0)?,
        })
    }

    fn well(&mut self, index: usize, year: i32, first_year: i32, args: &Args) -> RawWellRow {
        let mut proppant = self.proppant.sample(&mut self.rng);
        let mut fluid = self.fluid.sample(&mut self.rng) + (proppant - BASE_PROPPANT) * 0.01;
        let spacing = self.spacing.sample(&mut self.rng).max(150.0);
        let trend = BASE_LATERAL + LATERAL_GROWTH * f64::from(year - first_year);
        let lateral = (trend + self.lateral_noise.sample(&mut self.rng)).max(2500.0);

        if self.rng.gen_bool(args.outlier_fraction) {
            proppant *= self.rng.gen_range(2.0..3.5);
            fluid *= self.rng.gen_range(2.0..3.0);
        }

        let boundary = if self.rng.gen_bool(args.unbound_fraction) {
            UNBOUND_CATEGORY
        } else {
            BOUNDARY_CATEGORIES[index % BOUNDARY_CATEGORIES.len()]
        };

        let api10 = format!("42{:08}", 3_000_000 + index);
        let mut row = RawWellRow {
            api14: Some(format!("{api10}0000")),
            api10: Some(api10),
            group_id: Some(format!("TCA-{}", index % 12)),
            well_status: Some(PRODUCING_STATUS.to_string()),
            operator: Some(OPERATORS[index % OPERATORS.len()].to_string()),
            completion_year: Some(year.to_string()),
            lateral_length_ft: Some(format!("{lateral:.0}")),
            proppant_lbs_per_ft: Some(format!("{proppant:.1}")),
            fluid_bbl_per_ft: Some(format!("{fluid:.2}")),
            spacing_ft: Some(format!("{spacing:.0}")),
            boundary_category: Some(boundary.to_string()),
        };

        if self.rng.gen_bool(args.missing_fraction) {
            match self.rng.gen_range(0..3) {
                0 => row.lateral_length_ft = Some("n/a".to_string()),
                1 => row.spacing_ft = None,
                _ => row.proppant_lbs_per_ft = None,
            }
        }
        row
    }
}

/// Every planted-fault fraction must be a probability.
fn validate_fractions(args: &Args) -> Result<(), String> {
    let fractions = [
        ("--outlier-fraction", args.outlier_fraction),
        ("--unbound-fraction", args.unbound_fraction),
        ("--missing-fraction", args.missing_fraction),
    ];
    for (flag, value) in fractions {
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("{flag} must be in [0, 1], got {value}"));
        }
    }
    Ok(())
}

fn log_summary(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if args.last_year < args.first_year {
        return Err(format!(
            "--last-year {} is before --first-year {}",
            args.last_year, args.first_year
        )
        .into());
    }
    validate_fractions(&args)?;

    let mut generator = WellGenerator::new(args.seed)?;
    let years = (args.last_year - args.first_year + 1) as usize;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    writeln!(out, "{}", CsvWellSource::header_line())?;

    for index in 0..args.rows {
        // Later years get more wells
        let slot = (index * years * (years + 1) / 2) / args.rows.max(1);
        let year_offset = (0..years)
            .find(|&y| slot < (y + 1) * (y + 2) / 2)
            .unwrap_or(years - 1);
        let year = args.first_year + year_offset as i32;

        let located = LocatedRow {
            basin: args.basin.clone(),
            flow_unit: args.flow_unit.clone(),
            row: generator.well(index, year, args.first_year, &args),
        };
        writeln!(out, "{}", CsvWellSource::format_row(&located))?;
    }
    out.flush()?;

    log_summary(
        &format!(
            "Generated {} wells for {}/{} over {}-{} (seed {})",
            args.rows, args.basin, args.flow_unit, args.first_year, args.last_year, args.seed
        ),
        args.quiet,
    );
    Ok(())
}

//! Well data source abstraction.
//!
//! The bounds pipeline only needs one synchronous round trip that returns a
//! flat table of well rows. Where those rows come from is injected through
//! [`WellDataSource`]:
//!
//! - [`CsvWellSource`]: header-driven CSV export of the analog well table
//! - [`StaticWellSource`]: rows held in memory
//! - `PostgresWellSource`: the well/flow-unit/basin join (feature `postgres`)

mod csv_file;
#[cfg(feature = "postgres")]
mod postgres;

pub use self::csv_file::CsvWellSource;
#[cfg(feature = "postgres")]
pub use self::postgres::{DatabaseConfig, PostgresWellSource};

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{RawWellRow, PRODUCING_STATUS};

/// Retrieval filter shared by every source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellQuery {
    pub basin: String,
    pub flow_unit: String,
    pub min_completion_year: i32,
}

impl WellQuery {
    pub fn new(
        basin: impl Into<String>,
        flow_unit: impl Into<String>,
        min_completion_year: i32,
    ) -> Self {
        Self {
            basin: basin.into(),
            flow_unit: flow_unit.into(),
            min_completion_year,
        }
    }
}

#[derive(Debug, Error)]
pub enum DataRetrievalError {
    #[error("I/O error reading {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Malformed well table: {0}")]
    Format(String),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Query timed out after {0} seconds")]
    Timeout(u64),
}

/// Where well rows come from.
///
/// Implementations return only producing wells of the requested basin and
/// flow unit completed in or after `min_completion_year`. Numeric cells are
/// returned raw; coercion is the pipeline's job.
pub trait WellDataSource {
    /// Fetch all matching rows in one round trip.
    fn fetch(&self, query: &WellQuery) -> Result<Vec<RawWellRow>, DataRetrievalError>;

    /// Human-readable name for logging (e.g. "CSV", "static", "PostgreSQL").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Static Source (in-memory rows)
// ============================================================================

/// Rows tagged with their basin and flow unit, filtered on fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedRow {
    pub basin: String,
    pub flow_unit: String,
    pub row: RawWellRow,
}

/// In-memory well table.
#[derive(Debug, Clone, Default)]
pub struct StaticWellSource {
    rows: Vec<LocatedRow>,
}

impl StaticWellSource {
    pub fn new(rows: Vec<LocatedRow>) -> Self {
        Self { rows }
    }

    /// All rows share one basin and flow unit.
    pub fn single_unit(basin: &str, flow_unit: &str, rows: Vec<RawWellRow>) -> Self {
        Self::new(
            rows.into_iter()
                .map(|row| LocatedRow {
                    basin: basin.to_string(),
                    flow_unit: flow_unit.to_string(),
                    row,
                })
                .collect(),
        )
    }
}

impl WellDataSource for StaticWellSource {
    fn fetch(&self, query: &WellQuery) -> Result<Vec<RawWellRow>, DataRetrievalError> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.basin == query.basin && r.flow_unit == query.flow_unit)
            .filter(|r| matches_status_and_year(&r.row, query.min_completion_year))
            .map(|r| r.row.clone())
            .collect())
    }

    fn source_name(&self) -> &str {
        "static"
    }
}

/// Producing-status and minimum-year filter for sources that hold raw text.
///
/// A year cell that does not parse cannot be compared; the row is passed on
/// so the cleaning stage drops and counts it.
pub(crate) fn matches_status_and_year(row: &RawWellRow, min_completion_year: i32) -> bool {
    if row.well_status.as_deref().map(str::trim) != Some(PRODUCING_STATUS) {
        return false;
    }
    match row
        .completion_year
        .as_deref()
        .and_then(|y| y.trim().parse::<f64>().ok())
    {
        Some(year) => year >= f64::from(min_completion_year),
        None => true,
    }
}

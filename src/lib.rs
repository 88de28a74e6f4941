//! Completion Bounds: Analog-Well Completion Design Ranges
//!
//! Batch statistics pipeline that turns the analog wells of one basin and
//! flow unit into min/max ranges for proppant intensity, fluid intensity,
//! well spacing and completion year.
//!
//! ## Architecture
//!
//! - **Source**: Pluggable well data retrieval (CSV, in-memory, PostgreSQL)
//! - **Bounds Engine**: Cleaning, year-window selection, robust outlier
//!   scoring and adaptive thresholding
//! - **Config**: TOML pipeline configuration with validated defaults

pub mod config;
pub mod types;
pub mod source;
pub mod bounds_engine;

// Re-export configuration
pub use config::{BoundsConfig, ConfigError};

// Re-export commonly used types
pub use types::{
    BoundsRequest, FeatureBounds, FeatureBoundsSummary, InsufficientData, InsufficientStage,
    PipelineOutcome, RawWellRow, WellDataset, WellFeature, WellRecord,
};

// Re-export data sources
pub use source::{CsvWellSource, DataRetrievalError, StaticWellSource, WellDataSource, WellQuery};
#[cfg(feature = "postgres")]
pub use source::{DatabaseConfig, PostgresWellSource};

// Re-export the pipeline
pub use bounds_engine::{BoundsAnalyzer, BoundsError};

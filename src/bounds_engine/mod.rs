//! Completion Design Bounds Engine
//!
//! Derives min/max ranges of proppant intensity, fluid intensity and well
//! spacing from analog wells of one basin and flow unit.
//!
//! ## Architecture
//! - `well_filter`: Unbound/excluded-group filtering and numeric coercion
//! - `year_window`: Backward year walk with a two-sample t-test (statrs)
//! - `similarity`: Pooled-variance t-test
//! - `mcd`: FastMCD robust covariance (nalgebra)
//! - `outlier_detector`: Robust Mahalanobis distances on a synthetic reference sample
//! - `threshold_fitter`: Log-normal fit and R²-driven distance cutoff
//! - `analyzer`: Main orchestrator for one pipeline run
//! - `descriptive`: Shared means, quantiles and covariances

pub mod descriptive;
pub mod similarity;
pub mod well_filter;
pub mod year_window;
pub mod mcd;
pub mod outlier_detector;
pub mod threshold_fitter;
pub mod analyzer;

// Re-export public types
pub use analyzer::BoundsAnalyzer;
pub use mcd::{CovarianceError, McdEstimate, McdOptions, MinCovDet};
pub use outlier_detector::RobustOutlierDetector;
pub use similarity::{TTestResult, TwoSampleTTest};
pub use threshold_fitter::{AdaptiveThresholdFitter, Histogram};
pub use well_filter::{FilterResult, RejectionReason, WellFilter};
pub use year_window::{YearWindow, YearWindowSelector};

use thiserror::Error;

use crate::source::DataRetrievalError;

/// Failures of a pipeline run. Too little data is not an error; see
/// [`crate::types::PipelineOutcome::InsufficientData`].
#[derive(Debug, Error)]
pub enum BoundsError {
    #[error("Data retrieval failed: {0}")]
    DataRetrieval(#[from] DataRetrievalError),

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Degenerate distances: {0}")]
    DegenerateDistances(String),

    #[error("Robust covariance estimation failed: {0}")]
    Estimation(CovarianceError),
}

impl From<CovarianceError> for BoundsError {
    fn from(err: CovarianceError) -> Self {
        match err {
            CovarianceError::Singular(msg) => Self::SingularMatrix(msg),
            other => Self::Estimation(other),
        }
    }
}

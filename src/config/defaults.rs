//! Pipeline default constants.
//!
//! Every `BoundsConfig` field defaults to one of these. Grouped by stage.

// ============================================================================
// Year Window
// ============================================================================

/// p-value a candidate year must strictly exceed to count as similar.
pub const YEAR_SIMILARITY_P_VALUE: f64 = 0.01;

/// Quantile of the per-year well counts used as the minimum window size.
pub const YEAR_COUNT_QUANTILE: f64 = 0.25;

/// Earliest completion year the backward walk may reach.
pub const EARLIEST_WINDOW_YEAR: i32 = 2016;

// ============================================================================
// Guards
// ============================================================================

/// Minimum wells inside the year window before outlier analysis runs.
pub const MIN_WINDOW_ROWS: usize = 40;

// ============================================================================
// Lateral Length Bounds
// ============================================================================

/// Shortest lateral (ft) kept for analysis.
pub const MIN_LATERAL_FT: f64 = 3_500.0;

/// Upper lateral bound (ft) is never below this.
pub const MAX_LATERAL_FLOOR_FT: f64 = 20_000.0;

/// Quantile of lateral length that can lift the upper bound above the floor.
pub const LATERAL_UPPER_QUANTILE: f64 = 0.975;

// ============================================================================
// Robust Outlier Detection
// ============================================================================

/// Significance level of the chi-squared gross-outlier cutoff.
pub const OUTLIER_ALPHA: f64 = 0.1;

/// Size of the synthetic multivariate-normal reference sample.
pub const REFERENCE_SAMPLE_SIZE: usize = 506;

/// Seed shared by reference sampling and FastMCD subset selection.
pub const OUTLIER_SEED: u64 = 0;

/// Random initial supports drawn by FastMCD.
pub const MCD_TRIALS: usize = 30;

/// Lowest-determinant candidates refined to convergence.
pub const MCD_BEST_CANDIDATES: usize = 10;

/// Cap on concentration steps during refinement.
pub const MCD_MAX_C_STEPS: usize = 30;

/// Concentration steps applied to every initial support before selection.
pub const MCD_INITIAL_C_STEPS: usize = 2;

// ============================================================================
// Adaptive Threshold
// ============================================================================

/// Rows per histogram bin before clamping.
pub const ROWS_PER_BIN: usize = 6;

pub const MIN_HISTOGRAM_BINS: usize = 10;

pub const MAX_HISTOGRAM_BINS: usize = 30;

/// R² at or below which the most aggressive percentile applies.
pub const R2_FLOOR: f64 = 0.80;

/// R² at or above which the most lenient percentile applies.
pub const R2_CEILING: f64 = 0.95;

/// Cutoff percentile applied when the log-normal fit is poor.
pub const MIN_CUTOFF_PERCENTILE: f64 = 0.80;

/// Cutoff percentile applied when the log-normal fit is good.
pub const MAX_CUTOFF_PERCENTILE: f64 = 0.95;

//! Bounds Configuration - pipeline tunables as TOML values
//!
//! Each section implements `Default` with values from `defaults`, so a run
//! with no config file reproduces the reference pipeline exactly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "COMPLETION_BOUNDS_CONFIG";

/// Config file looked for in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "completion_bounds.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a bounds run.
///
/// Load with `BoundsConfig::load()` which searches:
/// 1. `$COMPLETION_BOUNDS_CONFIG`
/// 2. `./completion_bounds.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundsConfig {
    #[serde(default)]
    pub year_window: YearWindowConfig,

    #[serde(default)]
    pub guards: GuardConfig,

    #[serde(default)]
    pub lateral: LateralConfig,

    #[serde(default)]
    pub outliers: OutlierConfig,

    #[serde(default)]
    pub threshold: ThresholdConfig,
}

impl BoundsConfig {
    /// Load configuration using the standard search order.
    ///
    /// A file that fails to load is logged and skipped, never fatal.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded bounds config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(
                            path = %p.display(),
                            error = %e,
                            "Failed to load config from {CONFIG_ENV_VAR}, falling back"
                        );
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded bounds config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys only warn; structural and range problems are errors.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every section, collecting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let y = &self.year_window;
        Self::check_unit_open(y.similarity_p_value, "year_window.similarity_p_value", &mut errors);
        Self::check_unit_closed(y.count_quantile, "year_window.count_quantile", &mut errors);

        if self.guards.min_window_rows == 0 {
            errors.push("guards.min_window_rows must be > 0".to_string());
        }

        let l = &self.lateral;
        Self::check_finite(l.min_ft, "lateral.min_ft", &mut errors);
        Self::check_finite(l.max_floor_ft, "lateral.max_floor_ft", &mut errors);
        if l.min_ft.is_finite() && l.max_floor_ft.is_finite() && l.min_ft >= l.max_floor_ft {
            errors.push(format!(
                "lateral.min_ft ({:.0}) must be less than max_floor_ft ({:.0})",
                l.min_ft, l.max_floor_ft
            ));
        }
        Self::check_unit_closed(l.upper_quantile, "lateral.upper_quantile", &mut errors);

        let o = &self.outliers;
        Self::check_unit_open(o.alpha, "outliers.alpha", &mut errors);
        if o.reference_sample_size == 0 {
            errors.push("outliers.reference_sample_size must be > 0".to_string());
        }
        if o.mcd_trials == 0 {
            errors.push("outliers.mcd_trials must be > 0".to_string());
        }
        if o.mcd_best_candidates == 0 || o.mcd_best_candidates > o.mcd_trials {
            errors.push(format!(
                "outliers.mcd_best_candidates ({}) must be in 1..=mcd_trials ({})",
                o.mcd_best_candidates, o.mcd_trials
            ));
        }
        if o.mcd_max_c_steps == 0 {
            errors.push("outliers.mcd_max_c_steps must be > 0".to_string());
        }
        if let Some(fraction) = o.support_fraction {
            if !(fraction.is_finite() && fraction > 0.0 && fraction <= 1.0) {
                errors.push(format!(
                    "outliers.support_fraction ({fraction}) must be in (0, 1]"
                ));
            }
        }

        let t = &self.threshold;
        if t.rows_per_bin == 0 {
            errors.push("threshold.rows_per_bin must be > 0".to_string());
        }
        if t.min_bins == 0 || t.min_bins > t.max_bins {
            errors.push(format!(
                "threshold.min_bins ({}) must be in 1..=max_bins ({})",
                t.min_bins, t.max_bins
            ));
        }
        Self::check_escalation(t.r2_floor, t.r2_ceiling, "threshold.r2", &mut errors);
        Self::check_escalation(
            t.min_cutoff_percentile,
            t.max_cutoff_percentile,
            "threshold.cutoff_percentile",
            &mut errors,
        );
        Self::check_unit_open(
            t.min_cutoff_percentile,
            "threshold.min_cutoff_percentile",
            &mut errors,
        );
        Self::check_unit_open(
            t.max_cutoff_percentile,
            "threshold.max_cutoff_percentile",
            &mut errors,
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_finite(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() {
            errors.push(format!("{name}: value must be finite (got {value})"));
        }
    }

    /// Value strictly inside (0, 1)
    fn check_unit_open(value: f64, name: &str, errors: &mut Vec<String>) {
        if !(value.is_finite() && value > 0.0 && value < 1.0) {
            errors.push(format!("{name} ({value}) must be in (0, 1)"));
        }
    }

    /// Value inside [0, 1]
    fn check_unit_closed(value: f64, name: &str, errors: &mut Vec<String>) {
        if !(0.0..=1.0).contains(&value) {
            errors.push(format!("{name} ({value}) must be in [0, 1]"));
        }
    }

    fn check_escalation(low: f64, high: f64, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass
        if !low.is_finite() || !high.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got floor={low}, ceiling={high})"
            ));
            return;
        }
        if high <= low {
            errors.push(format!(
                "{name}: ceiling ({high:.3}) must be > floor ({low:.3})"
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Year Window
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearWindowConfig {
    /// Candidate year is similar when its t-test p-value is strictly above this
    #[serde(default = "default_similarity_p_value")]
    pub similarity_p_value: f64,

    /// Quantile of per-year counts that sets the minimum window size
    #[serde(default = "default_count_quantile")]
    pub count_quantile: f64,

    /// The backward walk never goes before this year, whatever the retrieval floor
    #[serde(default = "default_earliest_year")]
    pub earliest_year: i32,
}

fn default_similarity_p_value() -> f64 {
    defaults::YEAR_SIMILARITY_P_VALUE
}
fn default_count_quantile() -> f64 {
    defaults::YEAR_COUNT_QUANTILE
}
fn default_earliest_year() -> i32 {
    defaults::EARLIEST_WINDOW_YEAR
}

impl Default for YearWindowConfig {
    fn default() -> Self {
        Self {
            similarity_p_value: default_similarity_p_value(),
            count_quantile: default_count_quantile(),
            earliest_year: default_earliest_year(),
        }
    }
}

// ============================================================================
// Guards
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Wells required inside the year window
    #[serde(default = "default_min_window_rows")]
    pub min_window_rows: usize,
}

fn default_min_window_rows() -> usize {
    defaults::MIN_WINDOW_ROWS
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_window_rows: default_min_window_rows(),
        }
    }
}

// ============================================================================
// Lateral Length
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateralConfig {
    #[serde(default = "default_min_lateral")]
    pub min_ft: f64,

    #[serde(default = "default_max_lateral_floor")]
    pub max_floor_ft: f64,

    #[serde(default = "default_lateral_upper_quantile")]
    pub upper_quantile: f64,
}

fn default_min_lateral() -> f64 {
    defaults::MIN_LATERAL_FT
}
fn default_max_lateral_floor() -> f64 {
    defaults::MAX_LATERAL_FLOOR_FT
}
fn default_lateral_upper_quantile() -> f64 {
    defaults::LATERAL_UPPER_QUANTILE
}

impl Default for LateralConfig {
    fn default() -> Self {
        Self {
            min_ft: default_min_lateral(),
            max_floor_ft: default_max_lateral_floor(),
            upper_quantile: default_lateral_upper_quantile(),
        }
    }
}

// ============================================================================
// Robust Outliers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    #[serde(default = "default_reference_sample_size")]
    pub reference_sample_size: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// FastMCD support fraction; `None` uses (n + p + 1) / 2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_fraction: Option<f64>,

    #[serde(default = "default_mcd_trials")]
    pub mcd_trials: usize,

    #[serde(default = "default_mcd_best")]
    pub mcd_best_candidates: usize,

    #[serde(default = "default_mcd_max_c_steps")]
    pub mcd_max_c_steps: usize,
}

fn default_alpha() -> f64 {
    defaults::OUTLIER_ALPHA
}
fn default_reference_sample_size() -> usize {
    defaults::REFERENCE_SAMPLE_SIZE
}
fn default_seed() -> u64 {
    defaults::OUTLIER_SEED
}
fn default_mcd_trials() -> usize {
    defaults::MCD_TRIALS
}
fn default_mcd_best() -> usize {
    defaults::MCD_BEST_CANDIDATES
}
fn default_mcd_max_c_steps() -> usize {
    defaults::MCD_MAX_C_STEPS
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            reference_sample_size: default_reference_sample_size(),
            seed: default_seed(),
            support_fraction: None,
            mcd_trials: default_mcd_trials(),
            mcd_best_candidates: default_mcd_best(),
            mcd_max_c_steps: default_mcd_max_c_steps(),
        }
    }
}

// ============================================================================
// Adaptive Threshold
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_rows_per_bin")]
    pub rows_per_bin: usize,

    #[serde(default = "default_min_bins")]
    pub min_bins: usize,

    #[serde(default = "default_max_bins")]
    pub max_bins: usize,

    #[serde(default = "default_r2_floor")]
    pub r2_floor: f64,

    #[serde(default = "default_r2_ceiling")]
    pub r2_ceiling: f64,

    #[serde(default = "default_min_cutoff")]
    pub min_cutoff_percentile: f64,

    #[serde(default = "default_max_cutoff")]
    pub max_cutoff_percentile: f64,
}

fn default_rows_per_bin() -> usize {
    defaults::ROWS_PER_BIN
}
fn default_min_bins() -> usize {
    defaults::MIN_HISTOGRAM_BINS
}
fn default_max_bins() -> usize {
    defaults::MAX_HISTOGRAM_BINS
}
fn default_r2_floor() -> f64 {
    defaults::R2_FLOOR
}
fn default_r2_ceiling() -> f64 {
    defaults::R2_CEILING
}
fn default_min_cutoff() -> f64 {
    defaults::MIN_CUTOFF_PERCENTILE
}
fn default_max_cutoff() -> f64 {
    defaults::MAX_CUTOFF_PERCENTILE
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            rows_per_bin: default_rows_per_bin(),
            min_bins: default_min_bins(),
            max_bins: default_max_bins(),
            r2_floor: default_r2_floor(),
            r2_ceiling: default_r2_ceiling(),
            min_cutoff_percentile: default_min_cutoff(),
            max_cutoff_percentile: default_max_cutoff(),
        }
    }
}

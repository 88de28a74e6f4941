//! Bounds engine types: BoundsRequest, OutlierFlagSet, ThresholdFit,
//! FeatureBoundsSummary, PipelineOutcome

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use super::{WellFeature, WellRecord};

/// Default earliest completion year considered
pub const DEFAULT_MIN_COMPLETION_YEAR: i32 = 2016;

/// Message reported for the insufficient-data outcome
pub const INSUFFICIENT_DATA_MESSAGE: &str = "Not enough data available to calculate metrics";

// ============================================================================
// Request
// ============================================================================

/// One basin / flow-unit bounds request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundsRequest {
    pub basin: String,
    pub flow_unit: String,
    /// TCA ids whose wells are left out of the comparison
    #[serde(default)]
    pub excluded_group_ids: HashSet<String>,
    #[serde(default = "default_min_completion_year")]
    pub min_completion_year: i32,
    /// Feature whose per-year distribution drives year-window selection
    #[serde(default = "default_year_window_feature")]
    pub year_window_feature: WellFeature,
}

fn default_min_completion_year() -> i32 {
    DEFAULT_MIN_COMPLETION_YEAR
}
fn default_year_window_feature() -> WellFeature {
    WellFeature::LateralLength
}

impl BoundsRequest {
    pub fn new(basin: impl Into<String>, flow_unit: impl Into<String>) -> Self {
        Self {
            basin: basin.into(),
            flow_unit: flow_unit.into(),
            excluded_group_ids: HashSet::new(),
            min_completion_year: DEFAULT_MIN_COMPLETION_YEAR,
            year_window_feature: WellFeature::LateralLength,
        }
    }

    pub fn with_excluded_groups<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_group_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub const fn with_min_completion_year(mut self, year: i32) -> Self {
        self.min_completion_year = year;
        self
    }

    pub const fn with_year_window_feature(mut self, feature: WellFeature) -> Self {
        self.year_window_feature = feature;
        self
    }
}

// ============================================================================
// Stage Outputs
// ============================================================================

/// Gross outliers flagged by the robust detector.
///
/// `distances[i]` belongs to row `i` of the subset the detector was run on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierFlagSet {
    pub outlier_indices: BTreeSet<usize>,
    pub distances: Vec<f64>,
    /// sqrt of the chi-squared (1 - alpha) quantile
    pub critical_distance: f64,
}

impl OutlierFlagSet {
    pub fn is_outlier(&self, index: usize) -> bool {
        self.outlier_indices.contains(&index)
    }

    pub fn outlier_count(&self) -> usize {
        self.outlier_indices.len()
    }
}

/// Diagnostics of the log-normal fit behind the adaptive threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdFit {
    pub bins: usize,
    /// MLE mean of log-distances
    pub mu: f64,
    /// MLE standard deviation of log-distances
    pub sigma: f64,
    pub r_squared: f64,
    /// Sum of squared errors, histogram density vs fitted density
    pub sse: f64,
    pub percentile: f64,
    /// Rows with log-distance strictly below this survive
    pub log_threshold: f64,
}

// ============================================================================
// Final Summary
// ============================================================================

/// Observed range of one feature over the surviving wells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBounds {
    pub min: f64,
    pub max: f64,
}

/// Per-feature min/max over the final wells.
///
/// Always holds exactly the [`WellFeature::SUMMARY`] keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureBoundsSummary(BTreeMap<WellFeature, FeatureBounds>);

impl FeatureBoundsSummary {
    /// Summarise a non-empty set of wells; `None` when empty.
    pub fn from_records<'a, I>(records: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a WellRecord>,
    {
        let mut bounds: BTreeMap<WellFeature, FeatureBounds> = BTreeMap::new();
        for record in records {
            for feature in WellFeature::SUMMARY {
                let v = record.value(feature);
                if !v.is_finite() {
                    continue;
                }
                bounds
                    .entry(feature)
                    .and_modify(|b| {
                        b.min = b.min.min(v);
                        b.max = b.max.max(v);
                    })
                    .or_insert(FeatureBounds { min: v, max: v });
            }
        }

        if bounds.len() == WellFeature::SUMMARY.len() {
            Some(Self(bounds))
        } else {
            None
        }
    }

    pub fn get(&self, feature: WellFeature) -> Option<&FeatureBounds> {
        self.0.get(&feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WellFeature, &FeatureBounds)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Pipeline stage at which too few wells remained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsufficientStage {
    /// Nothing left after filtering and coercion
    Cleaning,
    /// Below the row floor after year-window selection
    YearWindow,
    /// Too few wells inside the lateral-length bounds to estimate a covariance
    LateralBounds,
    /// Adaptive threshold removed every well
    ThresholdPruning,
}

impl fmt::Display for InsufficientStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cleaning => "cleaning",
            Self::YearWindow => "year window",
            Self::LateralBounds => "lateral bounds",
            Self::ThresholdPruning => "threshold pruning",
        };
        f.write_str(s)
    }
}

/// Defined outcome when the guards fail; not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientData {
    pub stage: InsufficientStage,
    pub available: usize,
    pub required: usize,
}

impl fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{INSUFFICIENT_DATA_MESSAGE} ({} stage: {} wells, need {})",
            self.stage, self.available, self.required
        )
    }
}

/// Result of one bounds pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Bounds {
        bounds: FeatureBoundsSummary,
        /// Wells left after the adaptive threshold
        survivors: usize,
        threshold: ThresholdFit,
    },
    InsufficientData(InsufficientData),
}

impl PipelineOutcome {
    pub const fn insufficient(
        stage: InsufficientStage,
        available: usize,
        required: usize,
    ) -> Self {
        Self::InsufficientData(InsufficientData {
            stage,
            available,
            required,
        })
    }

    pub const fn bounds(&self) -> Option<&FeatureBoundsSummary> {
        match self {
            Self::Bounds { bounds, .. } => Some(bounds),
            Self::InsufficientData(_) => None,
        }
    }

    pub const fn survivors(&self) -> Option<usize> {
        match self {
            Self::Bounds { survivors, .. } => Some(*survivors),
            Self::InsufficientData(_) => None,
        }
    }

    pub const fn threshold(&self) -> Option<&ThresholdFit> {
        match self {
            Self::Bounds { threshold, .. } => Some(threshold),
            Self::InsufficientData(_) => None,
        }
    }

    pub const fn is_insufficient(&self) -> bool {
        matches!(self, Self::InsufficientData(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, proppant: f64) -> WellRecord {
        WellRecord {
            api10: format!("API-{year}-{proppant}"),
            group_id: None,
            well_status: None,
            operator: None,
            boundary_category: None,
            completion_year: year,
            lateral_length_ft: 10_000.0,
            proppant_lbs_per_ft: proppant,
            fluid_bbl_per_ft: 45.0,
            spacing_ft: 660.0,
        }
    }

    #[test]
    fn test_summary_has_exactly_four_keys() {
        let wells = [record(2019, 1800.0), record(2021, 2400.0)];
        let summary = FeatureBoundsSummary::from_records(&wells).unwrap();

        assert_eq!(summary.len(), 4);
        assert!(summary.get(WellFeature::LateralLength).is_none());
        let proppant = summary.get(WellFeature::Proppant).unwrap();
        assert_eq!((proppant.min, proppant.max), (1800.0, 2400.0));
        let year = summary.get(WellFeature::CompletionYear).unwrap();
        assert_eq!((year.min, year.max), (2019.0, 2021.0));
    }

    #[test]
    fn test_summary_of_nothing_is_none() {
        let wells: [WellRecord; 0] = [];
        assert!(FeatureBoundsSummary::from_records(&wells).is_none());
    }

    #[test]
    fn test_summary_json_uses_column_names() {
        let wells = [record(2020, 2000.0)];
        let summary = FeatureBoundsSummary::from_records(&wells).unwrap();
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["Proppant_LBSPerFT"]["min"], 2000.0);
        assert_eq!(json["CompletionYear"]["max"], 2020.0);
        assert!(json.get("LateralLength_FT").is_none());
    }

    #[test]
    fn test_insufficient_display_mentions_message() {
        let outcome = PipelineOutcome::insufficient(InsufficientStage::YearWindow, 30, 40);
        assert!(outcome.is_insufficient());
        if let PipelineOutcome::InsufficientData(info) = outcome {
            let text = info.to_string();
            assert!(text.starts_with(INSUFFICIENT_DATA_MESSAGE));
            assert!(text.contains("30"));
        }
    }
}

//! Well types: RawWellRow, WellRecord, WellFeature, WellDataset

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Boundary category value that marks a well with no offset neighbours.
pub const UNBOUND_CATEGORY: &str = "UNBOUND";

/// Well status filter applied by every data source.
pub const PRODUCING_STATUS: &str = "PRODUCING";

// ============================================================================
// Feature Columns
// ============================================================================

/// Numeric analysis columns of the well dataset.
///
/// Serialized names match the tabular column contract of the data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WellFeature {
    #[serde(rename = "CompletionYear")]
    CompletionYear,
    #[serde(rename = "LateralLength_FT")]
    LateralLength,
    #[serde(rename = "Proppant_LBSPerFT")]
    Proppant,
    #[serde(rename = "Fluid_BBLPerFT")]
    Fluid,
    #[serde(rename = "SpacingHzAnyZoneAtDrill")]
    Spacing,
}

impl WellFeature {
    /// All five coerced numeric columns, in cleaning order.
    pub const NUMERIC: [Self; 5] = [
        Self::CompletionYear,
        Self::LateralLength,
        Self::Proppant,
        Self::Fluid,
        Self::Spacing,
    ];

    /// Columns fed to the robust outlier detector.
    pub const COMPLETION_DESIGN: [Self; 3] = [Self::Proppant, Self::Fluid, Self::Spacing];

    /// Columns reported in the final bounds summary.
    pub const SUMMARY: [Self; 4] = [
        Self::Proppant,
        Self::Fluid,
        Self::Spacing,
        Self::CompletionYear,
    ];

    /// Column name in the tabular contract
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::CompletionYear => "CompletionYear",
            Self::LateralLength => "LateralLength_FT",
            Self::Proppant => "Proppant_LBSPerFT",
            Self::Fluid => "Fluid_BBLPerFT",
            Self::Spacing => "SpacingHzAnyZoneAtDrill",
        }
    }
}

impl fmt::Display for WellFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for WellFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::NUMERIC
            .into_iter()
            .find(|f| f.column_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown feature '{s}' (expected one of: {})",
                    Self::NUMERIC.map(Self::column_name).join(", ")
                )
            })
    }
}

// ============================================================================
// Raw Rows (as retrieved)
// ============================================================================

/// One row as returned by a well data source.
///
/// Numeric columns are kept as raw cells; coercion happens in the cleaning
/// stage so that unparseable values become missing instead of failing the
/// whole retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWellRow {
    pub api10: Option<String>,
    pub api14: Option<String>,
    /// TCA id (comparison unit)
    pub group_id: Option<String>,
    pub well_status: Option<String>,
    pub operator: Option<String>,
    pub completion_year: Option<String>,
    pub lateral_length_ft: Option<String>,
    pub proppant_lbs_per_ft: Option<String>,
    pub fluid_bbl_per_ft: Option<String>,
    pub spacing_ft: Option<String>,
    pub boundary_category: Option<String>,
}

impl RawWellRow {
    /// Raw cell for one of the numeric columns
    pub fn numeric_cell(&self, feature: WellFeature) -> Option<&str> {
        match feature {
            WellFeature::CompletionYear => self.completion_year.as_deref(),
            WellFeature::LateralLength => self.lateral_length_ft.as_deref(),
            WellFeature::Proppant => self.proppant_lbs_per_ft.as_deref(),
            WellFeature::Fluid => self.fluid_bbl_per_ft.as_deref(),
            WellFeature::Spacing => self.spacing_ft.as_deref(),
        }
    }

    /// Whether the boundary category marks the well as unbound.
    ///
    /// A missing category is not unbound.
    pub fn is_unbound(&self) -> bool {
        self.boundary_category.as_deref() == Some(UNBOUND_CATEGORY)
    }
}

// ============================================================================
// Typed Records
// ============================================================================

/// A cleaned well with every analysis column present and numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellRecord {
    pub api10: String,
    pub group_id: Option<String>,
    pub well_status: Option<String>,
    pub operator: Option<String>,
    pub boundary_category: Option<String>,
    pub completion_year: i32,
    pub lateral_length_ft: f64,
    pub proppant_lbs_per_ft: f64,
    pub fluid_bbl_per_ft: f64,
    pub spacing_ft: f64,
}

impl WellRecord {
    /// Numeric value of a feature column
    pub fn value(&self, feature: WellFeature) -> f64 {
        match feature {
            WellFeature::CompletionYear => f64::from(self.completion_year),
            WellFeature::LateralLength => self.lateral_length_ft,
            WellFeature::Proppant => self.proppant_lbs_per_ft,
            WellFeature::Fluid => self.fluid_bbl_per_ft,
            WellFeature::Spacing => self.spacing_ft,
        }
    }
}

/// A well with its Mahalanobis distance attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredWell {
    pub record: WellRecord,
    pub distance: f64,
}

// ============================================================================
// Dataset
// ============================================================================

/// Ordered collection of cleaned wells.
///
/// Only ever narrowed by filtering; surviving rows are never edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellDataset {
    records: Vec<WellRecord>,
}

impl WellDataset {
    pub fn new(records: Vec<WellRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[WellRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<WellRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent completion year present
    pub fn max_year(&self) -> Option<i32> {
        self.records.iter().map(|r| r.completion_year).max()
    }

    /// Row count per completion year (ascending years)
    pub fn year_counts(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.records {
            *counts.entry(r.completion_year).or_insert(0) += 1;
        }
        counts
    }

    /// Number of rows completed in `year`
    pub fn count_in_year(&self, year: i32) -> usize {
        self.records
            .iter()
            .filter(|r| r.completion_year == year)
            .count()
    }

    /// Non-missing values of `feature` for wells completed in `year`
    pub fn values_in_year(&self, feature: WellFeature, year: i32) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.completion_year == year)
            .map(|r| r.value(feature))
            .filter(|v| v.is_finite())
            .collect()
    }

    /// All values of one feature column, in row order
    pub fn column(&self, feature: WellFeature) -> Vec<f64> {
        self.records.iter().map(|r| r.value(feature)).collect()
    }

    /// Keep rows whose completion year lies in `[min_year, max_year]`
    pub fn filter_years(self, min_year: i32, max_year: i32) -> Self {
        self.retain(|r| (min_year..=max_year).contains(&r.completion_year))
    }

    /// Keep rows matching a predicate
    pub fn retain(mut self, keep: impl FnMut(&WellRecord) -> bool) -> Self {
        self.records.retain(keep);
        self
    }
}

impl FromIterator<WellRecord> for WellDataset {
    fn from_iter<I: IntoIterator<Item = WellRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, lateral: f64) -> WellRecord {
        WellRecord {
            api10: format!("42{year}{lateral}"),
            group_id: None,
            well_status: Some(PRODUCING_STATUS.to_string()),
            operator: None,
            boundary_category: None,
            completion_year: year,
            lateral_length_ft: lateral,
            proppant_lbs_per_ft: 2000.0,
            fluid_bbl_per_ft: 40.0,
            spacing_ft: 800.0,
        }
    }

    #[test]
    fn test_feature_parses_column_names() {
        assert_eq!(
            "LateralLength_FT".parse::<WellFeature>(),
            Ok(WellFeature::LateralLength)
        );
        assert_eq!(
            "proppant_lbsperft".parse::<WellFeature>(),
            Ok(WellFeature::Proppant)
        );
        assert!("Depth".parse::<WellFeature>().is_err());
    }

    #[test]
    fn test_feature_serializes_as_column_name() {
        let json = serde_json::to_string(&WellFeature::Spacing).unwrap();
        assert_eq!(json, "\"SpacingHzAnyZoneAtDrill\"");
    }

    #[test]
    fn test_missing_boundary_is_not_unbound() {
        let mut row = RawWellRow::default();
        assert!(!row.is_unbound());
        row.boundary_category = Some("BOUNDED".to_string());
        assert!(!row.is_unbound());
        row.boundary_category = Some(UNBOUND_CATEGORY.to_string());
        assert!(row.is_unbound());
    }

    #[test]
    fn test_year_counts_and_filter() {
        let ds: WellDataset = [
            record(2018, 9000.0),
            record(2019, 9500.0),
            record(2019, 9600.0),
            record(2020, 10_000.0),
        ]
        .into_iter()
        .collect();

        let counts = ds.year_counts();
        assert_eq!(counts.get(&2019), Some(&2));
        assert_eq!(ds.max_year(), Some(2020));
        assert_eq!(ds.values_in_year(WellFeature::LateralLength, 2019), vec![9500.0, 9600.0]);

        let narrowed = ds.filter_years(2019, 2019);
        assert_eq!(narrowed.len(), 2);
        assert!(narrowed.records().iter().all(|r| r.completion_year == 2019));
    }
}

//! Well Cleaning Filter
//!
//! Turns retrieved rows into typed records. Rejects:
//! - Unbound wells (boundary category `UNBOUND`; a missing category is kept)
//! - Wells in an excluded comparison group (a missing group id is kept)
//! - Rows without a well id
//! - Rows with any analysis column missing after numeric coercion
//!
//! Coercion never fails the run: unparseable or non-finite cells and
//! non-integral years simply count as missing.

use std::collections::HashSet;
use tracing::debug;

use crate::types::{RawWellRow, WellDataset, WellFeature, WellRecord};

/// Result of cleaning
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Rows that passed every check, in retrieval order
    pub dataset: WellDataset,
    /// Rows inspected
    pub inspected: usize,
    /// Rows dropped
    pub rejected: usize,
    /// Primary reason for rejections (if any)
    pub rejection_reason: Option<String>,
}

/// Reasons for row rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    Unbound,
    ExcludedGroup,
    MissingWellId,
    MissingValue(WellFeature),
}

/// Cleans retrieved rows for the bounds pipeline
pub struct WellFilter;

impl WellFilter {
    /// Filter and coerce rows, keeping retrieval order.
    pub fn clean(rows: Vec<RawWellRow>, excluded_groups: &HashSet<String>) -> FilterResult {
        let inspected = rows.len();
        let mut records = Vec::with_capacity(inspected);

        let mut unbound_count = 0;
        let mut excluded_count = 0;
        let mut missing_id_count = 0;
        let mut missing_value_count = [0_usize; 5];

        for row in &rows {
            match Self::validate(row, excluded_groups) {
                Ok(record) => records.push(record),
                Err(RejectionReason::Unbound) => unbound_count += 1,
                Err(RejectionReason::ExcludedGroup) => excluded_count += 1,
                Err(RejectionReason::MissingWellId) => missing_id_count += 1,
                Err(RejectionReason::MissingValue(feature)) => {
                    if let Some(i) = WellFeature::NUMERIC.iter().position(|f| *f == feature) {
                        missing_value_count[i] += 1;
                    }
                }
            }
        }

        let rejected = inspected - records.len();
        let mut reasons = vec![
            (unbound_count, "Unbound wells".to_string()),
            (excluded_count, "Excluded comparison group".to_string()),
            (missing_id_count, "Missing well id".to_string()),
        ];
        for (feature, count) in WellFeature::NUMERIC.iter().zip(missing_value_count) {
            reasons.push((count, format!("Missing or non-numeric {feature}")));
        }
        let rejection_reason = reasons
            .into_iter()
            .filter(|(count, _)| *count > 0)
            .max_by_key(|(count, _)| *count)
            .map(|(count, reason)| format!("{reason} ({count} rows)"));

        debug!(
            inspected,
            kept = records.len(),
            unbound = unbound_count,
            excluded = excluded_count,
            missing_id = missing_id_count,
            missing_values = missing_value_count.iter().sum::<usize>(),
            "Cleaned well rows"
        );

        FilterResult {
            dataset: WellDataset::new(records),
            inspected,
            rejected,
            rejection_reason,
        }
    }

    /// Validate one row and build its typed record
    pub fn validate(
        row: &RawWellRow,
        excluded_groups: &HashSet<String>,
    ) -> Result<WellRecord, RejectionReason> {
        if row.is_unbound() {
            return Err(RejectionReason::Unbound);
        }
        if row
            .group_id
            .as_ref()
            .is_some_and(|id| excluded_groups.contains(id))
        {
            return Err(RejectionReason::ExcludedGroup);
        }

        let api10 = row
            .api10
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(RejectionReason::MissingWellId)?;

        let numeric = |feature: WellFeature| {
            row.numeric_cell(feature)
                .and_then(coerce_numeric)
                .ok_or(RejectionReason::MissingValue(feature))
        };

        let completion_year = row
            .numeric_cell(WellFeature::CompletionYear)
            .and_then(coerce_year)
            .ok_or(RejectionReason::MissingValue(WellFeature::CompletionYear))?;

        Ok(WellRecord {
            api10: api10.to_string(),
            group_id: row.group_id.clone(),
            well_status: row.well_status.clone(),
            operator: row.operator.clone(),
            boundary_category: row.boundary_category.clone(),
            completion_year,
            lateral_length_ft: numeric(WellFeature::LateralLength)?,
            proppant_lbs_per_ft: numeric(WellFeature::Proppant)?,
            fluid_bbl_per_ft: numeric(WellFeature::Fluid)?,
            spacing_ft: numeric(WellFeature::Spacing)?,
        })
    }
}

/// Parse a numeric cell; unparseable and non-finite values are missing.
pub fn coerce_numeric(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a completion year; fractional years are missing.
pub fn coerce_year(cell: &str) -> Option<i32> {
    coerce_numeric(cell)
        .filter(|v| v.fract() == 0.0 && *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX))
        .map(|v| v as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_valid_row() -> RawWellRow {
        RawWellRow {
            api10: Some("4238912345".to_string()),
            api14: Some("42389123450000".to_string()),
            group_id: Some("TCA-7".to_string()),
            well_status: Some("PRODUCING".to_string()),
            operator: Some("Example Energy".to_string()),
            completion_year: Some("2019".to_string()),
            lateral_length_ft: Some("10250".to_string()),
            proppant_lbs_per_ft: Some("2100.5".to_string()),
            fluid_bbl_per_ft: Some("42".to_string()),
            spacing_ft: Some("660".to_string()),
            boundary_category: Some("BOUNDED".to_string()),
        }
    }

    #[test]
    fn test_valid_row_is_coerced() {
        let record = WellFilter::validate(&make_valid_row(), &HashSet::new()).unwrap();
        assert_eq!(record.completion_year, 2019);
        assert_eq!(record.proppant_lbs_per_ft, 2100.5);
        assert_eq!(record.api10, "4238912345");
    }

    #[test]
    fn test_unbound_rejected_missing_category_kept() {
        let mut row = make_valid_row();
        row.boundary_category = Some("UNBOUND".to_string());
        assert_eq!(
            WellFilter::validate(&row, &HashSet::new()),
            Err(RejectionReason::Unbound)
        );

        row.boundary_category = None;
        assert!(WellFilter::validate(&row, &HashSet::new()).is_ok());
    }

    #[test]
    fn test_excluded_group() {
        let excluded: HashSet<String> = ["TCA-7".to_string()].into();
        assert_eq!(
            WellFilter::validate(&make_valid_row(), &excluded),
            Err(RejectionReason::ExcludedGroup)
        );

        let mut row = make_valid_row();
        row.group_id = None;
        assert!(WellFilter::validate(&row, &excluded).is_ok());
    }

    #[test]
    fn test_non_numeric_lateral_is_missing() {
        let mut row = make_valid_row();
        row.lateral_length_ft = Some("n/a".to_string());
        assert_eq!(
            WellFilter::validate(&row, &HashSet::new()),
            Err(RejectionReason::MissingValue(WellFeature::LateralLength))
        );
    }

    #[test]
    fn test_year_coercion() {
        assert_eq!(coerce_year("2018"), Some(2018));
        assert_eq!(coerce_year("2018.0"), Some(2018));
        assert_eq!(coerce_year("2018.5"), None);
        assert_eq!(coerce_year("soon"), None);
        assert_eq!(coerce_numeric("inf"), None);
        assert_eq!(coerce_numeric(" 12.5 "), Some(12.5));
    }

    #[test]
    fn test_clean_reports_primary_reason() {
        let mut rows = vec![make_valid_row(); 3];
        for row in rows.iter_mut().take(2) {
            row.spacing_ft = None;
        }
        let mut unbound = make_valid_row();
        unbound.boundary_category = Some("UNBOUND".to_string());
        rows.push(unbound);

        let result = WellFilter::clean(rows, &HashSet::new());
        assert_eq!(result.inspected, 4);
        assert_eq!(result.rejected, 3);
        assert_eq!(result.dataset.len(), 1);
        let reason = result.rejection_reason.unwrap();
        assert!(reason.contains("SpacingHzAnyZoneAtDrill"), "{reason}");
        assert!(reason.contains("2 rows"));
    }

    #[test]
    fn test_clean_without_rejections() {
        let result = WellFilter::clean(vec![make_valid_row()], &HashSet::new());
        assert_eq!(result.rejected, 0);
        assert!(result.rejection_reason.is_none());
    }
}

//! Bounds Pipeline Orchestrator
//!
//! Runs one basin / flow-unit request end to end:
//! 1. Retrieves producing analog wells from the injected source
//! 2. Cleans them (unbound, excluded groups, numeric coercion, missing values)
//! 3. Picks the reference year and walks back over similar years
//! 4. Bounds the lateral length
//! 5. Scores completion designs with robust Mahalanobis distances
//! 6. Prunes with the adaptive log-normal threshold
//! 7. Summarises the survivors as per-feature min/max
//!
//! Every guard that runs out of wells returns
//! [`PipelineOutcome::InsufficientData`] naming the stage.

use tracing::{debug, info, warn};

use crate::config::BoundsConfig;
use crate::source::{WellDataSource, WellQuery};
use crate::types::{
    BoundsRequest, FeatureBoundsSummary, InsufficientStage, PipelineOutcome, ScoredWell,
    WellDataset, WellFeature,
};

use super::{
    descriptive::{observation_matrix, quantile},
    outlier_detector::RobustOutlierDetector,
    threshold_fitter::AdaptiveThresholdFitter,
    well_filter::WellFilter,
    year_window::YearWindowSelector,
    BoundsError,
};

/// Orchestrates the full bounds pipeline
pub struct BoundsAnalyzer;

impl BoundsAnalyzer {
    /// Fetch, clean and analyse the wells for one request.
    pub fn run(
        source: &dyn WellDataSource,
        request: &BoundsRequest,
        config: &BoundsConfig,
    ) -> Result<PipelineOutcome, BoundsError> {
        Self::validate_request(request)?;

        let query = WellQuery::new(&request.basin, &request.flow_unit, request.min_completion_year);
        info!(
            source = source.source_name(),
            basin = %query.basin,
            flow_unit = %query.flow_unit,
            min_completion_year = query.min_completion_year,
            "Fetching analog wells"
        );
        let rows = source.fetch(&query)?;
        info!(rows = rows.len(), "Retrieved well rows");

        let cleaned = WellFilter::clean(rows, &request.excluded_group_ids);
        if let Some(reason) = &cleaned.rejection_reason {
            info!(
                rejected = cleaned.rejected,
                inspected = cleaned.inspected,
                primary = %reason,
                "Dropped rows during cleaning"
            );
        }

        Self::analyze(cleaned.dataset, request, config)
    }

    /// Analyse an already-cleaned dataset.
    pub fn analyze(
        dataset: WellDataset,
        request: &BoundsRequest,
        config: &BoundsConfig,
    ) -> Result<PipelineOutcome, BoundsError> {
        let min_rows = config.guards.min_window_rows;

        // Step 1: reference year
        let Some(max_year) = dataset.max_year() else {
            warn!("No wells left after cleaning");
            return Ok(PipelineOutcome::insufficient(InsufficientStage::Cleaning, 0, min_rows));
        };

        let counts: Vec<f64> = dataset.year_counts().values().map(|&c| c as f64).collect();
        let count_threshold = quantile(&counts, config.year_window.count_quantile).unwrap_or(0.0);
        let start_year = if dataset.count_in_year(max_year) as f64 >= count_threshold {
            max_year
        } else {
            max_year - 1
        };
        debug!(
            max_year,
            start_year,
            count_threshold,
            years = counts.len(),
            "Reference year chosen"
        );

        // Step 2: year window
        let selector = YearWindowSelector::new(config.year_window.similarity_p_value);
        let min_year = selector.select_years(
            &dataset,
            request.year_window_feature,
            start_year,
            count_threshold,
            config.year_window.earliest_year,
        );
        let windowed = dataset.filter_years(min_year, start_year);
        info!(min_year, start_year, rows = windowed.len(), "Year window selected");

        if windowed.len() < min_rows {
            warn!(rows = windowed.len(), required = min_rows, "Too few wells in year window");
            return Ok(PipelineOutcome::insufficient(
                InsufficientStage::YearWindow,
                windowed.len(),
                min_rows,
            ));
        }

        // Step 3: lateral length bounds
        let laterals = windowed.column(WellFeature::LateralLength);
        let upper_quantile = quantile(&laterals, config.lateral.upper_quantile).unwrap_or(0.0);
        let min_ft = config.lateral.min_ft;
        let max_ft = config.lateral.max_floor_ft.max(upper_quantile);
        let bounded = windowed.retain(|r| (min_ft..=max_ft).contains(&r.lateral_length_ft));
        debug!(min_ft, max_ft, rows = bounded.len(), "Lateral length bounds applied");

        let features = WellFeature::COMPLETION_DESIGN;
        if bounded.len() <= features.len() {
            warn!(rows = bounded.len(), "Too few wells inside lateral bounds");
            return Ok(PipelineOutcome::insufficient(
                InsufficientStage::LateralBounds,
                bounded.len(),
                features.len() + 1,
            ));
        }

        // Step 4: robust distances
        let rows: Vec<Vec<f64>> = bounded
            .records()
            .iter()
            .map(|r| features.iter().map(|&f| r.value(f)).collect())
            .collect();
        let matrix = observation_matrix(&rows, features.len());
        let flags = RobustOutlierDetector::detect(&matrix, &config.outliers)?;
        info!(
            rows = matrix.nrows(),
            gross_outliers = flags.outlier_count(),
            critical_distance = flags.critical_distance,
            "Robust distances computed"
        );

        let scored: Vec<ScoredWell> = bounded
            .into_records()
            .into_iter()
            .zip(flags.distances)
            .map(|(record, distance)| ScoredWell { record, distance })
            .collect();

        // Step 5: adaptive threshold
        let (survivors, fit) = AdaptiveThresholdFitter::fit_and_prune(scored, &config.threshold)?;
        info!(
            survivors = survivors.len(),
            r_squared = fit.r_squared,
            percentile = fit.percentile,
            "Adaptive threshold applied"
        );

        // Step 6: summary
        match FeatureBoundsSummary::from_records(survivors.iter().map(|w| &w.record)) {
            Some(bounds) => Ok(PipelineOutcome::Bounds {
                bounds,
                survivors: survivors.len(),
                threshold: fit,
            }),
            None => {
                warn!("Adaptive threshold removed every well");
                Ok(PipelineOutcome::insufficient(InsufficientStage::ThresholdPruning, 0, 1))
            }
        }
    }

    fn validate_request(request: &BoundsRequest) -> Result<(), BoundsError> {
        if request.basin.trim().is_empty() {
            return Err(BoundsError::InvalidRequest("basin is empty".to_string()));
        }
        if request.flow_unit.trim().is_empty() {
            return Err(BoundsError::InvalidRequest("flow unit is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticWellSource;
    use crate::types::{RawWellRow, WellRecord};

    fn record(year: i32, lateral: f64, i: usize) -> WellRecord {
        let wobble = (i % 7) as f64 - 3.0;
        WellRecord {
            api10: format!("42{year}{i:04}"),
            group_id: None,
            well_status: Some("PRODUCING".to_string()),
            operator: None,
            boundary_category: None,
            completion_year: year,
            lateral_length_ft: lateral,
            proppant_lbs_per_ft: 2000.0 + wobble * 40.0 + (i % 3) as f64 * 15.0,
            fluid_bbl_per_ft: 40.0 + wobble + (i % 5) as f64 * 0.7,
            spacing_ft: 700.0 + ((i * 37) % 11) as f64 * 8.0,
        }
    }

    #[test]
    fn test_empty_dataset_is_insufficient() {
        let outcome = BoundsAnalyzer::analyze(
            WellDataset::default(),
            &BoundsRequest::new("Permian", "WCA"),
            &BoundsConfig::default(),
        )
        .unwrap();
        assert_eq!(
            outcome,
            PipelineOutcome::insufficient(InsufficientStage::Cleaning, 0, 40)
        );
    }

    #[test]
    fn test_short_lateral_wells_are_dropped_before_scoring() {
        // 45 wells, only 2 longer than 3500 ft
        let records: Vec<WellRecord> = (0..45)
            .map(|i| record(2020, if i < 2 { 9000.0 } else { 3000.0 }, i))
            .collect();
        let outcome = BoundsAnalyzer::analyze(
            WellDataset::new(records),
            &BoundsRequest::new("Permian", "WCA").with_min_completion_year(2020),
            &BoundsConfig::default(),
        )
        .unwrap();
        assert_eq!(
            outcome,
            PipelineOutcome::insufficient(InsufficientStage::LateralBounds, 2, 4)
        );
    }

    #[test]
    fn test_singular_covariance_is_an_error() {
        let records: Vec<WellRecord> = (0..45)
            .map(|i| WellRecord {
                spacing_ft: 660.0,
                ..record(2020, 9000.0, i)
            })
            .collect();
        let result = BoundsAnalyzer::analyze(
            WellDataset::new(records),
            &BoundsRequest::new("Permian", "WCA"),
            &BoundsConfig::default(),
        );
        assert!(
            matches!(result, Err(BoundsError::SingularMatrix(_))),
            "expected singular matrix, got {result:?}"
        );
    }

    #[test]
    fn test_walk_stops_at_configured_earliest_year() {
        let records: Vec<WellRecord> = (2012..=2020)
            .flat_map(|year| {
                (0..10).map(move |i| record(year, 9000.0 + (i % 5) as f64 * 100.0, i))
            })
            .collect();
        let outcome = BoundsAnalyzer::analyze(
            WellDataset::new(records),
            &BoundsRequest::new("Permian", "WCA").with_min_completion_year(2012),
            &BoundsConfig::default(),
        )
        .unwrap();
        let years = outcome.bounds().unwrap().get(WellFeature::CompletionYear).unwrap();
        assert!(years.min >= 2016.0, "window reached {}", years.min);
    }

    #[test]
    fn test_blank_basin_rejected() {
        let source = StaticWellSource::default();
        let result = BoundsAnalyzer::run(
            &source,
            &BoundsRequest::new(" ", "WCA"),
            &BoundsConfig::default(),
        );
        assert!(matches!(result, Err(BoundsError::InvalidRequest(_))));
    }

    #[test]
    fn test_run_with_no_matching_rows() {
        let row = RawWellRow {
            api10: Some("4200000001".to_string()),
            well_status: Some("PRODUCING".to_string()),
            completion_year: Some("2019".to_string()),
            ..RawWellRow::default()
        };
        let source = StaticWellSource::single_unit("Permian", "WCA", vec![row]);
        let outcome = BoundsAnalyzer::run(
            &source,
            &BoundsRequest::new("Permian", "OTHER"),
            &BoundsConfig::default(),
        )
        .unwrap();
        assert!(outcome.is_insufficient());
    }
}

//! Year Window Selection
//!
//! Walks backward from the reference completion year, accepting each earlier
//! year whose feature distribution is statistically similar to the
//! reference year (t-test p-value strictly above the similarity level). The
//! walk stops at the first dissimilar year or the first year with no data.
//! If the accepted years still hold fewer wells than the count threshold,
//! earlier years are added unconditionally until the threshold is met or
//! the earliest year is reached.

use std::collections::BTreeSet;
use tracing::debug;

use crate::types::{WellDataset, WellFeature};

use super::similarity::TwoSampleTTest;

/// Accepted completion years for one flow unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearWindow {
    pub start_year: i32,
    pub accepted_years: BTreeSet<i32>,
    /// Years added by the count backstop rather than by similarity
    pub forced_years: BTreeSet<i32>,
}

impl YearWindow {
    /// Earliest accepted year
    pub fn min_year(&self) -> i32 {
        self.accepted_years
            .first()
            .copied()
            .unwrap_or(self.start_year)
    }
}

/// Sequential year-similarity selector
#[derive(Debug, Clone, Copy)]
pub struct YearWindowSelector {
    /// Candidate is similar when `p > similarity_level`
    pub similarity_level: f64,
}

impl YearWindowSelector {
    pub const fn new(similarity_level: f64) -> Self {
        Self { similarity_level }
    }

    /// Earliest year of the comparable window ending at `start_year`.
    pub fn select_years(
        &self,
        dataset: &WellDataset,
        feature: WellFeature,
        start_year: i32,
        min_count_threshold: f64,
        earliest_year: i32,
    ) -> i32 {
        self.select_window(dataset, feature, start_year, min_count_threshold, earliest_year)
            .min_year()
    }

    /// Full window with the accepted and forced years.
    pub fn select_window(
        &self,
        dataset: &WellDataset,
        feature: WellFeature,
        start_year: i32,
        min_count_threshold: f64,
        earliest_year: i32,
    ) -> YearWindow {
        let mut accepted = BTreeSet::from([start_year]);
        let mut forced = BTreeSet::new();
        let reference = dataset.values_in_year(feature, start_year);

        let mut cursor = start_year - 1;
        while cursor >= earliest_year {
            let candidate = dataset.values_in_year(feature, cursor);
            if candidate.is_empty() || reference.is_empty() {
                debug!(year = cursor, "No data for candidate or reference year, stopping walk");
                break;
            }

            let result = TwoSampleTTest::run(&reference, &candidate);
            let p_value = result.map_or(f64::NAN, |r| r.p_value);
            if p_value > self.similarity_level {
                debug!(year = cursor, p_value, "Year similar to reference");
                accepted.insert(cursor);
                cursor -= 1;
            } else {
                debug!(year = cursor, p_value, "Year differs from reference, stopping walk");
                break;
            }
        }

        let mut count = Self::count_rows(dataset, &accepted);
        while (count as f64) < min_count_threshold && cursor >= earliest_year {
            accepted.insert(cursor);
            forced.insert(cursor);
            cursor -= 1;
            count = Self::count_rows(dataset, &accepted);
        }

        if !forced.is_empty() {
            debug!(
                forced = ?forced,
                rows = count,
                threshold = min_count_threshold,
                "Extended year window to reach count threshold"
            );
        }

        YearWindow {
            start_year,
            accepted_years: accepted,
            forced_years: forced,
        }
    }

    fn count_rows(dataset: &WellDataset, years: &BTreeSet<i32>) -> usize {
        years.iter().map(|&y| dataset.count_in_year(y)).sum()
    }
}

//! Adaptive Distance Threshold
//!
//! Fits a normal distribution to the log Mahalanobis distances, scores the
//! fit against a density histogram with R², and turns that score into a
//! cutoff percentile: a well-behaved (high R²) distribution is trimmed
//! gently, a poorly fitting one harder.
//!
//! ```text
//! R² <= r2_floor    -> min_cutoff_percentile
//! R² >= r2_ceiling  -> max_cutoff_percentile
//! otherwise         -> linear between the two anchor points
//! ```
//!
//! Wells whose log-distance is strictly below the inverse CDF of the fitted
//! normal at that percentile survive.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use tracing::debug;

use super::descriptive::mean;
use super::BoundsError;
use crate::config::ThresholdConfig;
use crate::types::{ScoredWell, ThresholdFit};

/// Density histogram with equal-width bins
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub densities: Vec<f64>,
}

impl Histogram {
    /// Equal-width bins over `[min, max]`, last bin closed.
    ///
    /// A zero-width range is widened to `[v - 0.5, v + 0.5]`. Densities
    /// integrate to one over the bins.
    pub fn density(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let (mut lo, mut hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if values.is_empty() {
            (lo, hi) = (0.0, 1.0);
        } else if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

        let mut counts = vec![0_usize; bins];
        for &v in values {
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        let total = values.len().max(1) as f64;
        let densities = counts.iter().map(|&c| c as f64 / (total * width)).collect();
        Self { edges, densities }
    }

    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }
}

/// Coefficient of determination of `predicted` against `observed`.
///
/// A constant `observed` scores 1.0 on a perfect prediction and 0.0 otherwise.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    let Some(obs_mean) = mean(observed) else {
        return 0.0;
    };
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - obs_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Log-normal distance threshold
pub struct AdaptiveThresholdFitter;

impl AdaptiveThresholdFitter {
    /// `clamp(n / rows_per_bin, min_bins, max_bins)`
    pub fn bin_count(rows: usize, config: &ThresholdConfig) -> usize {
        (rows / config.rows_per_bin.max(1)).clamp(config.min_bins, config.max_bins)
    }

    /// Cutoff percentile for a fit quality score
    pub fn final_percentile(r_squared: f64, config: &ThresholdConfig) -> f64 {
        let (floor, ceiling) = (config.r2_floor, config.r2_ceiling);
        let (low, high) = (config.min_cutoff_percentile, config.max_cutoff_percentile);

        if r_squared.is_nan() || r_squared <= floor {
            low
        } else if r_squared >= ceiling {
            high
        } else {
            low + (r_squared - floor) * (high - low) / (ceiling - floor)
        }
    }

    /// Fit the log-distance distribution.
    pub fn fit(distances: &[f64], config: &ThresholdConfig) -> Result<ThresholdFit, BoundsError> {
        if distances.is_empty() {
            return Err(BoundsError::DegenerateDistances("no distances to fit".to_string()));
        }
        let logs = Self::log_distances(distances)?;

        let bins = Self::bin_count(logs.len(), config);
        let histogram = Histogram::density(&logs, bins);

        let n = logs.len() as f64;
        let (mu, sigma) = if logs.iter().all(|&l| l == logs[0]) {
            (logs[0], 0.0)
        } else {
            let mu = logs.iter().sum::<f64>() / n;
            (mu, (logs.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / n).sqrt())
        };

        let (predicted, log_threshold, percentile, r2) = match Normal::new(mu, sigma) {
            Ok(fitted) => {
                let predicted: Vec<f64> =
                    histogram.centers().iter().map(|&c| fitted.pdf(c)).collect();
                let r2 = r_squared(&histogram.densities, &predicted);
                let percentile = Self::final_percentile(r2, config);
                (predicted, fitted.inverse_cdf(percentile), percentile, r2)
            }
            // Zero spread: every log-distance equals mu, none is strictly below it
            Err(_) => {
                let predicted = vec![0.0; histogram.densities.len()];
                let r2 = r_squared(&histogram.densities, &predicted);
                (predicted, mu, Self::final_percentile(r2, config), r2)
            }
        };

        let sse = histogram
            .densities
            .iter()
            .zip(&predicted)
            .map(|(o, p)| (o - p).powi(2))
            .sum();

        Ok(ThresholdFit {
            bins,
            mu,
            sigma,
            r_squared: r2,
            sse,
            percentile,
            log_threshold,
        })
    }

    /// Fit on the wells' distances and keep those below the threshold.
    pub fn fit_and_prune(
        wells: Vec<ScoredWell>,
        config: &ThresholdConfig,
    ) -> Result<(Vec<ScoredWell>, ThresholdFit), BoundsError> {
        let distances: Vec<f64> = wells.iter().map(|w| w.distance).collect();
        let fit = Self::fit(&distances, config)?;

        let before = wells.len();
        let kept: Vec<ScoredWell> = wells
            .into_iter()
            .filter(|w| w.distance.ln() < fit.log_threshold)
            .collect();

        debug!(
            bins = fit.bins,
            mu = fit.mu,
            sigma = fit.sigma,
            r_squared = fit.r_squared,
            sse = fit.sse,
            percentile = fit.percentile,
            log_threshold = fit.log_threshold,
            before,
            after = kept.len(),
            "Adaptive threshold applied"
        );

        Ok((kept, fit))
    }

    fn log_distances(distances: &[f64]) -> Result<Vec<f64>, BoundsError> {
        distances
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                let l = d.ln();
                if l.is_finite() {
                    Ok(l)
                } else {
                    Err(BoundsError::DegenerateDistances(format!(
                        "row {i} has distance {d}, log is not finite"
                    )))
                }
            })
            .collect()
    }
}

//! Robust Mahalanobis Outlier Detection
//!
//! The robust location and covariance are not estimated on the wells
//! themselves. Instead a reference sample is drawn from a multivariate
//! normal with the wells' sample mean and covariance, and MinCovDet is
//! fitted to that sample. Each well is then scored by its Mahalanobis
//! distance to the robust centre and flagged when the distance exceeds
//! `sqrt(chi2_p.ppf(1 - alpha))`.
//!
//! Both random streams (reference sample and FastMCD subsets) are seeded
//! from the configured seed, so identical input gives identical distances.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeSet;
use tracing::debug;

use super::descriptive::{column_means, sample_covariance, squared_mahalanobis};
use super::mcd::{McdOptions, MinCovDet};
use super::BoundsError;
use crate::config::{defaults, OutlierConfig};
use crate::types::OutlierFlagSet;

/// Robust outlier detector over an `n x p` feature matrix
pub struct RobustOutlierDetector;

impl RobustOutlierDetector {
    /// Score and flag every row of `data`.
    pub fn detect(
        data: &DMatrix<f64>,
        config: &OutlierConfig,
    ) -> Result<OutlierFlagSet, BoundsError> {
        let (n, p) = data.shape();
        if n <= p {
            return Err(BoundsError::InvalidRequest(format!(
                "outlier detection needs more than {p} rows, got {n}"
            )));
        }

        let mean = column_means(data);
        let covariance = sample_covariance(data);

        let mut sample_rng = StdRng::seed_from_u64(config.seed);
        let reference = Self::reference_sample(
            &mean,
            &covariance,
            config.reference_sample_size,
            &mut sample_rng,
        );

        let options = McdOptions {
            support_fraction: config.support_fraction,
            trials: config.mcd_trials,
            best_candidates: config.mcd_best_candidates,
            initial_c_steps: defaults::MCD_INITIAL_C_STEPS,
            max_c_steps: config.mcd_max_c_steps,
        };
        let mut mcd_rng = StdRng::seed_from_u64(config.seed);
        let robust = MinCovDet::fit(&reference, &options, &mut mcd_rng)?;

        let precision = robust.covariance.clone().try_inverse().ok_or_else(|| {
            BoundsError::SingularMatrix("robust covariance is not invertible".to_string())
        })?;

        let distances: Vec<f64> = squared_mahalanobis(data, &robust.location, &precision)
            .into_iter()
            .map(f64::sqrt)
            .collect();

        let critical_distance = Self::critical_distance(p, config.alpha)?;
        let outlier_indices: BTreeSet<usize> = distances
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > critical_distance)
            .map(|(i, _)| i)
            .collect();

        debug!(
            rows = n,
            features = p,
            reference_rows = reference.nrows(),
            mcd_support = robust.support_size,
            critical_distance,
            outliers = outlier_indices.len(),
            "Robust Mahalanobis distances computed"
        );

        Ok(OutlierFlagSet {
            outlier_indices,
            distances,
            critical_distance,
        })
    }

    /// `sqrt(chi2_p.ppf(1 - alpha))`
    pub fn critical_distance(features: usize, alpha: f64) -> Result<f64, BoundsError> {
        let chi2 = ChiSquared::new(features as f64).map_err(|e| {
            BoundsError::InvalidRequest(format!("chi-squared with {features} dof: {e}"))
        })?;
        Ok(chi2.inverse_cdf(1.0 - alpha).sqrt())
    }

    /// Draw `size` rows from N(mean, covariance).
    ///
    /// Uses the symmetric square root `V diag(sqrt(max(lambda, 0)))` so
    /// positive semi-definite covariances are accepted.
    pub fn reference_sample(
        mean: &DVector<f64>,
        covariance: &DMatrix<f64>,
        size: usize,
        rng: &mut StdRng,
    ) -> DMatrix<f64> {
        let p = mean.len();
        let eigen = SymmetricEigen::new(covariance.clone());
        let scales = eigen.eigenvalues.map(|l| l.max(0.0).sqrt());
        let factor = &eigen.eigenvectors * DMatrix::from_diagonal(&scales);

        let mut sample = DMatrix::zeros(size, p);
        for i in 0..size {
            let z: DVector<f64> = DVector::from_fn(p, |_, _| StandardNormal.sample(&mut *rng));
            let x = mean + &factor * z;
            sample.set_row(i, &x.transpose());
        }
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_distr::Normal;

    /// Three loosely correlated completion-design columns
    fn design_matrix(n: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let proppant = Normal::new(2000.0, 150.0).unwrap();
        let fluid = Normal::new(45.0, 4.0).unwrap();
        let spacing = Normal::new(700.0, 60.0).unwrap();

        let mut values = Vec::with_capacity(n * 3);
        for _ in 0..n {
            let prop = proppant.sample(&mut rng);
            values.push(prop);
            values.push(fluid.sample(&mut rng) + (prop - 2000.0) * 0.01);
            values.push(spacing.sample(&mut rng));
        }
        DMatrix::from_row_slice(n, 3, &values)
    }

    #[test]
    fn test_critical_distance() {
        // chi2(3).ppf(0.9) = 6.2514
        let c = RobustOutlierDetector::critical_distance(3, 0.1).unwrap();
        assert!((c - 6.2514_f64.sqrt()).abs() < 1e-3, "c = {c}");
    }

    #[test]
    fn test_reference_sample_matches_moments() {
        let mean = DVector::from_vec(vec![1.0, -2.0]);
        let cov = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 2.0]);
        let mut rng = StdRng::seed_from_u64(0);
        let sample = RobustOutlierDetector::reference_sample(&mean, &cov, 20_000, &mut rng);

        let m = column_means(&sample);
        let c = sample_covariance(&sample);
        assert!((m[0] - 1.0).abs() < 0.1 && (m[1] + 2.0).abs() < 0.1, "mean {m}");
        assert!((c[(0, 0)] - 4.0).abs() < 0.2, "cov {c}");
        assert!((c[(0, 1)] - 1.0).abs() < 0.1, "cov {c}");
    }

    #[test]
    fn test_reference_sample_accepts_degenerate_covariance() {
        let mean = DVector::from_vec(vec![5.0, 5.0]);
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let mut rng = StdRng::seed_from_u64(0);
        let sample = RobustOutlierDetector::reference_sample(&mean, &cov, 50, &mut rng);
        assert!(sample.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_detection_is_deterministic() {
        let data = design_matrix(60, 11);
        let config = OutlierConfig::default();
        let a = RobustOutlierDetector::detect(&data, &config).unwrap();
        let b = RobustOutlierDetector::detect(&data, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.distances.len(), 60);
    }

    #[test]
    fn test_planted_outlier_flagged() {
        let mut data = design_matrix(80, 5);
        data.set_row(0, &nalgebra::RowDVector::from_vec(vec![6000.0, 140.0, 2500.0]));

        let flags = RobustOutlierDetector::detect(&data, &OutlierConfig::default()).unwrap();
        assert!(flags.is_outlier(0));
        assert!(flags.distances[0] > flags.critical_distance);
    }

    #[test]
    fn test_constant_spacing_is_singular() {
        let mut data = design_matrix(60, 11);
        data.column_mut(2).fill(660.0);

        let result = RobustOutlierDetector::detect(&data, &OutlierConfig::default());
        assert!(
            matches!(result, Err(BoundsError::SingularMatrix(_))),
            "expected singular matrix, got {result:?}"
        );
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let data = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0]);
        let result = RobustOutlierDetector::detect(&data, &OutlierConfig::default());
        assert!(matches!(result, Err(BoundsError::InvalidRequest(_))));
    }
}

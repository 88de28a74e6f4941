//! Minimum Covariance Determinant (FastMCD)
//!
//! Robust location/scatter estimate from the `h`-subset of observations whose
//! covariance has the smallest determinant. The search follows the
//! Rousseeuw & Van Driessen FastMCD scheme:
//!
//! 1. Draw random `h`-subsets and run a few concentration steps (C-steps)
//!    on each.
//! 2. Keep the lowest-determinant candidates and iterate their C-steps to
//!    convergence.
//! 3. Take the overall minimum as the raw estimate, rescale it for
//!    consistency at the normal model, then reweight by dropping points that
//!    are far out under the chi-squared 97.5% quantile.
//!
//! A C-step never increases the determinant; the iteration stops when the
//! determinant stalls, rises, or collapses to zero (exact fit).

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::index;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use thiserror::Error;

use super::descriptive::{
    column_means, log_determinant, median, ml_covariance, select_rows, squared_mahalanobis,
};

/// Reweighting keeps points with squared distance below this chi-squared quantile
const REWEIGHT_QUANTILE: f64 = 0.975;

#[derive(Debug, Error)]
pub enum CovarianceError {
    #[error("Need at least {required} observations for {features} features, got {available}")]
    TooFewObservations {
        available: usize,
        required: usize,
        features: usize,
    },

    #[error("Covariance matrix is singular: {0}")]
    Singular(String),

    #[error("Observations contain non-finite values")]
    NonFinite,
}

/// Search parameters for FastMCD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McdOptions {
    /// Fraction of observations in the support; `None` uses `(n + p + 1) / 2`
    pub support_fraction: Option<f64>,
    /// Random starting subsets
    pub trials: usize,
    /// Candidates refined to convergence
    pub best_candidates: usize,
    /// C-steps per random start before selection
    pub initial_c_steps: usize,
    /// Upper bound on refinement C-steps
    pub max_c_steps: usize,
}

impl Default for McdOptions {
    fn default() -> Self {
        use crate::config::defaults;
        Self {
            support_fraction: None,
            trials: defaults::MCD_TRIALS,
            best_candidates: defaults::MCD_BEST_CANDIDATES,
            initial_c_steps: defaults::MCD_INITIAL_C_STEPS,
            max_c_steps: defaults::MCD_MAX_C_STEPS,
        }
    }
}

/// Fitted robust estimate
#[derive(Debug, Clone)]
pub struct McdEstimate {
    /// Reweighted location
    pub location: DVector<f64>,
    /// Reweighted covariance
    pub covariance: DMatrix<f64>,
    /// Location of the best `h`-subset
    pub raw_location: DVector<f64>,
    /// Consistency-corrected covariance of the best `h`-subset
    pub raw_covariance: DMatrix<f64>,
    /// Observations kept by reweighting
    pub support: Vec<bool>,
    /// Size of the raw `h`-subset
    pub support_size: usize,
}

/// One C-step trajectory's end state
#[derive(Debug, Clone)]
struct Candidate {
    location: DVector<f64>,
    covariance: DMatrix<f64>,
    log_det: f64,
}

/// FastMCD estimator
pub struct MinCovDet;

impl MinCovDet {
    /// Support size for `n` observations of `p` features
    pub fn support_size(n: usize, p: usize, support_fraction: Option<f64>) -> usize {
        let h = match support_fraction {
            Some(frac) => (frac * n as f64).ceil() as usize,
            None => (0.5 * (n + p + 1) as f64).ceil() as usize,
        };
        h.clamp((p + 1).min(n), n)
    }

    /// Fit on an `n x p` observation matrix.
    pub fn fit(
        data: &DMatrix<f64>,
        options: &McdOptions,
        rng: &mut StdRng,
    ) -> Result<McdEstimate, CovarianceError> {
        let (n, p) = data.shape();
        if n <= p || p == 0 {
            return Err(CovarianceError::TooFewObservations {
                available: n,
                required: p + 1,
                features: p,
            });
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(CovarianceError::NonFinite);
        }

        let h = Self::support_size(n, p, options.support_fraction);

        // Stage 1: short trajectories from random subsets
        let mut starts: Vec<Candidate> = (0..options.trials.max(1))
            .map(|_| {
                let subset = index::sample(&mut *rng, n, h).into_vec();
                let start = Self::candidate_from_support(data, &subset);
                Self::c_steps(data, h, start, options.initial_c_steps)
            })
            .collect();
        starts.sort_by(|a, b| a.log_det.total_cmp(&b.log_det));
        starts.truncate(options.best_candidates.max(1));

        // Stage 2: refine the best to convergence
        let best = starts
            .into_iter()
            .map(|c| {
                let first = Self::concentrate(data, h, &c.location, &c.covariance);
                Self::c_steps(data, h, first, options.max_c_steps)
            })
            .min_by(|a, b| a.log_det.total_cmp(&b.log_det))
            .ok_or_else(|| CovarianceError::Singular("no candidate subsets".to_string()))?;

        Self::finish(data, h, best)
    }

    /// Consistency correction and reweighting of the best raw candidate.
    fn finish(
        data: &DMatrix<f64>,
        h: usize,
        raw: Candidate,
    ) -> Result<McdEstimate, CovarianceError> {
        let (n, p) = data.shape();
        let chi2 =
            ChiSquared::new(p as f64).map_err(|e| CovarianceError::Singular(e.to_string()))?;

        if h < n && raw.covariance.iter().all(|v| v.abs() < 1e-12) {
            return Err(CovarianceError::Singular(
                "raw covariance is zero; more than h observations are identical".to_string(),
            ));
        }

        let raw_precision = Self::pseudo_inverse(&raw.covariance)?;
        let raw_d2 = squared_mahalanobis(data, &raw.location, &raw_precision);

        let median_d2 = median(&raw_d2).unwrap_or(0.0);
        let correction = median_d2 / chi2.inverse_cdf(0.5);
        if !(correction.is_finite() && correction > 0.0) {
            return Err(CovarianceError::Singular(format!(
                "consistency correction is {correction}"
            )));
        }
        let raw_covariance = &raw.covariance * correction;
        let corrected_d2: Vec<f64> = raw_d2.iter().map(|d| d / correction).collect();

        let cutoff = chi2.inverse_cdf(REWEIGHT_QUANTILE);
        let support: Vec<bool> = corrected_d2.iter().map(|&d| d < cutoff).collect();
        let kept: Vec<usize> = (0..n).filter(|&i| support[i]).collect();
        if kept.len() <= p {
            return Err(CovarianceError::TooFewObservations {
                available: kept.len(),
                required: p + 1,
                features: p,
            });
        }

        let subset = select_rows(data, &kept);
        let location = column_means(&subset);
        let covariance = ml_covariance(&subset, &location);

        Ok(McdEstimate {
            location,
            covariance,
            raw_location: raw.location,
            raw_covariance,
            support,
            support_size: h,
        })
    }

    fn candidate_from_support(data: &DMatrix<f64>, support: &[usize]) -> Candidate {
        let subset = select_rows(data, support);
        let location = column_means(&subset);
        let covariance = ml_covariance(&subset, &location);
        let log_det = log_determinant(&covariance);
        Candidate {
            location,
            covariance,
            log_det,
        }
    }

    /// One concentration step: the `h` points closest under the given estimate
    fn concentrate(
        data: &DMatrix<f64>,
        h: usize,
        location: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Candidate {
        let precision = Self::pseudo_inverse(covariance)
            .unwrap_or_else(|_| DMatrix::zeros(covariance.nrows(), covariance.ncols()));
        let d2 = squared_mahalanobis(data, location, &precision);

        let mut order: Vec<usize> = (0..d2.len()).collect();
        order.sort_by(|&a, &b| d2[a].total_cmp(&d2[b]));
        order.truncate(h);
        order.sort_unstable();

        Self::candidate_from_support(data, &order)
    }

    /// Iterate C-steps from `current` until the determinant stops falling.
    fn c_steps(
        data: &DMatrix<f64>,
        h: usize,
        mut current: Candidate,
        max_steps: usize,
    ) -> Candidate {
        let mut previous: Option<Candidate> = None;
        let mut remaining = max_steps;

        while remaining > 0 && current.log_det.is_finite() {
            if let Some(prev) = &previous {
                if current.log_det >= prev.log_det {
                    break;
                }
            }
            let next = Self::concentrate(data, h, &current.location, &current.covariance);
            previous = Some(std::mem::replace(&mut current, next));
            remaining -= 1;
        }

        match previous {
            // Exact fit: determinant collapsed to zero
            _ if current.log_det == f64::NEG_INFINITY => current,
            // A C-step never raises the determinant in exact arithmetic
            Some(prev) if current.log_det > prev.log_det => prev,
            _ => current,
        }
    }

    /// Pseudo-inverse of a symmetric covariance matrix
    fn pseudo_inverse(covariance: &DMatrix<f64>) -> Result<DMatrix<f64>, CovarianceError> {
        let eps = 1e-12 * covariance.amax().max(f64::MIN_POSITIVE);
        covariance
            .clone()
            .pseudo_inverse(eps)
            .map_err(|e| CovarianceError::Singular(e.to_string()))
    }
}

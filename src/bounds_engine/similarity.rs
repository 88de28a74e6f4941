//! Two-Sample Similarity Test
//!
//! Independent two-sample Student's t-test with pooled variance, p-values
//! from the statrs Student's t distribution. Used to decide whether an
//! earlier completion year looks like the reference year.

use statrs::distribution::{ContinuousCDF, StudentsT};

use super::descriptive::{mean, sample_variance};

/// Outcome of one two-sample t-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestResult {
    pub t_statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    pub degrees_of_freedom: f64,
}

/// Pooled-variance two-sample t-test
pub struct TwoSampleTTest;

impl TwoSampleTTest {
    /// Compare two independent samples.
    ///
    /// Returns `None` when the statistic is undefined: fewer than three
    /// observations in total, or both samples constant with equal means.
    /// Constant samples with different means give `p = 0`.
    pub fn run(a: &[f64], b: &[f64]) -> Option<TTestResult> {
        let (n1, n2) = (a.len(), b.len());
        if n1 == 0 || n2 == 0 || n1 + n2 < 3 {
            return None;
        }

        let m1 = mean(a)?;
        let m2 = mean(b)?;
        // A single observation contributes no spread but still counts toward df
        let ss1 = sample_variance(a).unwrap_or(0.0) * (n1 - 1) as f64;
        let ss2 = sample_variance(b).unwrap_or(0.0) * (n2 - 1) as f64;

        let df = (n1 + n2 - 2) as f64;
        let pooled = (ss1 + ss2) / df;
        let se = (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
        let diff = m1 - m2;

        if se == 0.0 {
            if diff == 0.0 {
                return None;
            }
            return Some(TTestResult {
                t_statistic: diff.signum() * f64::INFINITY,
                p_value: 0.0,
                degrees_of_freedom: df,
            });
        }

        let t_stat = diff / se;
        Some(TTestResult {
            t_statistic: t_stat,
            p_value: Self::two_sided_p(t_stat, df),
            degrees_of_freedom: df,
        })
    }

    /// Two-sided p-value of a t statistic
    fn two_sided_p(t_stat: f64, df: f64) -> f64 {
        match StudentsT::new(0.0, 1.0, df) {
            Ok(t_dist) => (2.0 * (1.0 - t_dist.cdf(t_stat.abs()))).clamp(0.0, 1.0),
            Err(_) => 1.0,
        }
    }

    /// Whether two samples are statistically indistinguishable at `level`.
    ///
    /// Strict: `p > level`. An undefined test is never similar.
    pub fn is_similar(a: &[f64], b: &[f64], level: f64) -> bool {
        Self::run(a, b).is_some_and(|r| r.p_value > level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_t_statistic() {
        // Means 3 and 5, both variances 2.5, n = 5 each
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [3.0, 4.0, 5.0, 6.0, 7.0];
        let r = TwoSampleTTest::run(&a, &b).unwrap();

        assert!((r.t_statistic + 2.0).abs() < 1e-12);
        assert_eq!(r.degrees_of_freedom, 8.0);
        // scipy.stats.ttest_ind gives p = 0.0805
        assert!((r.p_value - 0.0805).abs() < 1e-3, "p = {}", r.p_value);
    }

    #[test]
    fn test_identical_samples_are_similar() {
        let a = [9800.0, 10_100.0, 10_050.0, 9900.0];
        let r = TwoSampleTTest::run(&a, &a).unwrap();
        assert_eq!(r.t_statistic, 0.0);
        assert!((r.p_value - 1.0).abs() < 1e-12);
        assert!(TwoSampleTTest::is_similar(&a, &a, 0.01));
    }

    #[test]
    fn test_well_separated_samples_differ() {
        let a: Vec<f64> = (0..30).map(|i| 7_000.0 + f64::from(i)).collect();
        let b: Vec<f64> = (0..30).map(|i| 10_000.0 + f64::from(i)).collect();
        let r = TwoSampleTTest::run(&a, &b).unwrap();
        assert!(r.p_value < 1e-6);
        assert!(!TwoSampleTTest::is_similar(&a, &b, 0.01));
    }

    #[test]
    fn test_undefined_cases() {
        assert!(TwoSampleTTest::run(&[], &[1.0, 2.0]).is_none());
        assert!(TwoSampleTTest::run(&[1.0], &[2.0]).is_none());
        assert!(TwoSampleTTest::run(&[5.0, 5.0], &[5.0, 5.0]).is_none());
        assert!(!TwoSampleTTest::is_similar(&[5.0, 5.0], &[5.0, 5.0], 0.01));
    }

    #[test]
    fn test_constant_samples_different_means() {
        let r = TwoSampleTTest::run(&[4.0, 4.0], &[6.0, 6.0, 6.0]).unwrap();
        assert_eq!(r.p_value, 0.0);
        assert!(r.t_statistic.is_infinite() && r.t_statistic < 0.0);
    }

    #[test]
    fn test_single_observation_against_sample() {
        let r = TwoSampleTTest::run(&[10.0], &[9.0, 10.0, 11.0]).unwrap();
        assert_eq!(r.degrees_of_freedom, 2.0);
        assert!(r.p_value > 0.5);
    }
}

//! Descriptive statistics shared by the bounds stages.
//!
//! Observation matrices are `n x p` (one row per well, one column per feature).

use nalgebra::{DMatrix, DVector};

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample variance with the n - 1 denominator; `None` below two values
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Quantile with linear interpolation between closest ranks.
///
/// `q` in [0, 1]; position `q * (n - 1)` on the sorted values.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Column means of an observation matrix
pub fn column_means(data: &DMatrix<f64>) -> DVector<f64> {
    let n = data.nrows().max(1) as f64;
    DVector::from_iterator(data.ncols(), data.column_iter().map(|c| c.sum() / n))
}

/// Covariance of the rows around `center`, divided by `n - ddof`.
fn scatter(data: &DMatrix<f64>, center: &DVector<f64>, ddof: usize) -> DMatrix<f64> {
    let mut centered = data.clone();
    for mut row in centered.row_iter_mut() {
        row -= center.transpose();
    }
    let denom = data.nrows().saturating_sub(ddof).max(1) as f64;
    (centered.transpose() * &centered) / denom
}

/// Unbiased sample covariance (n - 1 denominator)
pub fn sample_covariance(data: &DMatrix<f64>) -> DMatrix<f64> {
    scatter(data, &column_means(data), 1)
}

/// Maximum-likelihood covariance around a given location (n denominator)
pub fn ml_covariance(data: &DMatrix<f64>, location: &DVector<f64>) -> DMatrix<f64> {
    scatter(data, location, 0)
}

/// Build an `n x p` matrix from row-major observations
pub fn observation_matrix(rows: &[Vec<f64>], ncols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j])
}

/// Rows of `data` selected by index, in the given order
pub fn select_rows(data: &DMatrix<f64>, indices: &[usize]) -> DMatrix<f64> {
    data.select_rows(indices)
}

/// Squared Mahalanobis distance of every row from `location`
pub fn squared_mahalanobis(
    data: &DMatrix<f64>,
    location: &DVector<f64>,
    precision: &DMatrix<f64>,
) -> Vec<f64> {
    data.row_iter()
        .map(|row| {
            let diff = row.transpose() - location;
            // Rounding can push exact-fit points slightly negative
            (diff.transpose() * precision * &diff)[(0, 0)].max(0.0)
        })
        .collect()
}

/// Natural log of the determinant, `-inf` for singular or indefinite matrices
pub fn log_determinant(matrix: &DMatrix<f64>) -> f64 {
    let det = matrix.determinant();
    if det > 0.0 && det.is_finite() {
        det.ln()
    } else {
        f64::NEG_INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolates_like_pandas() {
        let counts = [8.0, 10.0, 12.0, 15.0, 20.0];
        // pos = 0.25 * 4 = 1.0 → 10
        assert_eq!(quantile(&counts, 0.25), Some(10.0));
        // pos = 0.975 * 4 = 3.9 → 15 + 0.9 * 5
        let q = quantile(&counts, 0.975).unwrap();
        assert!((q - 19.5).abs() < 1e-12);
        assert_eq!(quantile(&[3.0, 1.0], 0.5), Some(2.0));
    }

    #[test]
    fn test_quantile_edge_cases() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[7.0], 0.9), Some(7.0));
        assert_eq!(quantile(&[1.0, 2.0], 1.5), None);
    }

    #[test]
    fn test_sample_variance() {
        let v = sample_variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((v - 32.0 / 7.0).abs() < 1e-12);
        assert!(sample_variance(&[1.0]).is_none());
    }

    #[test]
    fn test_covariances_differ_by_denominator() {
        let data = DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0, 4.0, 8.0]);
        let unbiased = sample_covariance(&data);
        let biased = ml_covariance(&data, &column_means(&data));

        // var(x) = 5/3 unbiased, 5/4 biased; y = 2x
        assert!((unbiased[(0, 0)] - 5.0 / 3.0).abs() < 1e-12);
        assert!((biased[(0, 0)] - 1.25).abs() < 1e-12);
        assert!((unbiased[(1, 0)] - 10.0 / 3.0).abs() < 1e-12);
        assert!((unbiased[(0, 1)] - unbiased[(1, 0)]).abs() < 1e-12);
    }

    #[test]
    fn test_mahalanobis_identity_is_euclidean() {
        let data = DMatrix::from_row_slice(2, 2, &[3.0, 4.0, 0.0, 0.0]);
        let d2 = squared_mahalanobis(&data, &DVector::zeros(2), &DMatrix::identity(2, 2));
        assert_eq!(d2, vec![25.0, 0.0]);
    }

    #[test]
    fn test_log_determinant_singular() {
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert_eq!(log_determinant(&singular), f64::NEG_INFINITY);
        let diag = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 3.0]));
        assert!((log_determinant(&diag) - 6.0_f64.ln()).abs() < 1e-12);
    }
}

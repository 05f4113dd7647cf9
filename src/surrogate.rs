//! Weighted ridge surrogate fit
//!
//! Solves the sample-weighted, L2-regularized least squares problem on the
//! interpretable design matrix via the normal equations. Symmetric systems go
//! through a Cholesky solve with a regularized retry; a Gauss-Jordan inverse
//! is the last resort before giving up.

use crate::error::{ExplainError, Result};
use ndarray::{Array1, Array2, Axis};

/// Coefficients and intercept of a fitted weighted ridge model
#[derive(Debug, Clone)]
pub struct RidgeFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl RidgeFit {
    /// Surrogate prediction for one design row
    pub fn predict_row(&self, row: &Array1<f64>) -> f64 {
        self.coefficients.dot(row) + self.intercept
    }
}

/// Fit `y ~ x` with per-sample weights `w` and L2 strength `alpha`.
///
/// Weighted centering keeps the intercept out of the penalty; rows are then
/// scaled by sqrt(weight) so the normal equations carry the weights.
pub fn fit_weighted_ridge(
    x: &Array2<f64>,
    y: &Array1<f64>,
    w: &Array1<f64>,
    alpha: f64,
) -> Result<RidgeFit> {
    let n_samples = x.nrows();
    let n_features = x.ncols();
    if y.len() != n_samples || w.len() != n_samples {
        return Err(ExplainError::Computation(format!(
            "surrogate fit: {} rows but {} targets and {} weights",
            n_samples,
            y.len(),
            w.len()
        )));
    }
    let w_sum = w.sum();
    if !(w_sum > 0.0) {
        return Err(ExplainError::Computation(
            "surrogate fit: sample weights sum to zero".to_string(),
        ));
    }

    let x_mean = x.t().dot(w) / w_sum;
    let y_mean = y.dot(w) / w_sum;

    let sqrt_w = w.mapv(f64::sqrt);
    let x_c = (x - &x_mean.clone().insert_axis(Axis(0))) * &sqrt_w.clone().insert_axis(Axis(1));
    let y_c = (y - y_mean) * &sqrt_w;

    let mut xtx = x_c.t().dot(&x_c);
    for i in 0..n_features {
        xtx[[i, i]] += alpha;
    }
    let xty = x_c.t().dot(&y_c);

    let coefficients = solve_spd(&xtx, &xty).ok_or_else(|| {
        ExplainError::Computation("surrogate normal equations are singular".to_string())
    })?;
    let intercept = y_mean - coefficients.dot(&x_mean);

    Ok(RidgeFit {
        coefficients,
        intercept,
    })
}

/// Weighted R² of a fit against the perturbed sample
pub fn weighted_r2(
    x: &Array2<f64>,
    y: &Array1<f64>,
    w: &Array1<f64>,
    fit: &RidgeFit,
) -> f64 {
    let preds = x.dot(&fit.coefficients) + fit.intercept;
    let w_sum = w.sum();
    let y_mean = y.dot(w) / w_sum;
    let ss_res: f64 = y
        .iter()
        .zip(preds.iter())
        .zip(w.iter())
        .map(|((&yi, &pi), &wi)| wi * (yi - pi) * (yi - pi))
        .sum();
    let ss_tot: f64 = y
        .iter()
        .zip(w.iter())
        .map(|(&yi, &wi)| wi * (yi - y_mean) * (yi - y_mean))
        .sum();
    if ss_tot == 0.0 {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Solve a symmetric positive-definite system, with a regularized retry and
/// an inverse fallback for near-singular matrices
fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    if let Some(l) = cholesky(a) {
        return Some(cholesky_back_substitute(&l, b));
    }
    // Not positive definite: bump the diagonal and retry once
    let n = a.nrows();
    let bump = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>().max(1.0) / n as f64;
    let mut a_reg = a.clone();
    for i in 0..n {
        a_reg[[i, i]] += bump;
    }
    if let Some(l) = cholesky(&a_reg) {
        return Some(cholesky_back_substitute(&l, b));
    }
    matrix_inverse(&a_reg).map(|inv| inv.dot(b))
}

/// Cholesky factor A = L L^T, or None if A is not positive definite
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l: Array2<f64> = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Forward then backward substitution through the Cholesky factor
fn cholesky_back_substitute(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

/// Gauss-Jordan inverse, or None if the matrix is singular
fn matrix_inverse(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        // Partial pivoting
        let mut pivot = col;
        for row in (col + 1)..n {
            if aug[[row, col]].abs() > aug[[pivot, col]].abs() {
                pivot = row;
            }
        }
        if aug[[pivot, col]].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for j in 0..2 * n {
                let tmp = aug[[col, j]];
                aug[[col, j]] = aug[[pivot, j]];
                aug[[pivot, j]] = tmp;
            }
        }
        let p = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= p;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[[row, col]];
            if factor != 0.0 {
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_unweighted_recovers_linear_model() {
        // y = 2x0 - x1 + 3, uniform weights, tiny ridge
        let x = array![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [2.0, 1.0],
            [2.0, 3.0],
        ];
        let y = x.map_axis(Axis(1), |r| 2.0 * r[0] - r[1] + 3.0);
        let w = Array1::ones(x.nrows());

        let fit = fit_weighted_ridge(&x, &y, &w, 1e-6).unwrap();
        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(fit.coefficients[1], -1.0, epsilon = 1e-3);
        assert_relative_eq!(fit.intercept, 3.0, epsilon = 1e-3);
        assert!(weighted_r2(&x, &y, &w, &fit) > 0.999);
    }

    #[test]
    fn test_weights_focus_the_fit() {
        // Two regimes; weights select the first one
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0]];
        let y = array![0.0, 1.0, 2.0, 50.0, 80.0];
        let w = array![1.0, 1.0, 1.0, 1e-9, 1e-9];

        let fit = fit_weighted_ridge(&x, &y, &w, 1e-6).unwrap();
        assert_relative_eq!(fit.coefficients[0], 1.0, epsilon = 1e-2);
        assert_relative_eq!(fit.intercept, 0.0, epsilon = 1e-2);
    }

    #[test]
    fn test_zero_weights_rejected() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 2.0];
        let w = array![0.0, 0.0];
        assert!(fit_weighted_ridge(&x, &y, &w, 1.0).is_err());
    }

    #[test]
    fn test_constant_column_survives_via_ridge() {
        // A constant column makes X^T X rank-deficient; the ridge term keeps
        // the solve well-posed
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0], [4.0, 5.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];
        let w = Array1::ones(4);
        let fit = fit_weighted_ridge(&x, &y, &w, 1.0).unwrap();
        assert!(fit.coefficients[0] > 0.5);
    }

    #[test]
    fn test_matrix_inverse_identity() {
        let a = array![[2.0, 0.0], [0.0, 4.0]];
        let inv = matrix_inverse(&a).unwrap();
        assert_relative_eq!(inv[[0, 0]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(inv[[1, 1]], 0.25, epsilon = 1e-12);
    }
}

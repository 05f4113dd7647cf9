//! Sparse feature pre-selection for the surrogate fit
//!
//! Keeps explanations human-interpretable by restricting the weighted ridge
//! fit to at most `k` design columns before the final fit.

use crate::error::Result;
use crate::surrogate::{fit_weighted_ridge, weighted_r2};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// How the top-k design columns are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// Forward selection for small feature counts, highest weights otherwise
    Auto,
    /// Single full fit, keep the k largest |coefficient| columns
    HighestWeights,
    /// Greedy add-one-column loop maximizing weighted fit
    ForwardSelection,
    /// L1 (coordinate descent) pre-selection pass
    Lasso,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        SelectionMethod::Auto
    }
}

/// Forward selection is exact but quadratic in the feature count; past this
/// size Auto switches to the single-fit ranking.
const FORWARD_SELECTION_LIMIT: usize = 6;

/// Choose up to `k` column indices of `x` for the final surrogate fit
pub fn select_features(
    x: &Array2<f64>,
    y: &Array1<f64>,
    w: &Array1<f64>,
    k: usize,
    method: SelectionMethod,
    alpha: f64,
) -> Result<Vec<usize>> {
    let n_features = x.ncols();
    let k = k.min(n_features);
    if k == n_features {
        return Ok((0..n_features).collect());
    }
    match method {
        SelectionMethod::Auto => {
            if n_features <= FORWARD_SELECTION_LIMIT {
                forward_selection(x, y, w, k, alpha)
            } else {
                highest_weights(x, y, w, k, alpha)
            }
        }
        SelectionMethod::HighestWeights => highest_weights(x, y, w, k, alpha),
        SelectionMethod::ForwardSelection => forward_selection(x, y, w, k, alpha),
        SelectionMethod::Lasso => lasso_selection(x, y, w, k),
    }
}

fn highest_weights(
    x: &Array2<f64>,
    y: &Array1<f64>,
    w: &Array1<f64>,
    k: usize,
    alpha: f64,
) -> Result<Vec<usize>> {
    let fit = fit_weighted_ridge(x, y, w, alpha)?;
    Ok(top_k_by_magnitude(&fit.coefficients.to_vec(), k))
}

fn forward_selection(
    x: &Array2<f64>,
    y: &Array1<f64>,
    w: &Array1<f64>,
    k: usize,
    alpha: f64,
) -> Result<Vec<usize>> {
    let n_features = x.ncols();
    let mut selected: Vec<usize> = Vec::with_capacity(k);
    let mut remaining: Vec<usize> = (0..n_features).collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best: Option<(usize, f64)> = None;
        for (pos, &j) in remaining.iter().enumerate() {
            let mut cols = selected.clone();
            cols.push(j);
            let xs = x.select(Axis(1), &cols);
            let fit = fit_weighted_ridge(&xs, y, w, alpha)?;
            let score = weighted_r2(&xs, y, w, &fit);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((pos, score));
            }
        }
        let (pos, _) = best.expect("remaining is non-empty");
        selected.push(remaining.remove(pos));
    }
    Ok(selected)
}

/// Coordinate-descent lasso on the weighted, centered problem, relaxing the
/// penalty until at least k coefficients are active, then keeping the k
/// largest
fn lasso_selection(
    x: &Array2<f64>,
    y: &Array1<f64>,
    w: &Array1<f64>,
    k: usize,
) -> Result<Vec<usize>> {
    let n = x.nrows();
    let w_sum = w.sum();
    let x_mean = x.t().dot(w) / w_sum;
    let y_mean = y.dot(w) / w_sum;
    let sqrt_w = w.mapv(f64::sqrt);
    let x_c = (x - &x_mean.clone().insert_axis(Axis(0))) * &sqrt_w.clone().insert_axis(Axis(1));
    let y_c = (y - y_mean) * &sqrt_w;

    // Penalty at which every coefficient is zero
    let alpha_max = (0..x_c.ncols())
        .map(|j| x_c.column(j).dot(&y_c).abs() / n as f64)
        .fold(0.0f64, f64::max)
        .max(1e-12);

    let mut alpha = alpha_max * 0.5;
    let mut beta = Array1::zeros(x_c.ncols());
    for _ in 0..40 {
        beta = lasso_cd(&x_c, &y_c, alpha, 200, 1e-7);
        let active = beta.iter().filter(|b| b.abs() > 0.0).count();
        if active >= k || alpha < 1e-10 {
            break;
        }
        alpha *= 0.5;
    }
    Ok(top_k_by_magnitude(&beta.to_vec(), k))
}

fn lasso_cd(
    x_c: &Array2<f64>,
    y_c: &Array1<f64>,
    alpha: f64,
    max_iter: usize,
    tol: f64,
) -> Array1<f64> {
    let (n, m) = x_c.dim();
    let threshold = alpha * n as f64;
    let col_sq: Vec<f64> = (0..m).map(|j| x_c.column(j).mapv(|v| v * v).sum()).collect();

    let mut beta: Array1<f64> = Array1::zeros(m);
    let mut resid = y_c.clone();
    for _ in 0..max_iter {
        let mut max_delta = 0.0f64;
        for j in 0..m {
            if col_sq[j] <= f64::EPSILON {
                continue;
            }
            let old = beta[j];
            let rho = x_c.column(j).dot(&resid) + col_sq[j] * old;
            let new = soft_threshold(rho, threshold) / col_sq[j];
            if new != old {
                let delta = new - old;
                for i in 0..n {
                    resid[i] -= x_c[[i, j]] * delta;
                }
                beta[j] = new;
                max_delta = max_delta.max(delta.abs());
            }
        }
        if max_delta < tol {
            break;
        }
    }
    beta
}

fn soft_threshold(z: f64, threshold: f64) -> f64 {
    if z > threshold {
        z - threshold
    } else if z < -threshold {
        z + threshold
    } else {
        0.0
    }
}

fn top_k_by_magnitude(coefficients: &[f64], k: usize) -> Vec<usize> {
    let mut indexed: Vec<(usize, f64)> = coefficients
        .iter()
        .map(|c| c.abs())
        .enumerate()
        .collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let mut kept: Vec<usize> = indexed.into_iter().take(k).map(|(i, _)| i).collect();
    kept.sort_unstable();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::prelude::*;

    // y depends strongly on columns 0 and 2, not on 1 and 3
    fn fixture() -> (Array2<f64>, Array1<f64>, Array1<f64>) {
        let mut rng = StdRng::seed_from_u64(11);
        let n = 200;
        let mut x = Array2::zeros((n, 4));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            for j in 0..4 {
                x[[i, j]] = rng.gen::<f64>() * 2.0 - 1.0;
            }
            y[i] = 5.0 * x[[i, 0]] - 3.0 * x[[i, 2]] + 0.01 * x[[i, 1]];
        }
        let w = Array1::ones(n);
        (x, y, w)
    }

    #[test]
    fn test_highest_weights_finds_informative_columns() {
        let (x, y, w) = fixture();
        let sel = select_features(&x, &y, &w, 2, SelectionMethod::HighestWeights, 1e-3).unwrap();
        assert_eq!(sel, vec![0, 2]);
    }

    #[test]
    fn test_forward_selection_finds_informative_columns() {
        let (x, y, w) = fixture();
        let sel = select_features(&x, &y, &w, 2, SelectionMethod::ForwardSelection, 1e-3).unwrap();
        assert_eq!(sel, vec![0, 2]);
    }

    #[test]
    fn test_lasso_finds_informative_columns() {
        let (x, y, w) = fixture();
        let sel = select_features(&x, &y, &w, 2, SelectionMethod::Lasso, 1e-3).unwrap();
        assert_eq!(sel, vec![0, 2]);
    }

    #[test]
    fn test_k_at_least_feature_count_returns_all() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![1.0, 2.0];
        let w = array![1.0, 1.0];
        let sel = select_features(&x, &y, &w, 10, SelectionMethod::Auto, 1.0).unwrap();
        assert_eq!(sel, vec![0, 1]);
    }

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }
}

//! Distance weighting of perturbed rows
//!
//! Distances are computed in a normalized space: continuous features
//! contribute `(x - q) / std` Euclidean terms, categorical features a binary
//! mismatch term. An exponential kernel turns distance into a similarity
//! weight in (0, 1].

use crate::schema::{FeatureKind, FeatureSchema};
use crate::stats::{FeatureStats, ReferenceStats};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;

/// Normalized distance between every perturbed row and the query instance.
/// Row order is preserved; row 0 (the query itself) has distance 0.
pub fn distances_to_query(
    data: &Array2<f64>,
    query: &Array1<f64>,
    schema: &FeatureSchema,
    stats: &ReferenceStats,
) -> Array1<f64> {
    // Per-feature scale: std for continuous, unused for categorical
    let scales: Vec<f64> = (0..schema.len())
        .map(|j| match stats.feature(j) {
            FeatureStats::Continuous(s) => s.std,
            FeatureStats::Categorical(_) => 1.0,
        })
        .collect();

    let dists: Vec<f64> = (0..data.nrows())
        .into_par_iter()
        .map(|i| row_distance(data.row(i), query, schema, &scales))
        .collect();
    Array1::from_vec(dists)
}

fn row_distance(
    row: ArrayView1<f64>,
    query: &Array1<f64>,
    schema: &FeatureSchema,
    scales: &[f64],
) -> f64 {
    let mut acc = 0.0;
    for j in 0..schema.len() {
        match schema.kind(j) {
            FeatureKind::Continuous => {
                let d = (row[j] - query[j]) / scales[j];
                acc += d * d;
            }
            FeatureKind::Categorical => {
                if row[j] != query[j] {
                    acc += 1.0;
                }
            }
        }
    }
    acc.sqrt()
}

/// Exponential similarity kernel: `sqrt(exp(-(d^2) / kernel_width^2))`.
/// Distance 0 maps to weight exactly 1.0.
pub fn kernel_weights(distances: &Array1<f64>, kernel_width: f64) -> Array1<f64> {
    let kw2 = kernel_width * kernel_width;
    distances.mapv(|d| (-(d * d) / kw2).exp().sqrt())
}

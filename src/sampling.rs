//! Perturbation sampling around a query instance
//!
//! Generates the synthetic neighborhood used to fit the local surrogate.
//! Randomness comes from an explicitly seeded RNG owned by the caller, so a
//! fixed seed reproduces the batch exactly.

use crate::error::{ExplainError, Result};
use crate::schema::{FeatureKind, FeatureSchema};
use crate::stats::{FeatureStats, ReferenceStats};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

/// A generated batch of synthetic neighbors. Row 0 of both matrices is always
/// the exact, unperturbed query instance. Discarded after the explanation is
/// assembled.
#[derive(Debug, Clone)]
pub struct PerturbationSet {
    /// Perturbed rows in the original feature space, fed to the predictor
    pub data: Array2<f64>,
    /// Interpretable representation the surrogate is fit on: raw values for
    /// continuous columns, match-with-query indicators for categorical ones
    pub design: Array2<f64>,
}

/// Generate `num_samples` perturbed rows around `query`.
///
/// Continuous features are drawn from Normal(mean, std) with the feature's
/// reference-sample statistics; categorical features are resampled from their
/// empirical frequency distribution, so a perturbed value keeps the query's
/// category with that category's own empirical probability.
pub fn perturb(
    query: &Array1<f64>,
    schema: &FeatureSchema,
    stats: &ReferenceStats,
    num_samples: usize,
    rng: &mut StdRng,
) -> Result<PerturbationSet> {
    let n_features = schema.len();
    if query.len() != n_features {
        return Err(ExplainError::Schema(format!(
            "query has {} values but schema declares {} features",
            query.len(),
            n_features
        )));
    }
    if num_samples == 0 {
        return Err(ExplainError::InvalidParameter {
            name: "num_samples".to_string(),
            value: "0".to_string(),
            reason: "at least one perturbed row is required".to_string(),
        });
    }

    let mut data = Array2::zeros((num_samples, n_features));
    let mut design = Array2::zeros((num_samples, n_features));

    for j in 0..n_features {
        match (schema.kind(j), stats.feature(j)) {
            (FeatureKind::Continuous, FeatureStats::Continuous(s)) => {
                let dist = Normal::new(s.mean, s.std)
                    .map_err(|e| ExplainError::Computation(format!("normal sampler: {}", e)))?;
                data[[0, j]] = query[j];
                design[[0, j]] = query[j];
                for i in 1..num_samples {
                    let v = dist.sample(rng);
                    data[[i, j]] = v;
                    design[[i, j]] = v;
                }
            }
            (FeatureKind::Categorical, FeatureStats::Categorical(s)) => {
                data[[0, j]] = query[j];
                design[[0, j]] = 1.0;
                for i in 1..num_samples {
                    let v = sample_category(&s.values, &s.frequencies, rng);
                    data[[i, j]] = v;
                    design[[i, j]] = if v == query[j] { 1.0 } else { 0.0 };
                }
            }
            // Schema and stats are built together by the explainer
            _ => {
                return Err(ExplainError::Schema(format!(
                    "feature {} kind does not match its statistics",
                    j
                )))
            }
        }
    }

    Ok(PerturbationSet { data, design })
}

/// Draw one category code proportionally to its empirical frequency
fn sample_category(values: &[f64], frequencies: &[f64], rng: &mut StdRng) -> f64 {
    let u: f64 = rng.gen();
    let mut acc = 0.0;
    for (v, f) in values.iter().zip(frequencies.iter()) {
        acc += f;
        if u < acc {
            return *v;
        }
    }
    // Frequencies sum to 1 up to rounding; fall through to the last code
    values[values.len() - 1]
}

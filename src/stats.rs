//! Per-feature statistics estimated from the training reference sample
//!
//! The reference sample is read once at construction time; everything here is
//! immutable afterwards and shared by every explanation request.

use crate::error::{ExplainError, Result};
use crate::schema::{FeatureKind, FeatureSchema};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Minimum scale substituted when a continuous feature has zero variance
pub const EPSILON_SCALE: f64 = 1e-6;

/// Statistics for one continuous feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuousStats {
    pub mean: f64,
    pub std: f64,
    /// Inner quartile edges (q1, q2, q3 with duplicates removed), used only
    /// for human-readable descriptions
    pub bin_edges: Vec<f64>,
}

/// Empirical category distribution for one categorical feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalStats {
    /// Distinct category codes observed in the reference sample
    pub values: Vec<f64>,
    /// Empirical frequency of each code, same order as `values`
    pub frequencies: Vec<f64>,
}

impl CategoricalStats {
    /// Empirical probability of a given code (0.0 if never observed)
    pub fn frequency_of(&self, code: f64) -> f64 {
        self.values
            .iter()
            .position(|&v| v == code)
            .map(|i| self.frequencies[i])
            .unwrap_or(0.0)
    }
}

/// Per-feature statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeatureStats {
    Continuous(ContinuousStats),
    Categorical(CategoricalStats),
}

/// Statistics for every feature of the reference sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceStats {
    features: Vec<FeatureStats>,
}

impl ReferenceStats {
    /// Estimate statistics from the reference sample.
    ///
    /// A continuous feature with zero standard deviation is recovered by
    /// substituting [`EPSILON_SCALE`] and logging a warning.
    pub fn fit(reference: &Array2<f64>, schema: &FeatureSchema) -> Result<Self> {
        Self::fit_inner(reference, schema, false)
    }

    /// Like [`fit`](Self::fit), but fails with
    /// [`ExplainError::InsufficientVariance`] instead of recovering.
    pub fn fit_strict(reference: &Array2<f64>, schema: &FeatureSchema) -> Result<Self> {
        Self::fit_inner(reference, schema, true)
    }

    fn fit_inner(reference: &Array2<f64>, schema: &FeatureSchema, strict: bool) -> Result<Self> {
        if reference.nrows() == 0 {
            return Err(ExplainError::Schema(
                "reference sample has no rows".to_string(),
            ));
        }
        let n = reference.nrows() as f64;
        let mut features = Vec::with_capacity(schema.len());

        for j in 0..schema.len() {
            let col = reference.column(j);
            match schema.kind(j) {
                FeatureKind::Continuous => {
                    let mean = col.sum() / n;
                    let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                    let mut std = var.sqrt();
                    if std <= 0.0 {
                        if strict {
                            return Err(ExplainError::InsufficientVariance {
                                feature: schema.name(j).to_string(),
                            });
                        }
                        warn!(
                            feature = schema.name(j),
                            "zero variance in reference sample, substituting epsilon scale"
                        );
                        std = EPSILON_SCALE;
                    }
                    let bin_edges = quartile_edges(col.iter().copied().collect());
                    features.push(FeatureStats::Continuous(ContinuousStats {
                        mean,
                        std,
                        bin_edges,
                    }));
                }
                FeatureKind::Categorical => {
                    let mut values: Vec<f64> = Vec::new();
                    let mut counts: Vec<usize> = Vec::new();
                    for &v in col.iter() {
                        match values.iter().position(|&u| u == v) {
                            Some(i) => counts[i] += 1,
                            None => {
                                values.push(v);
                                counts.push(1);
                            }
                        }
                    }
                    // Stable order so sampling is reproducible
                    let mut order: Vec<usize> = (0..values.len()).collect();
                    order.sort_by(|&a, &b| {
                        values[a]
                            .partial_cmp(&values[b])
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    let frequencies = order.iter().map(|&i| counts[i] as f64 / n).collect();
                    let values = order.iter().map(|&i| values[i]).collect();
                    features.push(FeatureStats::Categorical(CategoricalStats {
                        values,
                        frequencies,
                    }));
                }
            }
        }

        Ok(Self { features })
    }

    /// Statistics for the feature at `index`
    pub fn feature(&self, index: usize) -> &FeatureStats {
        &self.features[index]
    }

    /// Continuous statistics for a feature, if it is continuous
    pub fn continuous(&self, index: usize) -> Option<&ContinuousStats> {
        match &self.features[index] {
            FeatureStats::Continuous(s) => Some(s),
            FeatureStats::Categorical(_) => None,
        }
    }

    /// Categorical statistics for a feature, if it is categorical
    pub fn categorical(&self, index: usize) -> Option<&CategoricalStats> {
        match &self.features[index] {
            FeatureStats::Categorical(s) => Some(s),
            FeatureStats::Continuous(_) => None,
        }
    }

    /// Human-readable description of one feature value, used when assembling
    /// explanation entries: binned range for continuous features
    /// ("fare <= 12.50"), category equality for categorical ones
    /// ("cab_type = premium").
    pub fn describe(&self, schema: &FeatureSchema, index: usize, value: f64) -> String {
        let name = schema.name(index);
        match &self.features[index] {
            FeatureStats::Categorical(_) => {
                format!("{} = {}", name, schema.category_label(index, value))
            }
            FeatureStats::Continuous(s) => describe_binned(name, value, &s.bin_edges),
        }
    }
}

/// Inner quartile edges of a column, duplicates removed
fn quartile_edges(mut values: Vec<f64>) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut edges = Vec::with_capacity(3);
    for i in 1..4 {
        let q = i as f64 / 4.0;
        let idx = (q * (values.len() - 1) as f64) as usize;
        let edge = values[idx];
        if edges.last() != Some(&edge) {
            edges.push(edge);
        }
    }
    edges
}

fn describe_binned(name: &str, value: f64, edges: &[f64]) -> String {
    if edges.is_empty() {
        return format!("{} = {:.2}", name, value);
    }
    if value <= edges[0] {
        return format!("{} <= {:.2}", name, edges[0]);
    }
    for w in edges.windows(2) {
        if value <= w[1] {
            return format!("{:.2} < {} <= {:.2}", w[0], name, w[1]);
        }
    }
    format!("{} > {:.2}", name, edges[edges.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> (Array2<f64>, FeatureSchema) {
        let data = array![
            [10.0, 0.0],
            [20.0, 1.0],
            [30.0, 1.0],
            [40.0, 2.0],
            [50.0, 1.0],
        ];
        let schema = FeatureSchema::new(vec!["fare", "cab_type"]).with_categorical(&[1]);
        (data, schema)
    }

    #[test]
    fn test_continuous_stats() {
        let (data, schema) = sample();
        let stats = ReferenceStats::fit(&data, &schema).unwrap();
        let cont = stats.continuous(0).unwrap();
        assert!((cont.mean - 30.0).abs() < 1e-12);
        assert!((cont.std - (200.0f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_categorical_frequencies() {
        let (data, schema) = sample();
        let stats = ReferenceStats::fit(&data, &schema).unwrap();
        let cat = stats.categorical(1).unwrap();
        assert_eq!(cat.values, vec![0.0, 1.0, 2.0]);
        assert!((cat.frequency_of(1.0) - 0.6).abs() < 1e-12);
        assert!((cat.frequencies.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_recovery() {
        let data = array![[5.0], [5.0], [5.0]];
        let schema = FeatureSchema::new(vec!["constant"]);
        let stats = ReferenceStats::fit(&data, &schema).unwrap();
        assert_eq!(stats.continuous(0).unwrap().std, EPSILON_SCALE);

        let err = ReferenceStats::fit_strict(&data, &schema).unwrap_err();
        assert!(matches!(err, ExplainError::InsufficientVariance { .. }));
    }

    #[test]
    fn test_describe_continuous_bins() {
        let (data, schema) = sample();
        let stats = ReferenceStats::fit(&data, &schema).unwrap();
        // edges are [20, 30, 40]
        assert_eq!(stats.describe(&schema, 0, 15.0), "fare <= 20.00");
        assert_eq!(stats.describe(&schema, 0, 25.0), "20.00 < fare <= 30.00");
        assert_eq!(stats.describe(&schema, 0, 45.0), "fare > 40.00");
    }

    #[test]
    fn test_describe_categorical() {
        let (data, _) = sample();
        let schema = FeatureSchema::new(vec!["fare", "cab_type"])
            .with_categorical(&[1])
            .with_category_labels(1, vec!["economy", "premium", "luxury"]);
        let stats = ReferenceStats::fit(&data, &schema).unwrap();
        assert_eq!(stats.describe(&schema, 1, 1.0), "cab_type = premium");
    }
}

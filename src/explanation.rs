//! Explanation result types

use serde::{Deserialize, Serialize};

/// One feature's signed contribution to the local surrogate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureWeight {
    /// Column index in the original feature space
    pub feature_index: usize,
    /// Human-readable description ("fare <= 12.50", "cab_type = premium")
    pub description: String,
    /// Signed linear coefficient in the local surrogate
    pub weight: f64,
}

/// A local linear approximation of the predictor around one query instance.
///
/// Immutable once produced, and only valid for the predictor and query it
/// was built from. Entries are sorted by descending |weight|.
///
/// Explanations are a best-effort *local* approximation: repeated calls with
/// different random seeds may surface different (though typically similar)
/// top features. That variability comes from the sampling step and is
/// expected, not a defect; fix the seed for reproducible output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Explained class label (classification mode only)
    pub class_label: Option<String>,
    /// Top contributing features, sorted by descending |weight|
    pub feature_weights: Vec<FeatureWeight>,
    /// Local intercept of the surrogate
    pub intercept: f64,
    /// Weighted R² of the surrogate against the perturbed sample
    pub score: f64,
    /// The surrogate's own prediction at the query instance
    pub local_prediction: f64,
}

impl Explanation {
    /// Explanation as (description, weight) pairs, strongest first
    pub fn as_list(&self) -> Vec<(String, f64)> {
        self.feature_weights
            .iter()
            .map(|fw| (fw.description.clone(), fw.weight))
            .collect()
    }

    /// Features pushing the prediction up
    pub fn positive_features(&self) -> Vec<&FeatureWeight> {
        self.feature_weights
            .iter()
            .filter(|fw| fw.weight > 0.0)
            .collect()
    }

    /// Features pushing the prediction down
    pub fn negative_features(&self) -> Vec<&FeatureWeight> {
        self.feature_weights
            .iter()
            .filter(|fw| fw.weight < 0.0)
            .collect()
    }

    /// Serialize the explanation to a JSON string
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

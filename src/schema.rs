//! Feature schema for the tabular feature space

use crate::error::{ExplainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of a tabular feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Real-valued feature perturbed with Gaussian noise
    Continuous,
    /// Label-encoded feature perturbed by resampling its category
    Categorical,
}

/// Ordered description of the feature columns an explainer operates on.
///
/// Categorical features are expected to arrive label-encoded (the column
/// holds small non-negative integer codes stored as `f64`). Display names
/// for those codes are optional; when absent the numeric code is shown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
    kinds: Vec<FeatureKind>,
    // Indices passed to with_categorical, kept verbatim so validate() can
    // reject out-of-range declarations
    declared_categorical: Vec<usize>,
    // Maps categorical feature index -> display label per category code
    category_labels: HashMap<usize, Vec<String>>,
}

impl FeatureSchema {
    /// Create a schema where every feature is continuous
    pub fn new<S: Into<String>>(names: Vec<S>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let kinds = vec![FeatureKind::Continuous; names.len()];
        Self {
            names,
            kinds,
            declared_categorical: Vec::new(),
            category_labels: HashMap::new(),
        }
    }

    /// Mark a set of feature indices as categorical
    pub fn with_categorical(mut self, indices: &[usize]) -> Self {
        for &idx in indices {
            self.declared_categorical.push(idx);
            if let Some(kind) = self.kinds.get_mut(idx) {
                *kind = FeatureKind::Categorical;
            }
        }
        self
    }

    /// Attach display labels for the category codes of one categorical feature
    pub fn with_category_labels<S: Into<String>>(
        mut self,
        feature_index: usize,
        labels: Vec<S>,
    ) -> Self {
        self.category_labels
            .insert(feature_index, labels.into_iter().map(Into::into).collect());
        self
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the schema has no features
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Feature name at `index`
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Feature kind at `index`
    pub fn kind(&self, index: usize) -> FeatureKind {
        self.kinds[index]
    }

    /// Whether the feature at `index` is categorical
    pub fn is_categorical(&self, index: usize) -> bool {
        self.kinds[index] == FeatureKind::Categorical
    }

    /// Indices of all categorical features, in order
    pub fn categorical_indices(&self) -> Vec<usize> {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == FeatureKind::Categorical)
            .map(|(i, _)| i)
            .collect()
    }

    /// Display label for a category code of a categorical feature.
    /// Falls back to the numeric code when no label was provided.
    pub fn category_label(&self, feature_index: usize, code: f64) -> String {
        let idx = code.round();
        if idx >= 0.0 {
            if let Some(labels) = self.category_labels.get(&feature_index) {
                if let Some(label) = labels.get(idx as usize) {
                    return label.clone();
                }
            }
        }
        format!("{}", idx as i64)
    }

    /// Validate the schema against a reference sample with `n_cols` columns
    pub fn validate(&self, n_cols: usize) -> Result<()> {
        if self.names.len() != n_cols {
            return Err(ExplainError::Schema(format!(
                "expected {} feature names to match reference sample columns, got {}",
                n_cols,
                self.names.len()
            )));
        }
        for &idx in &self.declared_categorical {
            if idx >= n_cols {
                return Err(ExplainError::Schema(format!(
                    "categorical feature index {} is out of range for {} columns",
                    idx, n_cols
                )));
            }
        }
        for &idx in self.category_labels.keys() {
            if idx >= n_cols {
                return Err(ExplainError::Schema(format!(
                    "category labels declared for feature index {} but sample has {} columns",
                    idx, n_cols
                )));
            }
            if !self.is_categorical(idx) {
                return Err(ExplainError::Schema(format!(
                    "category labels declared for feature index {} which is not categorical",
                    idx
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> FeatureSchema {
        FeatureSchema::new(vec!["fare", "cab_type", "distance"])
            .with_categorical(&[1])
            .with_category_labels(1, vec!["economy", "premium", "luxury"])
    }

    #[test]
    fn test_kinds_and_indices() {
        let schema = sample_schema();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.kind(0), FeatureKind::Continuous);
        assert_eq!(schema.kind(1), FeatureKind::Categorical);
        assert_eq!(schema.categorical_indices(), vec![1]);
    }

    #[test]
    fn test_category_labels() {
        let schema = sample_schema();
        assert_eq!(schema.category_label(1, 2.0), "luxury");
        // Unknown code falls back to the numeric code
        assert_eq!(schema.category_label(1, 7.0), "7");
        // Feature without labels falls back too
        assert_eq!(schema.category_label(0, 1.0), "1");
    }

    #[test]
    fn test_validate_column_count() {
        let schema = sample_schema();
        assert!(schema.validate(3).is_ok());
        let err = schema.validate(4).unwrap_err();
        assert!(matches!(err, ExplainError::Schema(_)));
    }

    #[test]
    fn test_validate_categorical_index_out_of_range() {
        let schema = FeatureSchema::new(vec!["a", "b"]).with_categorical(&[5]);
        let err = schema.validate(2).unwrap_err();
        assert!(matches!(err, ExplainError::Schema(_)));
    }

    #[test]
    fn test_validate_labels_on_continuous() {
        let schema = FeatureSchema::new(vec!["a", "b"]).with_category_labels(0, vec!["x"]);
        assert!(schema.validate(2).is_err());
    }
}

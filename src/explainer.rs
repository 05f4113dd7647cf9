//! The tabular local-surrogate explainer

use crate::error::{ExplainError, Result};
use crate::explanation::{Explanation, FeatureWeight};
use crate::kernel::{distances_to_query, kernel_weights};
use crate::sampling::perturb;
use crate::schema::FeatureSchema;
use crate::selection::{select_features, SelectionMethod};
use crate::stats::ReferenceStats;
use crate::surrogate::{fit_weighted_ridge, weighted_r2};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tolerance for per-row probability sums in classification mode
const PROB_SUM_TOLERANCE: f64 = 1e-3;

/// Explanation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Predictor returns per-class probabilities summing to 1 per row
    Classification,
    /// Predictor returns one scalar per row
    Regression,
}

/// Opaque batch predictor boundary.
///
/// The explainer never inspects the model; it only needs one pure batch
/// operation mapping perturbed rows to outputs. Classification predictors
/// return an `(n_rows, n_classes)` probability matrix; regression predictors
/// a single column. The explainer invokes this exactly once per explanation,
/// on the full perturbed batch.
pub trait BatchPredictor {
    fn predict_batch(&self, rows: &Array2<f64>) -> Result<Array2<f64>>;
}

impl<F> BatchPredictor for F
where
    F: Fn(&Array2<f64>) -> Result<Array2<f64>>,
{
    fn predict_batch(&self, rows: &Array2<f64>) -> Result<Array2<f64>> {
        self(rows)
    }
}

/// Adapter for regression predictors that return a flat vector of scalars
pub struct RegressionFn<F>(pub F);

impl<F> BatchPredictor for RegressionFn<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>>,
{
    fn predict_batch(&self, rows: &Array2<f64>) -> Result<Array2<f64>> {
        Ok((self.0)(rows)?.insert_axis(Axis(1)))
    }
}

/// Per-call options for [`TabularExplainer::explain_instance_with`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainOptions {
    /// Number of synthetic neighbors to generate
    pub num_samples: usize,
    /// Class column to explain (classification only). `None` means the
    /// predictor's argmax class on the unperturbed query.
    pub class_index: Option<usize>,
    /// Per-call RNG seed; overrides the explainer-level seed
    pub seed: Option<u64>,
    /// How the sparse feature subset is chosen
    pub selection: SelectionMethod,
    /// L2 strength of the surrogate ridge fit
    pub ridge_alpha: f64,
}

impl Default for ExplainOptions {
    fn default() -> Self {
        Self {
            num_samples: 5000,
            class_index: None,
            seed: None,
            selection: SelectionMethod::default(),
            ridge_alpha: 1.0,
        }
    }
}

impl ExplainOptions {
    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    pub fn with_class_index(mut self, class_index: usize) -> Self {
        self.class_index = Some(class_index);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_selection(mut self, selection: SelectionMethod) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_ridge_alpha(mut self, alpha: f64) -> Self {
        self.ridge_alpha = alpha;
        self
    }
}

/// Model-agnostic local explainer for tabular predictors.
///
/// Holds the feature schema and the reference-sample statistics, both
/// read-only after construction; every `explain_instance` call is a pure
/// request/response computation over call-local buffers, so a shared
/// explainer can serve concurrent requests on different query instances.
#[derive(Debug, Clone)]
pub struct TabularExplainer {
    schema: FeatureSchema,
    stats: ReferenceStats,
    mode: Mode,
    class_names: Vec<String>,
    kernel_width: f64,
    seed: Option<u64>,
}

impl TabularExplainer {
    /// Build an explainer for a classification predictor.
    ///
    /// `class_names` orders the predictor's probability columns. Fails with
    /// [`ExplainError::Schema`] if the schema does not match the reference
    /// sample's column count.
    pub fn classification<S: Into<String>>(
        reference: &Array2<f64>,
        schema: FeatureSchema,
        class_names: Vec<S>,
    ) -> Result<Self> {
        if class_names.is_empty() {
            return Err(ExplainError::Schema(
                "classification mode requires at least one class name".to_string(),
            ));
        }
        Self::build(
            reference,
            schema,
            Mode::Classification,
            class_names.into_iter().map(Into::into).collect(),
        )
    }

    /// Build an explainer for a regression predictor
    pub fn regression(reference: &Array2<f64>, schema: FeatureSchema) -> Result<Self> {
        Self::build(reference, schema, Mode::Regression, Vec::new())
    }

    fn build(
        reference: &Array2<f64>,
        schema: FeatureSchema,
        mode: Mode,
        class_names: Vec<String>,
    ) -> Result<Self> {
        schema.validate(reference.ncols())?;
        let stats = ReferenceStats::fit(reference, &schema)?;
        // LIME's default neighborhood scale
        let kernel_width = (schema.len() as f64).sqrt() * 0.75;
        Ok(Self {
            schema,
            stats,
            mode,
            class_names,
            kernel_width,
            seed: None,
        })
    }

    /// Override the kernel width. Larger values give a smoother, more global
    /// explanation; smaller values a more literal, local one. Validated on
    /// the next explanation call.
    pub fn with_kernel_width(mut self, kernel_width: f64) -> Self {
        self.kernel_width = kernel_width;
        self
    }

    /// Fix the RNG seed for every explanation from this explainer
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The explanation mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The feature schema
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Reference-sample statistics
    pub fn stats(&self) -> &ReferenceStats {
        &self.stats
    }

    /// Explain one prediction with default options (5000 neighbors, argmax
    /// class, `Auto` selection)
    pub fn explain_instance<P: BatchPredictor>(
        &self,
        query: &Array1<f64>,
        predictor: &P,
        num_features: usize,
    ) -> Result<Explanation> {
        self.explain_instance_with(query, predictor, num_features, &ExplainOptions::default())
    }

    /// Explain one prediction.
    ///
    /// Generates a perturbed neighborhood around `query`, asks the predictor
    /// for outputs on the whole batch at once, and fits a weighted ridge
    /// surrogate whose `num_features` strongest coefficients become the
    /// explanation. Returns exactly `min(num_features, n_features)` entries.
    pub fn explain_instance_with<P: BatchPredictor>(
        &self,
        query: &Array1<f64>,
        predictor: &P,
        num_features: usize,
        options: &ExplainOptions,
    ) -> Result<Explanation> {
        if num_features == 0 {
            return Err(ExplainError::InvalidParameter {
                name: "num_features".to_string(),
                value: "0".to_string(),
                reason: "at least one feature must be reported".to_string(),
            });
        }
        if !(self.kernel_width > 0.0) {
            return Err(ExplainError::InvalidParameter {
                name: "kernel_width".to_string(),
                value: format!("{}", self.kernel_width),
                reason: "kernel width must be positive".to_string(),
            });
        }
        let k = num_features.min(self.schema.len());

        let mut rng = match options.seed.or(self.seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // 1. Perturbation generation (row 0 is the exact query)
        let set = perturb(query, &self.schema, &self.stats, options.num_samples, &mut rng)?;

        // 2. Distance weighting
        let distances = distances_to_query(&set.data, query, &self.schema, &self.stats);
        let weights = kernel_weights(&distances, self.kernel_width);

        // 3. One batched predictor call for the whole neighborhood
        let outputs = predictor.predict_batch(&set.data)?;
        self.validate_outputs(&outputs, options.num_samples)?;

        let (y, class_label) = match self.mode {
            Mode::Regression => (outputs.column(0).to_owned(), None),
            Mode::Classification => {
                let class = match options.class_index {
                    Some(idx) => {
                        if idx >= self.class_names.len() {
                            return Err(ExplainError::InvalidParameter {
                                name: "class_index".to_string(),
                                value: idx.to_string(),
                                reason: format!(
                                    "predictor has {} classes",
                                    self.class_names.len()
                                ),
                            });
                        }
                        idx
                    }
                    None => argmax(&outputs.row(0).to_owned()),
                };
                (
                    outputs.column(class).to_owned(),
                    Some(self.class_names[class].clone()),
                )
            }
        };

        // 4. Sparse weighted ridge surrogate on the interpretable matrix
        let selected = select_features(
            &set.design,
            &y,
            &weights,
            k,
            options.selection,
            options.ridge_alpha,
        )?;
        let design_sel = set.design.select(Axis(1), &selected);
        let fit = fit_weighted_ridge(&design_sel, &y, &weights, options.ridge_alpha)?;
        let score = weighted_r2(&design_sel, &y, &weights, &fit);
        let local_prediction = fit.predict_row(&design_sel.row(0).to_owned());

        debug!(
            kept = selected.len(),
            score,
            local_prediction,
            "fitted local surrogate"
        );

        // 5. Assemble, strongest feature first
        let mut feature_weights: Vec<FeatureWeight> = selected
            .iter()
            .zip(fit.coefficients.iter())
            .map(|(&idx, &weight)| FeatureWeight {
                feature_index: idx,
                description: self.stats.describe(&self.schema, idx, query[idx]),
                weight,
            })
            .collect();
        feature_weights.sort_by(|a, b| {
            b.weight
                .abs()
                .partial_cmp(&a.weight.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(Explanation {
            class_label,
            feature_weights,
            intercept: fit.intercept,
            score,
            local_prediction,
        })
    }

    fn validate_outputs(&self, outputs: &Array2<f64>, num_samples: usize) -> Result<()> {
        if outputs.nrows() != num_samples {
            return Err(ExplainError::PredictorShape {
                expected: format!("{} rows", num_samples),
                actual: format!("{} rows", outputs.nrows()),
            });
        }
        match self.mode {
            Mode::Regression => {
                if outputs.ncols() != 1 {
                    return Err(ExplainError::PredictorShape {
                        expected: "1 column in regression mode".to_string(),
                        actual: format!("{} columns", outputs.ncols()),
                    });
                }
            }
            Mode::Classification => {
                if outputs.ncols() != self.class_names.len() {
                    return Err(ExplainError::PredictorShape {
                        expected: format!("{} class columns", self.class_names.len()),
                        actual: format!("{} columns", outputs.ncols()),
                    });
                }
                for (i, row) in outputs.rows().into_iter().enumerate() {
                    let sum: f64 = row.sum();
                    if (sum - 1.0).abs() > PROB_SUM_TOLERANCE {
                        return Err(ExplainError::PredictorShape {
                            expected: "probability rows summing to 1".to_string(),
                            actual: format!("row {} sums to {}", i, sum),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn argmax(row: &Array1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn reference() -> Array2<f64> {
        array![
            [1.0, 0.0, 10.0],
            [2.0, 1.0, 20.0],
            [3.0, 1.0, 30.0],
            [4.0, 0.0, 40.0],
            [5.0, 1.0, 50.0],
            [6.0, 0.0, 60.0],
        ]
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec!["a", "flag", "b"]).with_categorical(&[1])
    }

    // Logistic link over a fixed linear score
    fn binary_predictor(rows: &Array2<f64>) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((rows.nrows(), 2));
        for (i, row) in rows.rows().into_iter().enumerate() {
            let score = 0.8 * row[0] - 0.05 * row[2];
            let p = 1.0 / (1.0 + (-score).exp());
            out[[i, 0]] = 1.0 - p;
            out[[i, 1]] = p;
        }
        Ok(out)
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let schema = FeatureSchema::new(vec!["only", "two"]);
        let err = TabularExplainer::regression(&reference(), schema).unwrap_err();
        assert!(matches!(err, ExplainError::Schema(_)));
    }

    #[test]
    fn test_classification_requires_class_names() {
        let err = TabularExplainer::classification(&reference(), schema(), Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, ExplainError::Schema(_)));
    }

    #[test]
    fn test_wrong_class_count_is_shape_error() {
        let explainer =
            TabularExplainer::classification(&reference(), schema(), vec!["0", "1", "2"])
                .unwrap()
                .with_seed(5);
        let err = explainer
            .explain_instance(&array![3.0, 1.0, 30.0], &binary_predictor, 2)
            .unwrap_err();
        assert!(matches!(err, ExplainError::PredictorShape { .. }));
    }

    #[test]
    fn test_probability_rows_must_sum_to_one() {
        let explainer = TabularExplainer::classification(&reference(), schema(), vec!["0", "1"])
            .unwrap()
            .with_seed(5);
        let bad = |rows: &Array2<f64>| -> Result<Array2<f64>> {
            Ok(Array2::from_elem((rows.nrows(), 2), 0.7))
        };
        let err = explainer
            .explain_instance(&array![3.0, 1.0, 30.0], &bad, 2)
            .unwrap_err();
        assert!(matches!(err, ExplainError::PredictorShape { .. }));
    }

    #[test]
    fn test_class_index_out_of_range() {
        let explainer = TabularExplainer::classification(&reference(), schema(), vec!["0", "1"])
            .unwrap()
            .with_seed(5);
        let opts = ExplainOptions::default()
            .with_num_samples(200)
            .with_class_index(4);
        let err = explainer
            .explain_instance_with(&array![3.0, 1.0, 30.0], &binary_predictor, 2, &opts)
            .unwrap_err();
        assert!(matches!(err, ExplainError::InvalidParameter { .. }));
    }

    #[test]
    fn test_zero_num_features_rejected() {
        let explainer = TabularExplainer::regression(&reference(), schema())
            .unwrap()
            .with_seed(5);
        let pred = RegressionFn(|rows: &Array2<f64>| -> Result<Array1<f64>> {
            Ok(rows.map_axis(Axis(1), |r| r[0]))
        });
        let err = explainer
            .explain_instance(&array![3.0, 1.0, 30.0], &pred, 0)
            .unwrap_err();
        assert!(matches!(err, ExplainError::InvalidParameter { .. }));
    }

    #[test]
    fn test_nonpositive_kernel_width_rejected() {
        let explainer = TabularExplainer::regression(&reference(), schema())
            .unwrap()
            .with_kernel_width(0.0)
            .with_seed(5);
        let pred = RegressionFn(|rows: &Array2<f64>| -> Result<Array1<f64>> {
            Ok(rows.map_axis(Axis(1), |r| r[0]))
        });
        let err = explainer
            .explain_instance(&array![3.0, 1.0, 30.0], &pred, 2)
            .unwrap_err();
        assert!(matches!(err, ExplainError::InvalidParameter { .. }));
    }

    #[test]
    fn test_num_features_clamped_to_feature_count() {
        let explainer = TabularExplainer::classification(&reference(), schema(), vec!["0", "1"])
            .unwrap()
            .with_seed(9);
        let opts = ExplainOptions::default().with_num_samples(400);
        let exp = explainer
            .explain_instance_with(&array![3.0, 1.0, 30.0], &binary_predictor, 10, &opts)
            .unwrap();
        assert_eq!(exp.feature_weights.len(), 3);
    }

    #[test]
    fn test_entries_sorted_by_magnitude() {
        let explainer = TabularExplainer::classification(&reference(), schema(), vec!["0", "1"])
            .unwrap()
            .with_seed(9);
        let opts = ExplainOptions::default().with_num_samples(600);
        let exp = explainer
            .explain_instance_with(&array![3.0, 1.0, 30.0], &binary_predictor, 3, &opts)
            .unwrap();
        for pair in exp.feature_weights.windows(2) {
            assert!(pair[0].weight.abs() >= pair[1].weight.abs());
        }
    }

    #[test]
    fn test_explained_class_defaults_to_argmax() {
        let explainer = TabularExplainer::classification(&reference(), schema(), vec!["lo", "hi"])
            .unwrap()
            .with_seed(9);
        let opts = ExplainOptions::default().with_num_samples(300);
        // Query with a strongly positive score -> argmax is class "hi"
        let exp = explainer
            .explain_instance_with(&array![6.0, 1.0, 10.0], &binary_predictor, 2, &opts)
            .unwrap();
        assert_eq!(exp.class_label.as_deref(), Some("hi"));
    }
}

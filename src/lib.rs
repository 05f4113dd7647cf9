//! lime-tabular - Model-agnostic local surrogate explanations
//!
//! This crate explains individual predictions of an opaque tabular model by
//! fitting a sparse, weighted linear surrogate to the model's behavior in the
//! neighborhood of one query instance (the LIME technique):
//!
//! 1. sample synthetic neighbors around the query (Gaussian around the
//!    reference-sample statistics for continuous features, empirical
//!    resampling for categorical ones),
//! 2. weight each neighbor by an exponential kernel over its normalized
//!    distance to the query,
//! 3. ask the predictor for outputs on the whole batch at once,
//! 4. fit a weighted ridge regression and report the strongest coefficients
//!    as human-readable (description, weight) pairs.
//!
//! The predictor is a black box behind [`explainer::BatchPredictor`]; any
//! closure over a fitted model works. Explanations are local approximations
//! and depend on the sampling seed; fix a seed for reproducible output.
//!
//! # Modules
//! - [`schema`] - Feature names, kinds, and categorical vocabularies
//! - [`stats`] - Reference-sample statistics and quartile bin edges
//! - [`sampling`] - Seeded perturbation generation
//! - [`kernel`] - Distance weighting
//! - [`surrogate`] - Weighted ridge fit
//! - [`selection`] - Sparse feature pre-selection
//! - [`explainer`] - The [`explainer::TabularExplainer`] entry point
//! - [`explanation`] - Immutable result type
//! - [`report`] - Static HTML rendering
//!
//! # Example
//!
//! ```
//! use lime_tabular::prelude::*;
//! use ndarray::{array, Array2};
//!
//! let reference = array![
//!     [12.0, 0.0],
//!     [18.5, 1.0],
//!     [25.0, 1.0],
//!     [31.0, 2.0],
//!     [44.0, 0.0],
//! ];
//! let schema = FeatureSchema::new(vec!["fare", "cab_type"]).with_categorical(&[1]);
//!
//! let predictor = |rows: &Array2<f64>| -> Result<Array2<f64>> {
//!     let mut out = Array2::zeros((rows.nrows(), 2));
//!     for (i, row) in rows.rows().into_iter().enumerate() {
//!         let p = 1.0 / (1.0 + (-(row[0] - 25.0) / 10.0).exp());
//!         out[[i, 0]] = 1.0 - p;
//!         out[[i, 1]] = p;
//!     }
//!     Ok(out)
//! };
//!
//! let explainer = TabularExplainer::classification(&reference, schema, vec!["cheap", "pricey"])?
//!     .with_kernel_width(3.0)
//!     .with_seed(42);
//! let explanation = explainer.explain_instance(&array![30.0, 1.0], &predictor, 2)?;
//! assert_eq!(explanation.feature_weights.len(), 2);
//! # Ok::<(), lime_tabular::ExplainError>(())
//! ```

pub mod error;
pub mod explainer;
pub mod explanation;
pub mod kernel;
pub mod report;
pub mod sampling;
pub mod schema;
pub mod selection;
pub mod stats;
pub mod surrogate;

pub use error::{ExplainError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ExplainError, Result};
    pub use crate::explainer::{
        BatchPredictor, ExplainOptions, Mode, RegressionFn, TabularExplainer,
    };
    pub use crate::explanation::{Explanation, FeatureWeight};
    pub use crate::schema::{FeatureKind, FeatureSchema};
    pub use crate::selection::SelectionMethod;
    pub use crate::stats::ReferenceStats;
}

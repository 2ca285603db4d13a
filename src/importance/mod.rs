//! Feature-importance estimators
//!
//! Two complementary rankings over the same output shape:
//! - Mean Decrease Impurity (MDI): in-sample, tree-specific, based on
//!   impurity-reduction bookkeeping inside a fitted ensemble.
//! - Mean Decrease Accuracy (MDA): out-of-sample, model-agnostic, based on
//!   the score lost when a feature's test column is permuted, evaluated on
//!   purged, embargoed folds.

mod mda;
mod mdi;

pub use mda::{MdaOutcome, MeanDecreaseAccuracy};
pub use mdi::{mean_decrease_impurity, ImpurityEnsemble};

use serde::{Deserialize, Serialize};

/// Importance of a single feature: mean and standard error of the mean
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub mean: f64,
    pub std: f64,
}

/// Per-feature importance table, in input feature order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceTable {
    rows: Vec<FeatureImportance>,
}

impl ImportanceTable {
    pub(crate) fn new(rows: Vec<FeatureImportance>) -> Self {
        Self { rows }
    }

    /// Rows in input feature order
    pub fn rows(&self) -> &[FeatureImportance] {
        &self.rows
    }

    /// Look up a feature by name
    pub fn get(&self, feature: &str) -> Option<&FeatureImportance> {
        self.rows.iter().find(|r| r.feature == feature)
    }

    /// Rows sorted by mean importance, descending
    pub fn sorted_by_mean(&self) -> Vec<&FeatureImportance> {
        let mut sorted: Vec<&FeatureImportance> = self.rows.iter().collect();
        sorted.sort_by(|a, b| {
            b.mean
                .partial_cmp(&a.mean)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    /// Sum of the mean column
    pub fn mean_total(&self) -> f64 {
        self.rows.iter().map(|r| r.mean).sum()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Mean and standard error of the mean over `values`, ignoring nothing;
/// callers filter missing entries before calling.
pub(crate) fn mean_and_stderr(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, var.sqrt() / (n as f64).sqrt())
}

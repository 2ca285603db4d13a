//! Classifier trait shared by the concrete model providers

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Trait for classifiers usable with MDA
///
/// Implementations are fitted per fold on an independent clone: callers
/// `clone` the configured model, `reset` it, and `fit` it on that fold's
/// train partition only. `reset` clears fitted state while keeping
/// hyperparameters, so fitted weights never travel across folds.
pub trait Classifier: Send + Sync {
    /// Fit on training data, optionally weighted per sample
    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<()>;

    /// Predict class labels
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Predict class probabilities, columns aligned with `classes()`
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Class labels seen during fit, ascending
    fn classes(&self) -> &[f64];

    /// Clear fitted state, keeping hyperparameters
    fn reset(&mut self);
}

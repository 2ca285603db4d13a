//! Scoring metrics for out-of-sample evaluation
//!
//! MDA compares a baseline score against permuted scores, so the metric is
//! fixed once per run: either weighted accuracy or weighted negative log
//! loss.

use crate::error::{PurgedCvError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const PROBA_CLIP: f64 = 1e-15;

/// Scoring metric for MDA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scoring {
    /// Weighted negative log loss over predicted class probabilities
    NegLogLoss,
    /// Weighted fraction of exact class matches
    Accuracy,
}

impl FromStr for Scoring {
    type Err = PurgedCvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "neg_log_loss" => Ok(Scoring::NegLogLoss),
            "accuracy" => Ok(Scoring::Accuracy),
            other => Err(PurgedCvError::ConfigError(format!(
                "unknown scoring '{}', expected 'neg_log_loss' or 'accuracy'",
                other
            ))),
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scoring::NegLogLoss => write!(f, "neg_log_loss"),
            Scoring::Accuracy => write!(f, "accuracy"),
        }
    }
}

/// Weighted accuracy: sum of weights on exact matches over total weight
pub fn accuracy_score(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
    sample_weight: Option<&Array1<f64>>,
) -> Result<f64> {
    check_same_len(y_true.len(), y_pred.len(), "y_pred")?;
    let weights = resolve_weights(y_true.len(), sample_weight)?;

    let total: f64 = weights.sum();
    if total <= 0.0 {
        return Err(PurgedCvError::ComputationError(
            "sample weights sum to zero".to_string(),
        ));
    }

    let hit: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .zip(weights.iter())
        .filter(|((t, p), _)| (**t - **p).abs() < 1e-10)
        .map(|(_, w)| *w)
        .sum();

    Ok(hit / total)
}

/// Weighted negative log loss
///
/// `proba` columns are aligned with `classes`; probabilities are clipped to
/// `[1e-15, 1 - 1e-15]` before taking logs. A true label absent from
/// `classes` cannot be scored.
pub fn neg_log_loss(
    y_true: &Array1<f64>,
    proba: &Array2<f64>,
    classes: &[f64],
    sample_weight: Option<&Array1<f64>>,
) -> Result<f64> {
    check_same_len(y_true.len(), proba.nrows(), "proba rows")?;
    if proba.ncols() != classes.len() {
        return Err(PurgedCvError::ShapeError {
            expected: format!("{} probability columns", classes.len()),
            actual: format!("{}", proba.ncols()),
        });
    }
    let weights = resolve_weights(y_true.len(), sample_weight)?;

    let total: f64 = weights.sum();
    if total <= 0.0 {
        return Err(PurgedCvError::ComputationError(
            "sample weights sum to zero".to_string(),
        ));
    }

    let mut loss = 0.0;
    for (i, &label) in y_true.iter().enumerate() {
        let class_idx = classes
            .iter()
            .position(|&c| (c - label).abs() < 1e-10)
            .ok_or_else(|| {
                PurgedCvError::ComputationError(format!(
                    "label {} not among the fitted classes",
                    label
                ))
            })?;
        let p = proba[[i, class_idx]].clamp(PROBA_CLIP, 1.0 - PROBA_CLIP);
        loss -= weights[i] * p.ln();
    }

    Ok(-(loss / total))
}

fn check_same_len(expected: usize, actual: usize, what: &str) -> Result<()> {
    if expected != actual {
        return Err(PurgedCvError::ShapeError {
            expected: format!("{} of length {}", what, expected),
            actual: format!("{}", actual),
        });
    }
    Ok(())
}

fn resolve_weights(n: usize, sample_weight: Option<&Array1<f64>>) -> Result<Array1<f64>> {
    match sample_weight {
        Some(w) => {
            check_same_len(n, w.len(), "sample_weight")?;
            Ok(w.clone())
        }
        None => Ok(Array1::ones(n)),
    }
}

//! Mean Decrease Accuracy (MDA)
//!
//! Out-of-sample, model-agnostic importance. For each purged fold, a fresh
//! clone of the classifier is fitted on the train partition and scored on
//! the untouched test partition; each feature's test column is then
//! permuted and the score drop recorded. Complements MDI: it measures what
//! a feature's ordering information is worth to out-of-sample performance.

use crate::cross_validation::{CVSplit, EmbargoMode, PurgedKFold};
use crate::error::{PurgedCvError, Result};
use crate::importance::{mean_and_stderr, FeatureImportance, ImportanceTable};
use crate::metrics::{accuracy_score, neg_log_loss, Scoring};
use crate::training::Classifier;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

const DENOM_EPS: f64 = 1e-12;

/// Outcome of an MDA run
#[derive(Debug, Clone)]
pub struct MdaOutcome {
    /// Per-feature mean and standard error across successful folds
    pub importance: ImportanceTable,
    /// Baseline (unpermuted) score per successful fold, keyed by fold index
    pub baseline_scores: Vec<(usize, f64)>,
    /// Per-fold failures; folds listed here are excluded from aggregation
    pub fold_errors: Vec<PurgedCvError>,
}

/// Mean Decrease Accuracy estimator over purged, embargoed folds
#[derive(Debug, Clone)]
pub struct MeanDecreaseAccuracy {
    n_splits: usize,
    pct_embargo: f64,
    embargo_mode: EmbargoMode,
    scoring: Scoring,
    random_state: Option<u64>,
}

impl MeanDecreaseAccuracy {
    /// Create an estimator with `n_splits` folds, neg-log-loss scoring and
    /// no embargo
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            pct_embargo: 0.0,
            embargo_mode: EmbargoMode::default(),
            scoring: Scoring::NegLogLoss,
            random_state: None,
        }
    }

    /// Set the embargo fraction
    pub fn with_embargo_pct(mut self, pct: f64) -> Self {
        self.pct_embargo = pct;
        self
    }

    /// Set the embargo mode
    pub fn with_embargo_mode(mut self, mode: EmbargoMode) -> Self {
        self.embargo_mode = mode;
        self
    }

    /// Set the scoring metric, fixed for the whole run
    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Set the seed for test-column permutations
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Run MDA for `classifier` over `(x, y)` with label-close times `t1`
    ///
    /// Folds run in parallel, each on an independent clone-and-reset of the
    /// classifier. Per-fold failures (fit or scoring) are collected in
    /// [`MdaOutcome::fold_errors`] keyed by fold index; the run only errors
    /// out as a whole on invalid configuration or when every fold failed.
    pub fn run<C>(
        &self,
        classifier: &C,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
        t1: &Array1<f64>,
        feature_names: &[String],
    ) -> Result<MdaOutcome>
    where
        C: Classifier + Clone,
    {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if t1.len() != n_samples {
            return Err(PurgedCvError::ConfigError(format!(
                "t1 covers {} observations but x has {} rows",
                t1.len(),
                n_samples
            )));
        }
        if y.len() != n_samples {
            return Err(PurgedCvError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if let Some(w) = sample_weight {
            if w.len() != n_samples {
                return Err(PurgedCvError::ShapeError {
                    expected: format!("sample_weight length = {}", n_samples),
                    actual: format!("sample_weight length = {}", w.len()),
                });
            }
        }
        if feature_names.len() != n_features {
            return Err(PurgedCvError::ConfigError(format!(
                "expected {} feature names, got {}",
                n_features,
                feature_names.len()
            )));
        }

        let folds = PurgedKFold::new(self.n_splits)
            .with_embargo_pct(self.pct_embargo)
            .with_embargo_mode(self.embargo_mode)
            .split(t1)?;

        let results: Vec<Result<FoldResult>> = folds
            .par_iter()
            .map(|split| self.evaluate_fold(classifier, x, y, sample_weight, split))
            .collect();

        let mut baseline_scores = Vec::new();
        let mut fold_errors = Vec::new();
        let mut per_fold_imp: Vec<Vec<f64>> = Vec::new();

        for result in results {
            match result {
                Ok(fold) => {
                    baseline_scores.push((fold.fold_idx, fold.baseline));
                    per_fold_imp.push(fold.importances);
                }
                Err(err) => fold_errors.push(err),
            }
        }

        if per_fold_imp.is_empty() {
            // Nothing to aggregate; surface the first fold failure.
            return Err(fold_errors.into_iter().next().unwrap_or_else(|| {
                PurgedCvError::ComputationError("no folds produced".to_string())
            }));
        }

        debug!(
            scoring = %self.scoring,
            folds_ok = per_fold_imp.len(),
            folds_failed = fold_errors.len(),
            "aggregating MDA importances"
        );

        let mut rows = Vec::with_capacity(n_features);
        for (j, name) in feature_names.iter().enumerate() {
            let values: Vec<f64> = per_fold_imp.iter().map(|imp| imp[j]).collect();
            let (mean, std) = mean_and_stderr(&values);
            rows.push(FeatureImportance {
                feature: name.clone(),
                mean,
                std,
            });
        }

        Ok(MdaOutcome {
            importance: ImportanceTable::new(rows),
            baseline_scores,
            fold_errors,
        })
    }

    fn evaluate_fold<C>(
        &self,
        classifier: &C,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
        split: &CVSplit,
    ) -> Result<FoldResult>
    where
        C: Classifier + Clone,
    {
        let fold = split.fold_idx;
        let fold_err = |reason: String| PurgedCvError::FoldFit { fold, reason };

        if split.train_indices.is_empty() {
            return Err(fold_err("empty train partition".to_string()));
        }

        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = gather(y, &split.train_indices);
        let w_train = sample_weight.map(|w| gather(w, &split.train_indices));

        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = gather(y, &split.test_indices);
        let w_test = sample_weight.map(|w| gather(w, &split.test_indices));

        // Clone-and-reset: hyperparameters travel, fitted state never does.
        let mut model = classifier.clone();
        model.reset();
        model
            .fit(&x_train, &y_train, w_train.as_ref())
            .map_err(|e| fold_err(e.to_string()))?;

        let baseline = self
            .score(&model, &x_test, &y_test, w_test.as_ref())
            .map_err(|e| fold_err(e.to_string()))?;

        let base_seed = self.random_state.unwrap_or(42);
        let mut importances = Vec::with_capacity(x.ncols());

        for feature_idx in 0..x.ncols() {
            let seed = base_seed
                .wrapping_add(fold as u64 * 1_000_003)
                .wrapping_add(feature_idx as u64);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            let mut x_perm = x_test.clone();
            let mut column: Vec<f64> = x_perm.column(feature_idx).to_vec();
            column.shuffle(&mut rng);
            for (i, v) in column.into_iter().enumerate() {
                x_perm[[i, feature_idx]] = v;
            }

            let permuted = self
                .score(&model, &x_perm, &y_test, w_test.as_ref())
                .map_err(|e| fold_err(e.to_string()))?;

            importances.push(self.importance_ratio(baseline, permuted));
        }

        Ok(FoldResult {
            fold_idx: fold,
            baseline,
            importances,
        })
    }

    fn score<C>(
        &self,
        model: &C,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<f64>
    where
        C: Classifier,
    {
        match self.scoring {
            Scoring::Accuracy => {
                let pred = model.predict(x)?;
                accuracy_score(y, &pred, sample_weight)
            }
            Scoring::NegLogLoss => {
                let proba = model.predict_proba(x)?;
                neg_log_loss(y, &proba, model.classes(), sample_weight)
            }
        }
    }

    /// Score drop normalized by what was left to lose
    ///
    /// Neg log loss: `(scr0 - scr1) / -scr1`; accuracy:
    /// `(scr0 - scr1) / (1 - scr1)`. A vanishing denominator reads as zero
    /// worth: a permutation that changes nothing must report 0.
    fn importance_ratio(&self, baseline: f64, permuted: f64) -> f64 {
        let numerator = baseline - permuted;
        let denominator = match self.scoring {
            Scoring::NegLogLoss => -permuted,
            Scoring::Accuracy => 1.0 - permuted,
        };
        if denominator.abs() < DENOM_EPS {
            0.0
        } else {
            numerator / denominator
        }
    }
}

struct FoldResult {
    fold_idx: usize,
    baseline: f64,
    importances: Vec<f64>,
}

fn gather(values: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    Array1::from_vec(indices.iter().map(|&i| values[i]).collect())
}

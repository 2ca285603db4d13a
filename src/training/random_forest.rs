//! Random forest classifier
//!
//! Bagged ensemble of weighted CART trees, built in parallel with
//! deterministic per-tree seeds so fits are reproducible.

use crate::error::{PurgedCvError, Result};
use crate::training::decision_tree::{Criterion, DecisionTree};
use crate::training::Classifier;
use ndarray::{Array1, Array2, Axis};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for the number of features each split considers
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

/// Random forest classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Fitted trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features per split
    pub max_features: MaxFeatures,
    /// Bootstrap resampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Base seed for per-tree RNGs
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Classes, ascending
    classes: Vec<f64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    /// Create a forest with `n_estimators` trees
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Enable or disable bootstrap resampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn features_per_split(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    /// Fit the forest to training data
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
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
        if n_samples < self.min_samples_split {
            return Err(PurgedCvError::TrainingError(format!(
                "need at least {} samples, got {}",
                self.min_samples_split, n_samples
            )));
        }

        self.n_features = n_features;

        let mut classes: Vec<f64> = y.iter().copied().collect();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup_by(|a, b| (*a - *b).abs() < 1e-10);
        self.classes = classes;

        let max_features = self.features_per_split(n_features);
        let base_seed = self.random_state.unwrap_or(42);

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_idx: Vec<usize> = if self.bootstrap {
                    (0..n_samples)
                        .map(|_| (rng.next_u64() as usize) % n_samples)
                        .collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_idx);
                let y_boot = Array1::from_vec(sample_idx.iter().map(|&i| y[i]).collect());
                let w_boot = sample_weight
                    .map(|w| Array1::from_vec(sample_idx.iter().map(|&i| w[i]).collect()));

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_criterion(self.criterion)
                    .with_random_state(seed);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit(&x_boot, &y_boot, w_boot.as_ref())?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        debug!(
            n_estimators = self.trees.len(),
            n_samples, n_features, "fitted random forest"
        );

        Ok(self)
    }

    /// Predict class labels (argmax of averaged probabilities)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let predictions: Vec<f64> = (0..proba.nrows())
            .map(|i| {
                let row = proba.row(i);
                let argmax = row
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(idx, _)| idx)
                    .unwrap_or(0);
                self.classes[argmax]
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }

    /// Predict class probabilities averaged over trees
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(PurgedCvError::ModelNotFitted);
        }

        let n_samples = x.nrows();
        let n_classes = self.classes.len();
        let mut proba = Array2::zeros((n_samples, n_classes));

        for tree in &self.trees {
            let tree_proba = tree.predict_proba(x)?;
            // A bootstrap sample can miss classes; map tree columns onto
            // the forest's class set by label value.
            for (tree_col, &class) in tree.classes().iter().enumerate() {
                if let Some(forest_col) = self
                    .classes
                    .iter()
                    .position(|&c| (c - class).abs() < 1e-10)
                {
                    for i in 0..n_samples {
                        proba[[i, forest_col]] += tree_proba[[i, tree_col]];
                    }
                }
            }
        }

        proba /= self.trees.len() as f64;
        Ok(proba)
    }

    /// Fitted trees
    pub fn estimators(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Class labels seen during fit
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Forest-level importances: mean of per-tree importances, normalized
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.trees.is_empty() {
            return None;
        }

        let mut total = Array1::zeros(self.n_features);
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                total = total + imp;
            }
        }
        total /= self.trees.len() as f64;

        let sum = total.sum();
        if sum > 0.0 {
            total /= sum;
        }
        Some(total)
    }
}

impl Classifier for RandomForest {
    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<()> {
        RandomForest::fit(self, x, y, sample_weight)?;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RandomForest::predict(self, x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        RandomForest::predict_proba(self, x)
    }

    fn classes(&self) -> &[f64] {
        RandomForest::classes(self)
    }

    fn reset(&mut self) {
        self.trees.clear();
        self.n_features = 0;
        self.classes.clear();
    }
}

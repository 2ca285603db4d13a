//! Weighted CART classification tree
//!
//! Supports per-sample weights end to end (impurity, leaf distributions)
//! and random per-split feature subsampling, which is what makes a recorded
//! importance of exactly zero mean "never sampled" rather than "useless".

use crate::error::{PurgedCvError, Result};
use crate::training::Classifier;
use ndarray::{Array1, Array2};
use rand::seq::index::sample as sample_indices;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf with a class distribution aligned to the tree's classes
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy
    Entropy,
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (None = all)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for per-split feature subsampling
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Classes, ascending
    classes: Vec<f64>,
    /// Normalized impurity-decrease importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            classes: Vec::new(),
            feature_importances: None,
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

    /// Set features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
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

        let weights: Array1<f64> = match sample_weight {
            Some(w) => w.clone(),
            None => Array1::ones(n_samples),
        };

        let mut importances = vec![0.0; n_features];
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_node(x, y, &weights, &indices, 0, &mut rng, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let class_weights = self.class_weights(y, weights, indices);
        let node_weight: f64 = class_weights.iter().sum();

        let n_present = class_weights.iter().filter(|&&w| w > 0.0).count();
        let should_stop = n_present <= 1
            || indices.len() < self.min_samples_split
            || self.max_depth.map_or(false, |d| depth >= d);

        if should_stop {
            return self.make_leaf(&class_weights, node_weight, indices.len());
        }

        let parent_impurity = self.impurity(&class_weights, node_weight);

        if let Some((feature_idx, threshold, weighted_child_impurity)) =
            self.find_best_split(x, y, weights, indices, &class_weights, node_weight, rng)
        {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, feature_idx]] <= threshold);

            if left_indices.len() < self.min_samples_leaf
                || right_indices.len() < self.min_samples_leaf
            {
                return self.make_leaf(&class_weights, node_weight, indices.len());
            }

            importances[feature_idx] += node_weight * (parent_impurity - weighted_child_impurity);

            let left =
                Box::new(self.build_node(x, y, weights, &left_indices, depth + 1, rng, importances));
            let right =
                Box::new(self.build_node(x, y, weights, &right_indices, depth + 1, rng, importances));

            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                n_samples: indices.len(),
            }
        } else {
            self.make_leaf(&class_weights, node_weight, indices.len())
        }
    }

    /// Best (feature, threshold, weighted child impurity) among a random
    /// subset of features, or None when no split improves on the parent
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: &Array1<f64>,
        indices: &[usize],
        class_weights: &[f64],
        node_weight: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64, f64)> {
        let n_features = self.n_features;
        let k = self.max_features.unwrap_or(n_features).min(n_features).max(1);

        let candidates: Vec<usize> = if k < n_features {
            sample_indices(rng, n_features, k).into_vec()
        } else {
            (0..n_features).collect()
        };

        let parent_impurity = self.impurity(class_weights, node_weight);

        let mut best: Option<(usize, f64, f64)> = None;
        let mut best_gain = 0.0;

        for &feature_idx in &candidates {
            let mut order = indices.to_vec();
            order.sort_by(|&a, &b| {
                x[[a, feature_idx]]
                    .partial_cmp(&x[[b, feature_idx]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_cw = vec![0.0; class_weights.len()];
            let mut right_cw = class_weights.to_vec();
            let mut left_w = 0.0;
            let mut left_n = 0usize;

            for pos in 0..order.len() - 1 {
                let i = order[pos];
                let ci = self.class_index(y[i]);
                left_cw[ci] += weights[i];
                right_cw[ci] -= weights[i];
                left_w += weights[i];
                left_n += 1;

                let v = x[[i, feature_idx]];
                let next = x[[order[pos + 1], feature_idx]];
                if next - v < 1e-12 {
                    continue;
                }
                if left_n < self.min_samples_leaf || order.len() - left_n < self.min_samples_leaf {
                    continue;
                }

                let right_w = node_weight - left_w;
                let weighted = (left_w * self.impurity(&left_cw, left_w)
                    + right_w * self.impurity(&right_cw, right_w))
                    / node_weight;
                let gain = parent_impurity - weighted;

                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature_idx, (v + next) / 2.0, weighted));
                }
            }
        }

        best
    }

    fn make_leaf(&self, class_weights: &[f64], node_weight: f64, n_samples: usize) -> TreeNode {
        let distribution = if node_weight > 0.0 {
            class_weights.iter().map(|&w| w / node_weight).collect()
        } else {
            vec![1.0 / self.classes.len() as f64; self.classes.len()]
        };
        TreeNode::Leaf {
            distribution,
            n_samples,
        }
    }

    fn class_weights(&self, y: &Array1<f64>, weights: &Array1<f64>, indices: &[usize]) -> Vec<f64> {
        let mut cw = vec![0.0; self.classes.len()];
        for &i in indices {
            cw[self.class_index(y[i])] += weights[i];
        }
        cw
    }

    fn class_index(&self, label: f64) -> usize {
        self.classes
            .iter()
            .position(|&c| (c - label).abs() < 1e-10)
            .unwrap_or(0)
    }

    fn impurity(&self, class_weights: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        match self.criterion {
            Criterion::Gini => {
                1.0 - class_weights
                    .iter()
                    .map(|&w| (w / total).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -class_weights
                .iter()
                .filter(|&&w| w > 0.0)
                .map(|&w| {
                    let p = w / total;
                    p * p.ln()
                })
                .sum::<f64>(),
        }
    }

    /// Predict class labels
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

    /// Predict class probabilities from leaf distributions
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(PurgedCvError::ModelNotFitted)?;

        let mut proba = Array2::zeros((x.nrows(), self.classes.len()));
        for i in 0..x.nrows() {
            let sample = x.row(i);
            let distribution = Self::leaf_distribution(root, &sample.to_vec());
            for (j, &p) in distribution.iter().enumerate() {
                proba[[i, j]] = p;
            }
        }
        Ok(proba)
    }

    fn leaf_distribution<'a>(node: &'a TreeNode, sample: &[f64]) -> &'a [f64] {
        match node {
            TreeNode::Leaf { distribution, .. } => distribution,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::leaf_distribution(left, sample)
                } else {
                    Self::leaf_distribution(right, sample)
                }
            }
        }
    }

    /// Per-feature impurity-decrease importances, normalized to sum 1
    ///
    /// A feature the tree never sampled at any split reports exactly 0.
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Class labels seen during fit
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Tree depth
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

impl Classifier for DecisionTree {
    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<()> {
        DecisionTree::fit(self, x, y, sample_weight)?;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTree::predict(self, x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        DecisionTree::predict_proba(self, x)
    }

    fn classes(&self) -> &[f64] {
        DecisionTree::classes(self)
    }

    fn reset(&mut self) {
        self.root = None;
        self.n_features = 0;
        self.classes.clear();
        self.feature_importances = None;
    }
}

//! Purged, embargoed K-fold cross-validation
//!
//! Splits an ordered set of observations whose labels span intervals.
//! Each observation `i` opens at timestamp `t0 = i` and its label closes at
//! `t1[i]`. Training sets are purged of observations whose label interval
//! overlaps the test block, and an embargo buffer after the test block keeps
//! serially correlated neighbors out of training.

use crate::error::{PurgedCvError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single train/test split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// How the post-test embargo extends the training set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbargoMode {
    /// Append only the single observation at `max_t1_idx + embargo`.
    ///
    /// Historical behavior: a scalar is indexed where a slice was likely
    /// intended, so at most one post-embargo observation rejoins training.
    /// Kept as the default until the intended semantics are confirmed; see
    /// [`EmbargoMode::TrailingWindow`] for the full-window variant.
    ScalarTail,
    /// Resume training at `max_t1_idx + embargo` and keep the whole tail,
    /// excluding the full embargo window after the test block's labels
    /// close.
    TrailingWindow,
}

impl Default for EmbargoMode {
    fn default() -> Self {
        EmbargoMode::ScalarTail
    }
}

/// Purged K-fold splitter for interval-labeled observations
///
/// Test blocks are contiguous and taken in temporal order. For each fold,
/// training keeps only observations whose labels close at or before the
/// test block opens, plus (optionally) post-embargo observations after the
/// test block's labels close.
///
/// `split` is a pure function of its arguments: calling it twice with the
/// same `t1` yields identical folds.
#[derive(Debug, Clone)]
pub struct PurgedKFold {
    n_splits: usize,
    pct_embargo: f64,
    embargo_mode: EmbargoMode,
}

impl PurgedKFold {
    /// Create a splitter with `n_splits` folds and no embargo
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            pct_embargo: 0.0,
            embargo_mode: EmbargoMode::default(),
        }
    }

    /// Set the embargo fraction (`floor(n * pct)` observations)
    pub fn with_embargo_pct(mut self, pct: f64) -> Self {
        self.pct_embargo = pct;
        self
    }

    /// Set how the embargo extends the training set
    pub fn with_embargo_mode(mut self, mode: EmbargoMode) -> Self {
        self.embargo_mode = mode;
        self
    }

    /// Number of folds
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate purged train/test splits
    ///
    /// `t1[i]` is the timestamp at which observation `i`'s label closes;
    /// the observation's own timestamp is its position `i`. `t1` must be
    /// non-decreasing (ordered search relies on it) and satisfy
    /// `t1[i] >= i`.
    pub fn split(&self, t1: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n = t1.len();
        self.validate(t1, n)?;

        let embargo = (n as f64 * self.pct_embargo).floor() as usize;
        let fold_size = n / self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);

        for fold_idx in 0..self.n_splits {
            let test_start = fold_idx * fold_size;
            let test_end = if fold_idx == self.n_splits - 1 {
                n
            } else {
                (fold_idx + 1) * fold_size
            };

            let t0 = test_start as f64;

            // Labels that closed at or before the test block opened.
            let mut train_indices: Vec<usize> =
                (0..partition_point(n, |i| t1[i] <= t0)).collect();

            // How far forward the test block's labels extend, as a position
            // in the observation ordering.
            let max_t1 = t1
                .iter()
                .skip(test_start)
                .take(test_end - test_start)
                .fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            let max_t1_idx = partition_point(n, |i| (i as f64) < max_t1);

            match self.embargo_mode {
                EmbargoMode::ScalarTail => {
                    if embargo > 0 && max_t1_idx + embargo < n {
                        train_indices.push(max_t1_idx + embargo);
                    }
                }
                EmbargoMode::TrailingWindow => {
                    let resume = max_t1_idx.saturating_add(embargo);
                    if resume < n {
                        train_indices.extend(resume..n);
                    }
                }
            }

            splits.push(CVSplit {
                train_indices,
                test_indices: (test_start..test_end).collect(),
                fold_idx,
            });
        }

        debug!(
            n_splits = self.n_splits,
            n_samples = n,
            embargo,
            "generated purged folds"
        );

        Ok(splits)
    }

    fn validate(&self, t1: &Array1<f64>, n: usize) -> Result<()> {
        if self.n_splits < 2 {
            return Err(PurgedCvError::ConfigError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.pct_embargo) {
            return Err(PurgedCvError::ConfigError(format!(
                "pct_embargo must be in [0, 1), got {}",
                self.pct_embargo
            )));
        }
        if n < self.n_splits {
            return Err(PurgedCvError::ConfigError(format!(
                "cannot split {} observations into {} folds",
                n, self.n_splits
            )));
        }
        for i in 0..n {
            if t1[i] < i as f64 {
                return Err(PurgedCvError::ConfigError(format!(
                    "t1[{}] = {} closes before the observation opens",
                    i, t1[i]
                )));
            }
            if i > 0 && t1[i] < t1[i - 1] {
                return Err(PurgedCvError::ConfigError(format!(
                    "t1 must be non-decreasing, violated at index {}",
                    i
                )));
            }
        }
        Ok(())
    }
}

/// First position in `0..n` for which `pred` is false; `pred` must be
/// monotone (true prefix, false suffix).
fn partition_point(n: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Labels that close two observations after they open.
    fn spanning_t1(n: usize) -> Array1<f64> {
        Array1::from_iter((0..n).map(|i| i as f64 + 2.0))
    }

    #[test]
    fn test_test_blocks_partition_index_range() {
        let t1 = spanning_t1(23);
        let splits = PurgedKFold::new(4).split(&t1).unwrap();

        assert_eq!(splits.len(), 4);

        let mut all_test: Vec<usize> = splits
            .iter()
            .flat_map(|s| s.test_indices.clone())
            .collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..23).collect::<Vec<_>>());

        // Last block absorbs the remainder.
        assert_eq!(splits[3].test_indices.len(), 5 + 3);
    }

    #[test]
    fn test_no_label_overlap_with_test_block() {
        let t1 = spanning_t1(40);
        let splits = PurgedKFold::new(5)
            .with_embargo_pct(0.05)
            .split(&t1)
            .unwrap();

        for split in &splits {
            let test_start = split.test_indices[0] as f64;
            let max_test_t1 = split
                .test_indices
                .iter()
                .map(|&i| t1[i])
                .fold(f64::NEG_INFINITY, f64::max);

            for &j in &split.train_indices {
                let leaks = t1[j] > test_start && (j as f64) < max_test_t1;
                assert!(!leaks, "train index {} leaks into test block", j);
            }
        }
    }

    #[test]
    fn test_hand_computed_fixture() {
        // N=10, K=2, pct_embargo=0.1 => blocks [0,5) and [5,10), embargo=1.
        let t1 = spanning_t1(10);
        let splits = PurgedKFold::new(2)
            .with_embargo_pct(0.1)
            .split(&t1)
            .unwrap();

        assert_eq!(splits[0].test_indices, (0..5).collect::<Vec<_>>());
        assert_eq!(splits[1].test_indices, (5..10).collect::<Vec<_>>());

        // Fold 0: no label closes at or before t0=0; max test t1 = 6.0 so
        // max_t1_idx = 6, and the scalar embargo appends index 7.
        assert_eq!(splits[0].train_indices, vec![7]);

        // Fold 1: labels 0..=3 close by t0=5; max test t1 = 11.0 runs past
        // the end, so nothing is appended.
        assert_eq!(splits[1].train_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_zero_embargo_never_appends() {
        let t1 = spanning_t1(10);
        let splits = PurgedKFold::new(2).split(&t1).unwrap();

        // Purge only: fold 0 keeps nothing, fold 1 keeps the closed labels.
        assert!(splits[0].train_indices.is_empty());
        assert_eq!(splits[1].train_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_scalar_and_window_embargo_differ() {
        let t1 = spanning_t1(10);
        let scalar = PurgedKFold::new(2)
            .with_embargo_pct(0.1)
            .split(&t1)
            .unwrap();
        let window = PurgedKFold::new(2)
            .with_embargo_pct(0.1)
            .with_embargo_mode(EmbargoMode::TrailingWindow)
            .split(&t1)
            .unwrap();

        // The scalar tail keeps one observation where the window variant
        // keeps the whole post-embargo tail.
        assert_eq!(scalar[0].train_indices, vec![7]);
        assert_eq!(window[0].train_indices, vec![7, 8, 9]);
        assert_ne!(scalar[0], window[0]);
    }

    #[test]
    fn test_split_is_deterministic() {
        let t1 = spanning_t1(31);
        let cv = PurgedKFold::new(3).with_embargo_pct(0.08);

        let first = cv.split(&t1).unwrap();
        let second = cv.split(&t1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_n_splits() {
        let t1 = spanning_t1(10);
        let err = PurgedKFold::new(1).split(&t1).unwrap_err();
        assert!(matches!(err, PurgedCvError::ConfigError(_)));
    }

    #[test]
    fn test_invalid_embargo_pct() {
        let t1 = spanning_t1(10);
        for pct in [1.0, 1.5, -0.1] {
            let err = PurgedKFold::new(2)
                .with_embargo_pct(pct)
                .split(&t1)
                .unwrap_err();
            assert!(matches!(err, PurgedCvError::ConfigError(_)));
        }
    }

    #[test]
    fn test_t1_closing_before_open_rejected() {
        let mut t1 = spanning_t1(10);
        t1[4] = 1.0;
        let err = PurgedKFold::new(2).split(&t1).unwrap_err();
        assert!(matches!(err, PurgedCvError::ConfigError(_)));
    }

    #[test]
    fn test_partition_point() {
        assert_eq!(partition_point(10, |i| i < 4), 4);
        assert_eq!(partition_point(10, |_| false), 0);
        assert_eq!(partition_point(10, |_| true), 10);
    }
}

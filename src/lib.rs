//! Purged, embargoed cross-validation and feature importance for
//! overlapping, time-labeled observations
//!
//! When labels span intervals (observation `i` opens at `t0 = i` and its
//! label closes at `t1[i]`), plain K-fold leaks information: training
//! observations whose label windows overlap the test block see part of the
//! test outcome. This crate provides:
//!
//! - [`PurgedKFold`](cross_validation::PurgedKFold) — contiguous test
//!   blocks with label-interval purging and a post-test embargo buffer.
//! - [`mean_decrease_impurity`](importance::mean_decrease_impurity) — MDI,
//!   in-sample importance from a fitted tree ensemble.
//! - [`MeanDecreaseAccuracy`](importance::MeanDecreaseAccuracy) — MDA,
//!   out-of-sample permutation importance over purged folds, for any
//!   [`Classifier`](training::Classifier).
//!
//! # Modules
//!
//! - [`cross_validation`] - Purged/embargoed K-fold splitter
//! - [`importance`] - MDI and MDA estimators
//! - [`metrics`] - Scoring metrics (accuracy, negative log loss)
//! - [`training`] - Classifier trait, decision tree, random forest
//!
//! # Example
//!
//! ```no_run
//! use ndarray::{Array1, Array2};
//! use purged_cv::prelude::*;
//!
//! # fn main() -> purged_cv::Result<()> {
//! let n = 100;
//! let x = Array2::<f64>::zeros((n, 3));
//! let y = Array1::<f64>::zeros(n);
//! // Each label closes five observations after it opens.
//! let t1 = Array1::from_shape_fn(n, |i| i as f64 + 5.0);
//!
//! let forest = RandomForest::new(50).with_random_state(42);
//! let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
//!
//! let outcome = MeanDecreaseAccuracy::new(5)
//!     .with_embargo_pct(0.01)
//!     .with_scoring(Scoring::Accuracy)
//!     .run(&forest, &x, &y, None, &t1, &names)?;
//!
//! for row in outcome.importance.sorted_by_mean() {
//!     println!("{}: {:.4} +/- {:.4}", row.feature, row.mean, row.std);
//! }
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Core algorithm
pub mod cross_validation;
pub mod importance;

// Supporting stack
pub mod metrics;
pub mod training;

pub use error::{PurgedCvError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PurgedCvError, Result};

    // Splitting
    pub use crate::cross_validation::{CVSplit, EmbargoMode, PurgedKFold};

    // Feature importance
    pub use crate::importance::{
        mean_decrease_impurity, FeatureImportance, ImportanceTable, ImpurityEnsemble, MdaOutcome,
        MeanDecreaseAccuracy,
    };

    // Scoring
    pub use crate::metrics::Scoring;

    // Models
    pub use crate::training::{Classifier, Criterion, DecisionTree, MaxFeatures, RandomForest};
}

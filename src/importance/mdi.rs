//! Mean Decrease Impurity (MDI)
//!
//! In-sample importance from the impurity-reduction bookkeeping of a fitted
//! tree ensemble. Good at separating useful features from pure noise;
//! tree-specific by construction.

use crate::error::{PurgedCvError, Result};
use crate::importance::{mean_and_stderr, FeatureImportance, ImportanceTable};
use crate::training::RandomForest;
use ndarray::Array1;

/// A fitted ensemble whose estimators expose per-feature impurity-decrease
/// contributions
pub trait ImpurityEnsemble {
    /// One importance vector per fitted estimator
    fn estimator_importances(&self) -> Vec<Array1<f64>>;
}

impl ImpurityEnsemble for RandomForest {
    fn estimator_importances(&self) -> Vec<Array1<f64>> {
        self.estimators()
            .iter()
            .filter_map(|tree| tree.feature_importances().cloned())
            .collect()
    }
}

/// Mean Decrease Impurity over a fitted ensemble
///
/// Rows are estimators, columns are features. An importance of exactly zero
/// means the estimator never sampled that feature (per-split feature
/// subsampling), so it is treated as missing rather than as a true zero.
/// Per feature: mean over the estimators that sampled it and the standard
/// error of that mean, then both columns are normalized by the sum of
/// means so the mean column totals 1.
pub fn mean_decrease_impurity<E: ImpurityEnsemble + ?Sized>(
    ensemble: &E,
    feature_names: &[String],
) -> Result<ImportanceTable> {
    let per_estimator = ensemble.estimator_importances();
    if per_estimator.is_empty() {
        return Err(PurgedCvError::ModelNotFitted);
    }

    let n_features = per_estimator[0].len();
    if feature_names.len() != n_features {
        return Err(PurgedCvError::ConfigError(format!(
            "expected {} feature names, got {}",
            n_features,
            feature_names.len()
        )));
    }
    for imp in &per_estimator {
        if imp.len() != n_features {
            return Err(PurgedCvError::ConfigError(
                "estimators disagree on the number of features".to_string(),
            ));
        }
    }

    let mut rows = Vec::with_capacity(n_features);
    for (j, name) in feature_names.iter().enumerate() {
        let sampled: Vec<f64> = per_estimator
            .iter()
            .map(|imp| imp[j])
            .filter(|&v| v != 0.0)
            .collect();
        let (mean, std) = mean_and_stderr(&sampled);
        rows.push(FeatureImportance {
            feature: name.clone(),
            mean,
            std,
        });
    }

    let total: f64 = rows.iter().map(|r| r.mean).sum();
    if total > 0.0 {
        for row in &mut rows {
            row.mean /= total;
            row.std /= total;
        }
    }

    Ok(ImportanceTable::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct FixedEnsemble(Vec<Array1<f64>>);

    impl ImpurityEnsemble for FixedEnsemble {
        fn estimator_importances(&self) -> Vec<Array1<f64>> {
            self.0.clone()
        }
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_means_sum_to_one() {
        let ensemble = FixedEnsemble(vec![
            array![0.7, 0.3, 0.0],
            array![0.5, 0.5, 0.0],
            array![0.0, 0.4, 0.6],
        ]);

        let table = mean_decrease_impurity(&ensemble, &names(3)).unwrap();
        assert!((table.mean_total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_treated_as_unsampled() {
        // f0 is sampled by a single tree: its raw mean is 0.6, not 0.2.
        let ensemble = FixedEnsemble(vec![
            array![0.6, 0.4],
            array![0.0, 1.0],
            array![0.0, 1.0],
        ]);

        let table = mean_decrease_impurity(&ensemble, &names(2)).unwrap();
        let raw_f0 = 0.6;
        let raw_f1 = (0.4 + 1.0 + 1.0) / 3.0;
        let expected_f0 = raw_f0 / (raw_f0 + raw_f1);

        assert!((table.get("f0").unwrap().mean - expected_f0).abs() < 1e-9);
    }

    #[test]
    fn test_feature_never_sampled_reports_zero() {
        let ensemble = FixedEnsemble(vec![array![1.0, 0.0], array![1.0, 0.0]]);

        let table = mean_decrease_impurity(&ensemble, &names(2)).unwrap();
        let row = table.get("f1").unwrap();
        assert_eq!(row.mean, 0.0);
        assert_eq!(row.std, 0.0);
        assert!((table.mean_total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_ensemble_fails() {
        let ensemble = FixedEnsemble(vec![]);
        let err = mean_decrease_impurity(&ensemble, &names(2)).unwrap_err();
        assert!(matches!(err, PurgedCvError::ModelNotFitted));
    }

    #[test]
    fn test_name_count_mismatch_fails() {
        let ensemble = FixedEnsemble(vec![array![0.5, 0.5]]);
        let err = mean_decrease_impurity(&ensemble, &names(3)).unwrap_err();
        assert!(matches!(err, PurgedCvError::ConfigError(_)));
    }

    #[test]
    fn test_fitted_forest_means_sum_to_one() {
        use crate::training::{MaxFeatures, RandomForest};
        use ndarray::{Array1, Array2};

        // Noisy two-class problem where feature 0 carries the signal.
        let n = 40;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => (i / (n / 2)) as f64 + (i % 5) as f64 * 0.01,
            _ => ((i * 7 + j * 13) % 11) as f64 / 11.0,
        });
        let y = Array1::from_shape_fn(n, |i| (i / (n / 2)) as f64);

        let mut rf = RandomForest::new(20)
            .with_max_features(MaxFeatures::Fixed(1))
            .with_random_state(42);
        rf.fit(&x, &y, None).unwrap();

        let table = mean_decrease_impurity(&rf, &names(3)).unwrap();
        assert_eq!(table.len(), 3);
        assert!((table.mean_total() - 1.0).abs() < 1e-9);
    }
}

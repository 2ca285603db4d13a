//! Integration test: purged K-fold splitting end-to-end

use ndarray::Array1;
use purged_cv::prelude::*;

/// Labels that close `span` observations after they open.
fn spanning_t1(n: usize, span: f64) -> Array1<f64> {
    Array1::from_shape_fn(n, |i| i as f64 + span)
}

#[test]
fn test_test_blocks_cover_every_observation_once() {
    for (n, k) in [(20, 2), (30, 3), (47, 5), (100, 10)] {
        let t1 = spanning_t1(n, 3.0);
        let splits = PurgedKFold::new(k).split(&t1).unwrap();

        assert_eq!(splits.len(), k);

        let mut seen = vec![0usize; n];
        for split in &splits {
            for &i in &split.test_indices {
                seen[i] += 1;
            }
        }
        assert!(
            seen.iter().all(|&c| c == 1),
            "test blocks must partition 0..{} exactly (n={}, k={})",
            n,
            n,
            k
        );
    }
}

#[test]
fn test_no_train_label_overlaps_test_window() {
    let n = 80;
    let t1 = spanning_t1(n, 4.0);
    let splits = PurgedKFold::new(4)
        .with_embargo_pct(0.025)
        .split(&t1)
        .unwrap();

    for split in &splits {
        let t0 = split.test_indices[0] as f64;
        let max_test_t1 = split
            .test_indices
            .iter()
            .map(|&i| t1[i])
            .fold(f64::NEG_INFINITY, f64::max);

        for &j in &split.train_indices {
            // A leak is a train observation whose label window starts
            // inside the test block's time range and closes after it opens.
            let leaks = t1[j] > t0 && (j as f64) < max_test_t1;
            assert!(
                !leaks,
                "fold {}: train index {} overlaps the test window",
                split.fold_idx, j
            );
        }
    }
}

#[test]
fn test_train_and_test_are_disjoint() {
    let t1 = spanning_t1(60, 2.0);
    let splits = PurgedKFold::new(5)
        .with_embargo_pct(0.05)
        .split(&t1)
        .unwrap();

    for split in &splits {
        for &j in &split.train_indices {
            assert!(
                !split.test_indices.contains(&j),
                "fold {}: index {} in both partitions",
                split.fold_idx,
                j
            );
        }
    }
}

#[test]
fn test_embargo_modes_agree_everywhere_but_the_tail() {
    let t1 = spanning_t1(60, 2.0);

    let scalar = PurgedKFold::new(3)
        .with_embargo_pct(0.05)
        .split(&t1)
        .unwrap();
    let window = PurgedKFold::new(3)
        .with_embargo_pct(0.05)
        .with_embargo_mode(EmbargoMode::TrailingWindow)
        .split(&t1)
        .unwrap();

    for (s, w) in scalar.iter().zip(window.iter()) {
        assert_eq!(s.test_indices, w.test_indices);
        // Every scalar-tail train index is also kept by the window variant.
        for j in &s.train_indices {
            assert!(w.train_indices.contains(j));
        }
        // The window variant keeps at least as much.
        assert!(w.train_indices.len() >= s.train_indices.len());
    }

    // And for non-final folds it keeps strictly more: the whole tail.
    assert!(window[0].train_indices.len() > scalar[0].train_indices.len());
}

#[test]
fn test_repeated_invocation_is_identical() {
    let t1 = spanning_t1(53, 6.0);
    let cv = PurgedKFold::new(4).with_embargo_pct(0.03);

    assert_eq!(cv.split(&t1).unwrap(), cv.split(&t1).unwrap());
}

#[test]
fn test_bad_configurations_fail_before_splitting() {
    let t1 = spanning_t1(20, 2.0);

    assert!(matches!(
        PurgedKFold::new(1).split(&t1),
        Err(PurgedCvError::ConfigError(_))
    ));
    assert!(matches!(
        PurgedKFold::new(2).with_embargo_pct(1.0).split(&t1),
        Err(PurgedCvError::ConfigError(_))
    ));
    assert!(matches!(
        PurgedKFold::new(25).split(&t1),
        Err(PurgedCvError::ConfigError(_))
    ));
}

//! Integration tests for the transformer contract.
//!
//! Persistence fidelity is the load-bearing property: for any matrix X and
//! kind T, `fit(T, X)` then `transform(X)` must equal
//! `restore(persist(fit(T, X)))` then `transform(X)`, bit for bit.

use ndarray::{Array2, ArrayView2};
use tempfile::TempDir;

use molfeat::testing::{assert_matrices_close, dense_matrix, DEFAULT_TOLERANCE};
use molfeat::transform::CLIP_LIMIT;
use molfeat::{ArtifactError, TransformError, Transformer, TransformerKind};

const ALL_KINDS: [TransformerKind; 6] = [
    TransformerKind::CompletenessFilter,
    TransformerKind::MedianImputer,
    TransformerKind::VarianceFilter,
    TransformerKind::RobustScaler,
    TransformerKind::LinearReducer,
    TransformerKind::EmbeddingReducer,
];

/// Bitwise matrix equality where NaN == NaN (matrices with missing markers
/// can't use `assert_eq!` directly).
fn assert_matrices_identical(a: ArrayView2<f32>, b: ArrayView2<f32>) {
    assert_eq!(a.dim(), b.dim(), "shape mismatch");
    for ((i, j), &va) in a.indexed_iter() {
        let vb = b[[i, j]];
        assert!(
            va == vb || (va.is_nan() && vb.is_nan()),
            "mismatch at ({i}, {j}): {va} vs {vb}"
        );
    }
}

/// A matrix with scattered missing values, none above the drop threshold.
fn matrix_with_missing() -> Array2<f32> {
    let mut x = dense_matrix(20, 6);
    x[[0, 1]] = f32::NAN;
    x[[5, 1]] = f32::NAN;
    x[[3, 4]] = f32::NAN;
    x
}

/// Pick a fit input appropriate for the kind: the column selectors and the
/// imputer see missing values, everything downstream sees a clean matrix.
fn fit_input(kind: TransformerKind) -> Array2<f32> {
    match kind {
        TransformerKind::CompletenessFilter | TransformerKind::MedianImputer => {
            matrix_with_missing()
        }
        _ => dense_matrix(20, 6),
    }
}

#[test]
fn persistence_fidelity_for_every_kind() {
    let dir = TempDir::new().unwrap();

    for kind in ALL_KINDS {
        let x = fit_input(kind);
        let mut fitted = Transformer::new(kind);
        fitted.fit(x.view()).unwrap();
        let direct = fitted.transform(x.view()).unwrap();

        let path = dir.path().join(kind.artifact_file_name());
        fitted.persist(&path).unwrap();
        let restored = Transformer::restore(&path, kind).unwrap();
        assert_eq!(restored.kind(), kind);
        let replayed = restored.transform(x.view()).unwrap();

        assert_matrices_identical(direct.view(), replayed.view());
    }
}

#[test]
fn persistence_fidelity_for_skipped_scaler() {
    let dir = TempDir::new().unwrap();
    let x = dense_matrix(10, 4);

    let mut scaler = Transformer::new(TransformerKind::RobustScaler);
    scaler.set_skip();
    scaler.fit(x.view()).unwrap();

    let path = dir.path().join("robust_scaler.artifact");
    scaler.persist(&path).unwrap();
    let restored = Transformer::restore(&path, TransformerKind::RobustScaler).unwrap();

    // The skip flag survives the roundtrip: output equals input exactly.
    let replayed = restored.transform(x.view()).unwrap();
    assert_eq!(replayed, x);
}

#[test]
fn transform_never_valid_before_fit_or_restore() {
    let x = dense_matrix(5, 3);
    for kind in ALL_KINDS {
        let unfit = Transformer::new(kind);
        assert!(
            matches!(
                unfit.transform(x.view()),
                Err(TransformError::NotFitted { .. })
            ),
            "{kind} transformed without fit"
        );
    }
}

#[test]
fn restore_rejects_other_kinds_artifact() {
    let dir = TempDir::new().unwrap();
    let x = dense_matrix(10, 4);

    let mut imputer = Transformer::new(TransformerKind::MedianImputer);
    imputer.fit(x.view()).unwrap();
    let path = dir.path().join(TransformerKind::MedianImputer.artifact_file_name());
    imputer.persist(&path).unwrap();

    assert!(matches!(
        Transformer::restore(&path, TransformerKind::VarianceFilter),
        Err(ArtifactError::KindMismatch { .. })
    ));
}

#[test]
fn scaling_stays_within_clip_bounds() {
    let mut x = dense_matrix(50, 3);
    x[[10, 1]] = 1_000_000.0;
    x[[11, 2]] = -1_000_000.0;

    let mut scaler = Transformer::new(TransformerKind::RobustScaler);
    scaler.fit(x.view()).unwrap();
    let out = scaler.transform(x.view()).unwrap();

    assert!(out.iter().all(|v| (-CLIP_LIMIT..=CLIP_LIMIT).contains(v)));
    assert_eq!(out[[10, 1]], CLIP_LIMIT);
    assert_eq!(out[[11, 2]], -CLIP_LIMIT);
}

#[test]
fn scaling_matches_hand_computed_center_and_scale() {
    // Column [1, 2, 3, 4, 100]: median 3, interpolated quartiles 2 and 4,
    // so the scale is 2 and the outlier clips at 10.
    let x = Array2::from_shape_vec((5, 1), vec![1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
    let expected = Array2::from_shape_vec((5, 1), vec![-1.0, -0.5, 0.0, 0.5, 10.0]).unwrap();

    let mut scaler = Transformer::new(TransformerKind::RobustScaler);
    scaler.fit(x.view()).unwrap();
    let out = scaler.transform(x.view()).unwrap();

    assert_matrices_close(out.view(), expected.view(), DEFAULT_TOLERANCE);
}

#[test]
fn imputation_leaves_no_missing_values() {
    let x = matrix_with_missing();
    let mut imputer = Transformer::new(TransformerKind::MedianImputer);
    imputer.fit(x.view()).unwrap();
    let out = imputer.transform(x.view()).unwrap();
    assert!(out.iter().all(|v| !v.is_nan()));
    assert_eq!(out.dim(), x.dim());
}

#[test]
fn completeness_filter_never_widens() {
    let x = matrix_with_missing();
    let mut filter = Transformer::new(TransformerKind::CompletenessFilter);
    filter.fit(x.view()).unwrap();
    let out = filter.transform(x.view()).unwrap();
    assert!(out.ncols() <= x.ncols());
    // Nothing here crosses the 80% threshold, so all columns survive.
    assert_eq!(out.ncols(), x.ncols());
}

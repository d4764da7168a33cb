//! Testing utilities for molfeat.
//!
//! Assertion helpers and deterministic fixture builders shared by unit and
//! integration tests.

use approx::AbsDiffEq;
use ndarray::{Array2, ArrayView2};

use crate::data::DescriptorDataset;

/// Default tolerance for floating point comparisons.
pub const DEFAULT_TOLERANCE: f32 = 1e-5;

/// Assert that two matrices are approximately equal element-wise.
///
/// Uses the `approx` crate's absolute-difference comparison; pass
/// [`DEFAULT_TOLERANCE`] unless the test has a reason for a looser bound.
///
/// # Panics
///
/// Panics if the shapes differ or any pair of entries differs by more than
/// `tolerance`.
pub fn assert_matrices_close(actual: ArrayView2<f32>, expected: ArrayView2<f32>, tolerance: f32) {
    assert_eq!(actual.dim(), expected.dim(), "shape mismatch");
    for ((i, j), &a) in actual.indexed_iter() {
        let e = expected[[i, j]];
        assert!(
            a.abs_diff_eq(&e, tolerance),
            "mismatch at row {i}, column {j}: {a} vs {e} (tolerance {tolerance})"
        );
    }
}

/// Assert that no entry of the matrix is NaN or infinite.
///
/// # Panics
///
/// Panics with the offending position on the first non-finite entry.
pub fn assert_all_finite(x: ArrayView2<f32>) {
    for ((i, j), v) in x.indexed_iter() {
        assert!(
            v.is_finite(),
            "non-finite entry {v} at row {i}, column {j}"
        );
    }
}

/// Deterministic dense matrix filler.
///
/// Values cycle through a small pseudo-random-looking range so that every
/// column varies with the row index (no accidental constant columns).
pub fn dense_matrix(n_rows: usize, n_cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((n_rows, n_cols), |(i, j)| {
        ((i * 13 + j * 7) % 23) as f32 * 0.5
    })
}

/// Build a dataset with generated keys (`<prefix>-<i>`) and SMILES-like
/// inputs around a value matrix.
pub fn dataset_around(
    values: Array2<f32>,
    key_prefix: &str,
    sparse: bool,
) -> DescriptorDataset {
    let n = values.nrows();
    let keys = (0..n).map(|i| format!("{key_prefix}-{i}")).collect();
    let inputs = (0..n).map(|i| format!("C{}O", "C".repeat(i % 5 + 1))).collect();
    DescriptorDataset::new(values, keys, inputs, None, sparse)
        .expect("generated bookkeeping is valid")
}

//! Helpers for sample-major feature matrices.
//!
//! # Terminology
//!
//! - **Samples**: compounds / rows
//! - **Features**: descriptor values / columns
//!
//! All matrices in this crate are sample-major: shape `[n_samples, n_features]`
//! with each sample's features contiguous. Missing descriptor values are
//! `f32::NAN`; downstream stages must either tolerate or eliminate them.

use ndarray::{concatenate, Array2, ArrayView1, ArrayView2, Axis, ShapeError};

/// Semantic axis constants for feature matrices.
pub mod axis {
    use ndarray::Axis;

    pub const SAMPLES: Axis = Axis(0);
    pub const FEATURES: Axis = Axis(1);
}

/// Select a subset of columns by index, preserving order.
///
/// # Panics
///
/// Panics if any index is out of bounds.
pub fn select_columns(x: ArrayView2<f32>, indices: &[usize]) -> Array2<f32> {
    x.select(axis::FEATURES, indices)
}

/// Concatenate matrices column-wise.
///
/// All parts must have the same number of rows; a row mismatch surfaces as a
/// [`ShapeError`].
pub fn hstack(parts: &[Array2<f32>]) -> Result<Array2<f32>, ShapeError> {
    let views: Vec<ArrayView2<f32>> = parts.iter().map(|p| p.view()).collect();
    concatenate(axis::FEATURES, &views)
}

/// Count missing (NaN) entries in a column.
#[inline]
pub fn count_missing(column: ArrayView1<f32>) -> usize {
    column.iter().filter(|v| v.is_nan()).count()
}

/// Returns `true` if any entry in the matrix is missing.
pub fn has_missing(x: ArrayView2<f32>) -> bool {
    x.iter().any(|v| v.is_nan())
}

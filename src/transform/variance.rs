//! Variance filter: removes constant (near-zero variance) columns.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{TransformError, TransformerKind};
use crate::data::matrix::{axis, select_columns};

/// Columns with population variance at or below this threshold are dropped.
///
/// Exact zero is the textbook threshold for constant columns; the epsilon
/// absorbs f32 inputs whose f64-accumulated variance leaves rounding dust.
pub const VARIANCE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedVariance {
    retained: Vec<usize>,
    n_input_cols: usize,
}

/// Drops columns whose variance is at or below [`VARIANCE_EPSILON`].
///
/// Expects an already-imputed matrix; a column still containing missing
/// values has undefined variance and is dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VarianceFilter {
    state: Option<FittedVariance>,
}

impl VarianceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identify the columns with non-degenerate variance.
    pub fn fit(&mut self, x: ArrayView2<f32>) -> Result<(), TransformError> {
        let retained: Vec<usize> = x
            .axis_iter(axis::FEATURES)
            .enumerate()
            .filter(|(_, col)| column_variance(col.iter().map(|&v| v as f64)) > VARIANCE_EPSILON)
            .map(|(j, _)| j)
            .collect();

        if retained.is_empty() {
            return Err(TransformError::NoColumnsRetained {
                kind: TransformerKind::VarianceFilter,
                n_cols: x.ncols(),
            });
        }

        if retained.len() < x.ncols() {
            info!(
                dropped = x.ncols() - retained.len(),
                "variance filter removed constant columns"
            );
        }
        self.state = Some(FittedVariance {
            retained,
            n_input_cols: x.ncols(),
        });
        Ok(())
    }

    /// Select the retained columns.
    pub fn transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>, TransformError> {
        let state = self.state.as_ref().ok_or(TransformError::NotFitted {
            kind: TransformerKind::VarianceFilter,
        })?;
        if x.ncols() != state.n_input_cols {
            return Err(TransformError::ColumnCountMismatch {
                kind: TransformerKind::VarianceFilter,
                expected: state.n_input_cols,
                got: x.ncols(),
            });
        }
        Ok(select_columns(x, &state.retained))
    }
}

/// Two-pass population variance in f64.
///
/// Returns NaN for empty input or input containing NaN, which compares false
/// against the retention threshold and drops the column.
fn column_variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count();
    if n == 0 {
        return f64::NAN;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn drops_exactly_the_constant_column() {
        let x = array![
            [1.0, 7.0, 0.5],
            [2.0, 7.0, 0.6],
            [3.0, 7.0, 0.7],
        ];
        let mut filter = VarianceFilter::new();
        filter.fit(x.view()).unwrap();
        let out = filter.transform(x.view()).unwrap();

        assert_eq!(out.ncols(), 2);
        assert_eq!(out.column(0).to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(out.column(1).to_vec(), vec![0.5, 0.6, 0.7]);
    }

    #[test]
    fn all_constant_fails_fast() {
        let x = array![[1.0, 2.0], [1.0, 2.0]];
        let mut filter = VarianceFilter::new();
        assert!(matches!(
            filter.fit(x.view()),
            Err(TransformError::NoColumnsRetained { .. })
        ));
    }

    #[test]
    fn variance_helper() {
        assert!(column_variance([1.0, 1.0, 1.0].into_iter()) <= VARIANCE_EPSILON);
        assert!(column_variance([1.0, 2.0].into_iter()) > VARIANCE_EPSILON);
        assert!(column_variance(std::iter::empty()).is_nan());
    }

    #[test]
    fn transform_before_fit_is_an_error() {
        let filter = VarianceFilter::new();
        assert!(matches!(
            filter.transform(array![[1.0f32]].view()),
            Err(TransformError::NotFitted { .. })
        ));
    }
}

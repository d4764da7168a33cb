//! Completeness filter: drops columns with excessive missing data.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{TransformError, TransformerKind};
use crate::data::matrix::{axis, count_missing, select_columns};

/// Maximum tolerated fraction of missing entries per column.
///
/// A column is retained iff `missing_count <= 0.8 * n_rows`; only columns
/// that are more than 80% missing are dropped. Deliberately permissive:
/// descriptor sources routinely fail on a subset of compounds and the median
/// imputer downstream fills what remains.
pub const MAX_MISSING_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedCompleteness {
    /// Retained column indices, ascending.
    retained: Vec<usize>,
    /// Column count seen at fit time.
    n_input_cols: usize,
}

/// Column selector dropping columns with more than 80% missing values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletenessFilter {
    state: Option<FittedCompleteness>,
}

impl CompletenessFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the retained column index list.
    ///
    /// Fails with [`TransformError::NoColumnsRetained`] when every column is
    /// above the missing-data threshold; an empty matrix would otherwise
    /// propagate silently through the rest of the chain.
    pub fn fit(&mut self, x: ArrayView2<f32>) -> Result<(), TransformError> {
        let max_missing = (MAX_MISSING_FRACTION * x.nrows() as f64) as usize;
        let retained: Vec<usize> = x
            .axis_iter(axis::FEATURES)
            .enumerate()
            .filter(|(_, col)| count_missing(col.view()) <= max_missing)
            .map(|(j, _)| j)
            .collect();

        if retained.is_empty() {
            return Err(TransformError::NoColumnsRetained {
                kind: TransformerKind::CompletenessFilter,
                n_cols: x.ncols(),
            });
        }

        info!(
            original = x.ncols(),
            retained = retained.len(),
            "completeness filtering"
        );
        self.state = Some(FittedCompleteness {
            retained,
            n_input_cols: x.ncols(),
        });
        Ok(())
    }

    /// Select the retained columns.
    pub fn transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>, TransformError> {
        let state = self.state.as_ref().ok_or(TransformError::NotFitted {
            kind: TransformerKind::CompletenessFilter,
        })?;
        if x.ncols() != state.n_input_cols {
            return Err(TransformError::ColumnCountMismatch {
                kind: TransformerKind::CompletenessFilter,
                expected: state.n_input_cols,
                got: x.ncols(),
            });
        }
        Ok(select_columns(x, &state.retained))
    }
}

//! Median imputer: fills missing entries with per-column medians.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{TransformError, TransformerKind};
use crate::data::matrix::axis;

/// Imputed value for columns with no observed entries at all.
const FALLBACK_VALUE: f32 = 0.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedImputer {
    /// One imputation value per column.
    medians: Vec<f32>,
}

/// Replaces every missing entry with its column's median.
///
/// Columns without a single observed value fall back to 0. After `transform`
/// the output matrix contains no missing markers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedianImputer {
    state: Option<FittedImputer>,
}

impl MedianImputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute per-column medians over the non-missing values.
    pub fn fit(&mut self, x: ArrayView2<f32>) -> Result<(), TransformError> {
        let medians = x
            .axis_iter(axis::FEATURES)
            .map(|col| {
                let mut observed: Vec<f64> = col
                    .iter()
                    .filter(|v| !v.is_nan())
                    .map(|&v| v as f64)
                    .collect();
                if observed.is_empty() {
                    FALLBACK_VALUE
                } else {
                    median(&mut observed) as f32
                }
            })
            .collect();
        self.state = Some(FittedImputer { medians });
        Ok(())
    }

    /// Fill missing entries with the stored per-column values.
    pub fn transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>, TransformError> {
        let state = self.state.as_ref().ok_or(TransformError::NotFitted {
            kind: TransformerKind::MedianImputer,
        })?;
        if x.ncols() != state.medians.len() {
            return Err(TransformError::ColumnCountMismatch {
                kind: TransformerKind::MedianImputer,
                expected: state.medians.len(),
                got: x.ncols(),
            });
        }

        let mut out = x.to_owned();
        for (j, mut col) in out.axis_iter_mut(axis::FEATURES).enumerate() {
            let fill = state.medians[j];
            col.mapv_inplace(|v| if v.is_nan() { fill } else { v });
        }
        Ok(out)
    }
}

/// Median with linear interpolation between the two middle values.
///
/// Sorts its input in place. NaNs must be filtered out by the caller.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

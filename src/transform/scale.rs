//! Robust scaler: median/IQR standardization with outlier clipping.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TransformError, TransformerKind};
use crate::data::matrix::axis;

/// Scaled values are clipped to `[-CLIP_LIMIT, CLIP_LIMIT]`.
pub const CLIP_LIMIT: f32 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedScaler {
    /// Per-column median.
    centers: Vec<f32>,
    /// Per-column interquartile range; unit where the IQR is zero.
    scales: Vec<f32>,
}

/// Standardizes each column by its median and interquartile range, then clips
/// to [`CLIP_LIMIT`] to bound outlier influence.
///
/// Sparse sources (binary/count fingerprints) must skip scaling entirely:
/// centering would densify and distort them. The pipeline sets the skip flag
/// from the source's sparsity flag before `fit`/`transform`; a skipped scaler
/// is the identity function and `fit` is a no-op.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RobustScaler {
    skip: bool,
    state: Option<FittedScaler>,
}

impl RobustScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark this scaler as skipped.
    pub fn set_skip(&mut self) {
        self.skip = true;
    }

    /// Whether the scaler passes matrices through unchanged.
    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    /// Compute per-column centers and spreads. No-op when skipped.
    pub fn fit(&mut self, x: ArrayView2<f32>) -> Result<(), TransformError> {
        if self.skip {
            debug!("robust scaler skipped, nothing to fit");
            return Ok(());
        }

        let mut centers = Vec::with_capacity(x.ncols());
        let mut scales = Vec::with_capacity(x.ncols());
        for col in x.axis_iter(axis::FEATURES) {
            let mut sorted: Vec<f64> = col.iter().map(|&v| v as f64).collect();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let center = quantile(&sorted, 0.5);
            let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
            centers.push(center as f32);
            scales.push(if iqr == 0.0 { 1.0 } else { iqr as f32 });
        }

        self.state = Some(FittedScaler { centers, scales });
        Ok(())
    }

    /// Standardize and clip; identity when skipped.
    pub fn transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>, TransformError> {
        if self.skip {
            return Ok(x.to_owned());
        }

        let state = self.state.as_ref().ok_or(TransformError::NotFitted {
            kind: TransformerKind::RobustScaler,
        })?;
        if x.ncols() != state.centers.len() {
            return Err(TransformError::ColumnCountMismatch {
                kind: TransformerKind::RobustScaler,
                expected: state.centers.len(),
                got: x.ncols(),
            });
        }

        let mut out = x.to_owned();
        for (j, mut col) in out.axis_iter_mut(axis::FEATURES).enumerate() {
            let center = state.centers[j];
            let scale = state.scales[j];
            col.mapv_inplace(|v| ((v - center) / scale).clamp(-CLIP_LIMIT, CLIP_LIMIT));
        }
        Ok(out)
    }
}

/// Quantile with linear interpolation over pre-sorted values.
///
/// Returns 0.0 for empty input; matrices reaching the scaler always carry at
/// least one row per column.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.5), 2.5);
        assert_eq!(quantile(&sorted, 0.25), 1.75);
        assert_eq!(quantile(&sorted, 0.0), 1.0);
        assert_eq!(quantile(&sorted, 1.0), 4.0);
    }

    #[test]
    fn clips_extreme_values() {
        let mut x = Array2::<f32>::zeros((20, 1));
        for i in 0..20 {
            x[[i, 0]] = i as f32;
        }
        x[[19, 0]] = 1_000_000.0;

        let mut scaler = RobustScaler::new();
        scaler.fit(x.view()).unwrap();
        let out = scaler.transform(x.view()).unwrap();

        assert!(out.iter().all(|v| (-CLIP_LIMIT..=CLIP_LIMIT).contains(v)));
        assert_eq!(out[[19, 0]], CLIP_LIMIT);
    }

    #[test]
    fn centers_on_the_median() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let mut scaler = RobustScaler::new();
        scaler.fit(x.view()).unwrap();
        let out = scaler.transform(x.view()).unwrap();
        // Median 3, IQR 2: the median row scales to zero.
        assert_eq!(out[[2, 0]], 0.0);
        assert_eq!(out[[4, 0]], 1.0);
    }

    #[test]
    fn zero_iqr_column_uses_unit_scale() {
        // 9 of 10 values identical: IQR is zero but the column is not constant.
        let mut x = Array2::<f32>::from_elem((10, 1), 5.0);
        x[[9, 0]] = 6.0;
        let mut scaler = RobustScaler::new();
        scaler.fit(x.view()).unwrap();
        let out = scaler.transform(x.view()).unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
        assert_eq!(out[[9, 0]], 1.0);
    }

    #[test]
    fn skipped_scaler_is_identity() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let mut scaler = RobustScaler::new();
        scaler.set_skip();
        scaler.fit(x.view()).unwrap();
        let out = scaler.transform(x.view()).unwrap();
        assert_eq!(out, x);
    }

    #[test]
    fn transform_before_fit_is_an_error() {
        let scaler = RobustScaler::new();
        assert!(matches!(
            scaler.transform(array![[1.0f32]].view()),
            Err(TransformError::NotFitted { .. })
        ));
    }
}

//! Dimensionality reducers: linear projection and manifold embedding.
//!
//! Both reducers currently ship as fitted pass-throughs: `fit` computes and
//! persists what the real projection would need (the component count), and
//! `transform` returns its input unchanged. The `fit`/`transform`/`persist`/
//! `restore` contract is the same one the real projections will use, so
//! enabling them is a drop-in change to these two types only.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TransformError, TransformerKind};

/// Upper bound on the number of components the linear reducer may keep.
pub const MAX_COMPONENTS: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedLinear {
    /// `min(MAX_COMPONENTS, n_samples, n_features)` at fit time.
    n_components: usize,
}

/// Variance-preserving linear projection (component analysis).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearReducer {
    state: Option<FittedLinear>,
}

impl LinearReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Determine the output dimensionality.
    pub fn fit(&mut self, x: ArrayView2<f32>) -> Result<(), TransformError> {
        let n_components = MAX_COMPONENTS.min(x.nrows()).min(x.ncols());
        debug!(n_components, "linear reducer fitted");
        self.state = Some(FittedLinear { n_components });
        Ok(())
    }

    /// The component count chosen at fit time, if fitted.
    pub fn n_components(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.n_components)
    }

    /// Apply the projection. Currently the identity.
    pub fn transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>, TransformError> {
        if self.state.is_none() {
            return Err(TransformError::NotFitted {
                kind: TransformerKind::LinearReducer,
            });
        }
        Ok(x.to_owned())
    }
}

/// Nonlinear manifold embedding for low-dimensional inspection.
///
/// Best-effort by policy: the stacked pipeline treats any failure in this
/// reducer as "no embedding produced" instead of aborting the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingReducer {
    fitted: bool,
}

impl EmbeddingReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the embedding. Currently records only that fitting happened.
    pub fn fit(&mut self, _x: ArrayView2<f32>) -> Result<(), TransformError> {
        self.fitted = true;
        Ok(())
    }

    /// Apply the embedding. Currently the identity.
    pub fn transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>, TransformError> {
        if !self.fitted {
            return Err(TransformError::NotFitted {
                kind: TransformerKind::EmbeddingReducer,
            });
        }
        Ok(x.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn component_count_is_capped() {
        let mut reducer = LinearReducer::new();
        reducer.fit(Array2::<f32>::zeros((10, 2000)).view()).unwrap();
        assert_eq!(reducer.n_components(), Some(10));

        reducer.fit(Array2::<f32>::zeros((5000, 2000)).view()).unwrap();
        assert_eq!(reducer.n_components(), Some(MAX_COMPONENTS));
    }

    #[test]
    fn linear_transform_is_identity_for_now() {
        let x = Array2::<f32>::from_shape_fn((4, 3), |(i, j)| (i * 3 + j) as f32);
        let mut reducer = LinearReducer::new();
        reducer.fit(x.view()).unwrap();
        assert_eq!(reducer.transform(x.view()).unwrap(), x);
    }

    #[test]
    fn reducers_require_fit() {
        let x = Array2::<f32>::zeros((2, 2));
        assert!(matches!(
            LinearReducer::new().transform(x.view()),
            Err(TransformError::NotFitted { .. })
        ));
        assert!(matches!(
            EmbeddingReducer::new().transform(x.view()),
            Err(TransformError::NotFitted { .. })
        ));
    }

    #[test]
    fn embedding_transform_after_fit() {
        let x = Array2::<f32>::ones((3, 2));
        let mut reducer = EmbeddingReducer::new();
        reducer.fit(x.view()).unwrap();
        assert_eq!(reducer.transform(x.view()).unwrap(), x);
    }
}

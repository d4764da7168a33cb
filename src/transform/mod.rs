//! Fittable feature transformers.
//!
//! Every transformer follows the same contract: `fit` (Train only),
//! `transform`, `persist`, `restore`. `transform` is only valid after `fit`
//! or `restore`; calling it earlier is a [`TransformError::NotFitted`].
//!
//! Transformers are a closed sum type ([`Transformer`]) dispatched by
//! matching on [`TransformerKind`], and each kind maps to a fixed artifact
//! path segment. Fitted state lives in per-variant `Option<...>` fields so
//! the unfit/fitted distinction is typed rather than conventional.

mod artifact;
mod completeness;
mod impute;
mod reduce;
mod scale;
mod variance;

use std::fmt;
use std::path::Path;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

pub use artifact::ArtifactError;
pub use completeness::{CompletenessFilter, MAX_MISSING_FRACTION};
pub use impute::MedianImputer;
pub use reduce::{EmbeddingReducer, LinearReducer, MAX_COMPONENTS};
pub use scale::{RobustScaler, CLIP_LIMIT};
pub use variance::{VarianceFilter, VARIANCE_EPSILON};

/// Errors raised by transformer `fit`/`transform`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransformError {
    #[error("{kind} used before fit or restore")]
    NotFitted { kind: TransformerKind },

    #[error("{kind} was fitted on {expected} columns, got {got}")]
    ColumnCountMismatch {
        kind: TransformerKind,
        expected: usize,
        got: usize,
    },

    #[error("{kind} retained no columns (input had {n_cols})")]
    NoColumnsRetained {
        kind: TransformerKind,
        n_cols: usize,
    },
}

/// The closed set of transformer kinds.
///
/// Each kind maps deterministically to an artifact path segment; the segment
/// is part of the on-disk contract between Train and Predict runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformerKind {
    CompletenessFilter,
    MedianImputer,
    VarianceFilter,
    RobustScaler,
    LinearReducer,
    EmbeddingReducer,
}

impl TransformerKind {
    /// Fixed path segment used in artifact file names.
    pub const fn path_segment(self) -> &'static str {
        match self {
            TransformerKind::CompletenessFilter => "completeness_filter",
            TransformerKind::MedianImputer => "median_imputer",
            TransformerKind::VarianceFilter => "variance_filter",
            TransformerKind::RobustScaler => "robust_scaler",
            TransformerKind::LinearReducer => "linear_reducer",
            TransformerKind::EmbeddingReducer => "embedding_reducer",
        }
    }

    /// Artifact file name: `<segment>.artifact`.
    pub fn artifact_file_name(self) -> String {
        format!("{}.artifact", self.path_segment())
    }

    /// Header byte identifying the kind in artifact files.
    pub const fn as_u8(self) -> u8 {
        match self {
            TransformerKind::CompletenessFilter => 0,
            TransformerKind::MedianImputer => 1,
            TransformerKind::VarianceFilter => 2,
            TransformerKind::RobustScaler => 3,
            TransformerKind::LinearReducer => 4,
            TransformerKind::EmbeddingReducer => 5,
        }
    }

    /// Convert from a header byte, returning `None` for unknown values.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(TransformerKind::CompletenessFilter),
            1 => Some(TransformerKind::MedianImputer),
            2 => Some(TransformerKind::VarianceFilter),
            3 => Some(TransformerKind::RobustScaler),
            4 => Some(TransformerKind::LinearReducer),
            5 => Some(TransformerKind::EmbeddingReducer),
            _ => None,
        }
    }
}

impl fmt::Display for TransformerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// A stateful transformation unit, one variant per [`TransformerKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Transformer {
    Completeness(CompletenessFilter),
    Imputer(MedianImputer),
    Variance(VarianceFilter),
    Scaler(RobustScaler),
    Linear(LinearReducer),
    Embedding(EmbeddingReducer),
}

impl Transformer {
    /// Construct a fresh (unfit) transformer of the given kind.
    pub fn new(kind: TransformerKind) -> Self {
        match kind {
            TransformerKind::CompletenessFilter => {
                Transformer::Completeness(CompletenessFilter::new())
            }
            TransformerKind::MedianImputer => Transformer::Imputer(MedianImputer::new()),
            TransformerKind::VarianceFilter => Transformer::Variance(VarianceFilter::new()),
            TransformerKind::RobustScaler => Transformer::Scaler(RobustScaler::new()),
            TransformerKind::LinearReducer => Transformer::Linear(LinearReducer::new()),
            TransformerKind::EmbeddingReducer => Transformer::Embedding(EmbeddingReducer::new()),
        }
    }

    /// The kind tag of this transformer.
    pub fn kind(&self) -> TransformerKind {
        match self {
            Transformer::Completeness(_) => TransformerKind::CompletenessFilter,
            Transformer::Imputer(_) => TransformerKind::MedianImputer,
            Transformer::Variance(_) => TransformerKind::VarianceFilter,
            Transformer::Scaler(_) => TransformerKind::RobustScaler,
            Transformer::Linear(_) => TransformerKind::LinearReducer,
            Transformer::Embedding(_) => TransformerKind::EmbeddingReducer,
        }
    }

    /// Force the robust scaler into skip mode. No effect on other kinds.
    ///
    /// Called by the pipeline before `fit`/`transform` when the source matrix
    /// is flagged sparse.
    pub fn set_skip(&mut self) {
        if let Transformer::Scaler(scaler) = self {
            scaler.set_skip();
        }
    }

    /// Fit the transformer on a matrix. Train mode only.
    pub fn fit(&mut self, x: ArrayView2<f32>) -> Result<(), TransformError> {
        match self {
            Transformer::Completeness(t) => t.fit(x),
            Transformer::Imputer(t) => t.fit(x),
            Transformer::Variance(t) => t.fit(x),
            Transformer::Scaler(t) => t.fit(x),
            Transformer::Linear(t) => t.fit(x),
            Transformer::Embedding(t) => t.fit(x),
        }
    }

    /// Apply the fitted transformation, producing a new matrix.
    pub fn transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>, TransformError> {
        match self {
            Transformer::Completeness(t) => t.transform(x),
            Transformer::Imputer(t) => t.transform(x),
            Transformer::Variance(t) => t.transform(x),
            Transformer::Scaler(t) => t.transform(x),
            Transformer::Linear(t) => t.transform(x),
            Transformer::Embedding(t) => t.transform(x),
        }
    }

    /// Persist the fitted state to an artifact file.
    pub fn persist(&self, path: &Path) -> Result<(), ArtifactError> {
        artifact::persist(self, path)
    }

    /// Restore a transformer of the expected kind from an artifact file.
    pub fn restore(path: &Path, expected: TransformerKind) -> Result<Self, ArtifactError> {
        artifact::restore(path, expected)
    }
}

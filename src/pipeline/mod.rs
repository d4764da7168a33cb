//! Transformation pipelines.
//!
//! [`IndividualPipeline`] runs the fixed per-source transformer chain;
//! [`StackedPipeline`] concatenates all per-source outputs and applies the
//! global reduction. Both replay persisted artifacts in Predict mode so a
//! prediction run reproduces the training-time transformation bit-for-bit.

mod individual;
mod stacked;
mod stages;

use std::path::PathBuf;

use crate::data::DatasetError;
use crate::store::StoreError;
use crate::transform::{ArtifactError, TransformError};

pub use individual::IndividualPipeline;
pub use stacked::StackedPipeline;
pub use stages::{RunMode, Stage, StageChain, StageChainError};

/// Errors raised while running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("predict mode requires a trained model root")]
    MissingTrainedRoot,

    #[error("no completed descriptor sources listed in the completion marker")]
    NoSources,

    #[error(
        "sample count mismatch when stacking: source {source_id} has {got} samples, expected {expected}"
    )]
    SampleCountMismatch {
        source_id: String,
        expected: usize,
        got: usize,
    },

    #[error("failed to stack source matrices: {0}")]
    Stack(#[from] ndarray::ShapeError),
}

/// Where a pipeline reads previously-fitted artifacts from.
///
/// Train mode writes artifacts under the run's own root and reads nothing.
/// Predict mode reads from the trained model's root and writes no artifacts.
#[derive(Debug, Clone)]
pub(crate) enum ArtifactSource {
    OwnRoot,
    Trained(PathBuf),
}

impl ArtifactSource {
    pub(crate) fn resolve(
        mode: RunMode,
        trained_root: Option<&PathBuf>,
    ) -> Result<Self, PipelineError> {
        if !mode.is_predict() {
            return Ok(ArtifactSource::OwnRoot);
        }
        trained_root
            .cloned()
            .map(ArtifactSource::Trained)
            .ok_or(PipelineError::MissingTrainedRoot)
    }
}

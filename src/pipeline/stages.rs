//! Run mode and the immutable stage chain.

use crate::transform::TransformerKind;

/// Whether a run fits transformers (Train) or replays persisted ones
/// (Predict). Fixed for an entire run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Train,
    Predict,
}

impl RunMode {
    #[inline]
    pub fn is_predict(self) -> bool {
        matches!(self, RunMode::Predict)
    }
}

/// One stage of a pipeline: which transformer runs, and on whose output.
///
/// `predecessor` is `None` for stages fed by the raw input matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub id: usize,
    pub predecessor: Option<usize>,
    pub kind: TransformerKind,
}

/// Stage chain validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StageChainError {
    #[error("stage chain is empty")]
    Empty,

    #[error("stage ids must increase strictly from 0: stage at position {position} has id {id}")]
    NonContiguousIds { position: usize, id: usize },

    #[error("stage {id} must consume the previous stage's output")]
    BadPredecessor { id: usize },
}

/// An ordered, validated list of pipeline stages.
///
/// Constructed once per run and passed to both pipelines; artifact paths and
/// downstream matrix shapes depend on the chain being identical between Train
/// and Predict runs.
#[derive(Debug, Clone)]
pub struct StageChain {
    stages: Vec<Stage>,
}

impl StageChain {
    /// Validate and wrap a stage list.
    ///
    /// Ids must increase strictly from 0 and each stage must consume its
    /// predecessor's output (stage 0 consumes the raw input).
    pub fn new(stages: Vec<Stage>) -> Result<Self, StageChainError> {
        if stages.is_empty() {
            return Err(StageChainError::Empty);
        }
        for (position, stage) in stages.iter().enumerate() {
            if stage.id != position {
                return Err(StageChainError::NonContiguousIds {
                    position,
                    id: stage.id,
                });
            }
            let expected = position.checked_sub(1);
            if stage.predecessor != expected {
                return Err(StageChainError::BadPredecessor { id: stage.id });
            }
        }
        Ok(Self { stages })
    }

    /// The canonical per-source chain: completeness filter → median imputer →
    /// variance filter → robust scaler → linear reducer.
    pub fn individual() -> Self {
        let kinds = [
            TransformerKind::CompletenessFilter,
            TransformerKind::MedianImputer,
            TransformerKind::VarianceFilter,
            TransformerKind::RobustScaler,
            TransformerKind::LinearReducer,
        ];
        let stages = kinds
            .into_iter()
            .enumerate()
            .map(|(id, kind)| Stage {
                id,
                predecessor: id.checked_sub(1),
                kind,
            })
            .collect();
        // Statically linear; skips re-validation.
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

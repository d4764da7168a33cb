//! molfeat: unsupervised descriptor transformations for molecular property pipelines.
//!
//! This crate turns raw, possibly sparse, possibly high-dimensional descriptor
//! matrices (one per descriptor source) into cleaned, variance-filtered, scaled
//! and dimensionality-reduced feature matrices. The same fitted transformation
//! chain is replayed bit-for-bit at prediction time from persisted artifacts.
//!
//! # Key Types
//!
//! - [`Transformer`] / [`TransformerKind`] - The fittable transformation units
//! - [`IndividualPipeline`] - Per-source chain of transformers
//! - [`StackedPipeline`] - Cross-source concatenation and global reduction
//! - [`DescriptorStore`] - On-disk dataset storage and completion marker
//! - [`RunMode`] - Train (fit + persist) vs Predict (restore + replay)
//!
//! # Pipeline Shape
//!
//! Each descriptor source runs through a fixed chain:
//! completeness filter → median imputer → variance filter → robust scaler →
//! linear reducer. The stacked stage then concatenates all per-source outputs
//! column-wise, applies a second linear reducer, and produces a best-effort
//! low-dimensional embedding for inspection.

pub mod data;
pub mod pipeline;
pub mod store;
pub mod testing;
pub mod transform;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use data::{DatasetError, DescriptorDataset};
pub use pipeline::{
    IndividualPipeline, PipelineError, RunMode, StackedPipeline, Stage, StageChain,
    StageChainError,
};
pub use store::{DescriptorStore, StoreError};
pub use transform::{ArtifactError, TransformError, Transformer, TransformerKind};
pub use utils::Parallelism;

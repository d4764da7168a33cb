//! Cross-source stacked pipeline.

use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use tracing::{info, warn};

use super::stages::RunMode;
use super::{ArtifactSource, PipelineError};
use crate::data::{matrix, DescriptorDataset};
use crate::store::{
    DescriptorStore, GLOBAL_EMBEDDING_FILE_NAME, GLOBAL_UNSUPERVISED_FILE_NAME,
    INDIVIDUAL_UNSUPERVISED_FILE_NAME,
};
use crate::transform::{Transformer, TransformerKind};

/// Combines all per-source representations into one global representation.
///
/// A synchronization barrier over the individual pipelines: every source's
/// "individual unsupervised" output must exist before this runs. Matrices are
/// concatenated column-wise (first source's sample keys and input identifiers
/// become canonical), reduced by a second [`TransformerKind::LinearReducer`],
/// and finally projected by a best-effort [`TransformerKind::EmbeddingReducer`].
/// Only a failure of the embedding fit or transform itself omits the embedding
/// output; a missing or unreadable embedding artifact in Predict mode aborts
/// the run like any other stage.
pub struct StackedPipeline<'a> {
    store: &'a DescriptorStore,
    mode: RunMode,
    trained_root: Option<PathBuf>,
}

impl<'a> StackedPipeline<'a> {
    pub fn new(store: &'a DescriptorStore, mode: RunMode) -> Self {
        Self {
            store,
            mode,
            trained_root: None,
        }
    }

    /// Root of a previously trained model's descriptors directory.
    /// Required in Predict mode.
    pub fn with_trained_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.trained_root = Some(root.into());
        self
    }

    /// Stack, reduce and (best-effort) embed all per-source outputs.
    pub fn run(&self) -> Result<(), PipelineError> {
        let artifacts = ArtifactSource::resolve(self.mode, self.trained_root.as_ref())?;
        let artifact_dir = match &artifacts {
            ArtifactSource::OwnRoot => self.store.root().to_path_buf(),
            ArtifactSource::Trained(root) => root.clone(),
        };

        let sources = self.store.completed_sources()?;
        if sources.is_empty() {
            return Err(PipelineError::NoSources);
        }

        let (combined, keys, inputs) = self.stack_sources(&sources)?;
        info!(
            rows = combined.nrows(),
            cols = combined.ncols(),
            n_sources = sources.len(),
            "stacked sources"
        );

        let reduced = self.apply_stage(
            TransformerKind::LinearReducer,
            combined.view(),
            &artifact_dir,
        )?;
        let global = DescriptorDataset::new(reduced.clone(), keys, inputs, None, false)?;
        let global_path = self.store.root().join(GLOBAL_UNSUPERVISED_FILE_NAME);
        self.store.save(&global_path, &global)?;
        self.store.save_info(&global_path, &global)?;

        // Best-effort covers the embedding math only. Artifact and storage
        // failures still abort the run.
        match self.run_embedding(reduced.view(), &global, &artifact_dir) {
            Ok(()) => {}
            Err(PipelineError::Transform(err)) => {
                warn!(error = %err, "embedding step failed, omitting embedding output");
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    /// Load every source's individual output and concatenate column-wise.
    ///
    /// Row alignment across sources is assumed consistent; the first source's
    /// keys and inputs are adopted as canonical, and only the sample counts
    /// are cross-checked.
    fn stack_sources(
        &self,
        sources: &[String],
    ) -> Result<(Array2<f32>, Vec<String>, Vec<String>), PipelineError> {
        let mut parts: Vec<Array2<f32>> = Vec::with_capacity(sources.len());
        let mut keys: Option<Vec<String>> = None;
        let mut inputs: Option<Vec<String>> = None;
        let mut expected_samples = 0usize;

        for source_id in sources {
            let dataset = self
                .store
                .open(source_id, INDIVIDUAL_UNSUPERVISED_FILE_NAME)?;
            if let Some(ref canonical) = keys {
                if dataset.n_samples() != expected_samples {
                    return Err(PipelineError::SampleCountMismatch {
                        source_id: source_id.clone(),
                        expected: canonical.len(),
                        got: dataset.n_samples(),
                    });
                }
            } else {
                expected_samples = dataset.n_samples();
                keys = Some(dataset.keys().to_vec());
                inputs = Some(dataset.inputs().to_vec());
            }
            let (values, ..) = dataset.into_parts();
            parts.push(values);
        }

        let combined = matrix::hstack(&parts)?;
        // sources is non-empty here, so keys/inputs are set.
        let keys = keys.unwrap_or_default();
        let inputs = inputs.unwrap_or_default();
        Ok((combined, keys, inputs))
    }

    /// Fit+persist (Train) or restore (Predict) one stacked-stage transformer
    /// and apply it.
    fn apply_stage(
        &self,
        kind: TransformerKind,
        x: ArrayView2<f32>,
        artifact_dir: &Path,
    ) -> Result<Array2<f32>, PipelineError> {
        let artifact_path = artifact_dir.join(kind.artifact_file_name());
        let transformer = match self.mode {
            RunMode::Train => {
                let mut t = Transformer::new(kind);
                t.fit(x)?;
                t.persist(&artifact_path)?;
                t
            }
            RunMode::Predict => Transformer::restore(&artifact_path, kind)?,
        };
        Ok(transformer.transform(x)?)
    }

    fn run_embedding(
        &self,
        reduced: ArrayView2<f32>,
        global: &DescriptorDataset,
        artifact_dir: &Path,
    ) -> Result<(), PipelineError> {
        let embedded = self.apply_stage(TransformerKind::EmbeddingReducer, reduced, artifact_dir)?;
        let dataset = global.with_values(embedded);
        let path = self.store.root().join(GLOBAL_EMBEDDING_FILE_NAME);
        self.store.save(&path, &dataset)?;
        self.store.save_info(&path, &dataset)?;
        info!(cols = dataset.n_features(), "embedding output written");
        Ok(())
    }
}

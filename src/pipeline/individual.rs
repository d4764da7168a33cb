//! Per-source transformation pipeline.

use std::path::PathBuf;

use ndarray::Array2;
use tracing::{debug, info};

use super::stages::{RunMode, StageChain};
use super::{ArtifactSource, PipelineError};
use crate::data::DescriptorDataset;
use crate::store::{DescriptorStore, INDIVIDUAL_UNSUPERVISED_FILE_NAME, RAW_FILE_NAME};
use crate::transform::{Transformer, TransformerKind};
use crate::utils::Parallelism;

/// Runs the fixed transformer chain over every completed descriptor source.
///
/// Train mode fits each stage on its input, persists the artifact under
/// `<root>/<source_id>/<kind>.artifact`, then applies it. Predict mode
/// restores the artifact from the trained model root and applies it without
/// refitting. Either way the final matrix is written as the source's
/// "individual unsupervised" output with carried-through sample keys and
/// input identifiers.
///
/// Sources are independent: their artifacts and outputs live under disjoint
/// paths, so the per-source work may run in parallel.
pub struct IndividualPipeline<'a> {
    store: &'a DescriptorStore,
    mode: RunMode,
    chain: StageChain,
    trained_root: Option<PathBuf>,
    parallelism: Parallelism,
}

impl<'a> IndividualPipeline<'a> {
    pub fn new(store: &'a DescriptorStore, mode: RunMode) -> Self {
        Self {
            store,
            mode,
            chain: StageChain::individual(),
            trained_root: None,
            parallelism: Parallelism::Sequential,
        }
    }

    /// Root of a previously trained model's descriptors directory.
    /// Required in Predict mode.
    pub fn with_trained_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.trained_root = Some(root.into());
        self
    }

    /// Allow per-source fan-out onto rayon's thread pool.
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Run the chain over every source in the completion marker.
    ///
    /// Fails on the first error; the embedding-style best-effort policy does
    /// not apply at this level.
    pub fn run(&self) -> Result<(), PipelineError> {
        let artifacts = ArtifactSource::resolve(self.mode, self.trained_root.as_ref())?;
        let sources = self.store.completed_sources()?;
        if sources.is_empty() {
            return Err(PipelineError::NoSources);
        }

        let results = self
            .parallelism
            .maybe_par_map(sources, |source_id| self.run_source(&source_id, &artifacts));
        results.into_iter().collect::<Result<(), _>>()?;
        Ok(())
    }

    fn run_source(
        &self,
        source_id: &str,
        artifacts: &ArtifactSource,
    ) -> Result<(), PipelineError> {
        let dataset = self.store.open(source_id, RAW_FILE_NAME)?;
        info!(
            source = source_id,
            rows = dataset.n_samples(),
            cols = dataset.n_features(),
            sparse = dataset.is_sparse(),
            "individual pipeline start"
        );

        let artifact_dir = match artifacts {
            ArtifactSource::OwnRoot => self.store.source_dir(source_id),
            ArtifactSource::Trained(root) => root.join(source_id),
        };

        let mut current: Array2<f32> = dataset.values().to_owned();
        for stage in self.chain.stages() {
            let artifact_path = artifact_dir.join(stage.kind.artifact_file_name());
            let transformer = match self.mode {
                RunMode::Train => {
                    let mut t = Transformer::new(stage.kind);
                    self.apply_sparse_skip(&mut t, &dataset, source_id);
                    t.fit(current.view())?;
                    t.persist(&artifact_path)?;
                    t
                }
                RunMode::Predict => {
                    let mut t = Transformer::restore(&artifact_path, stage.kind)?;
                    self.apply_sparse_skip(&mut t, &dataset, source_id);
                    t
                }
            };
            current = transformer.transform(current.view())?;
            debug!(
                source = source_id,
                stage = stage.id,
                kind = %stage.kind,
                cols = current.ncols(),
                "stage applied"
            );
        }

        let output = dataset.with_values(current);
        let out_path = self
            .store
            .source_dir(source_id)
            .join(INDIVIDUAL_UNSUPERVISED_FILE_NAME);
        self.store.save(&out_path, &output)?;
        self.store.save_info(&out_path, &output)?;
        info!(
            source = source_id,
            cols = output.n_features(),
            "individual pipeline done"
        );
        Ok(())
    }

    /// The scaler skips sparse sources in both run modes: standard scaling
    /// would densify or distort binary/count fingerprints.
    fn apply_sparse_skip(
        &self,
        transformer: &mut Transformer,
        dataset: &DescriptorDataset,
        source_id: &str,
    ) {
        if transformer.kind() == TransformerKind::RobustScaler && dataset.is_sparse() {
            info!(source = source_id, "skipping scaling of sparse source");
            transformer.set_skip();
        }
    }
}

//! Descriptor store: datasets, sidecars and the completion marker.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::codec::{self, DatasetDecodeError, DatasetEncodeError};
use crate::data::DescriptorDataset;

/// File listing the descriptor sources that completed upstream computation.
pub const COMPLETION_MARKER_FILE: &str = "done_sources.json";

/// Raw per-source matrix as written by the descriptor producers.
pub const RAW_FILE_NAME: &str = "raw.mtx";

/// Per-source output of the individual pipeline.
pub const INDIVIDUAL_UNSUPERVISED_FILE_NAME: &str = "individual_unsupervised.mtx";

/// Global output of the stacked pipeline.
pub const GLOBAL_UNSUPERVISED_FILE_NAME: &str = "global_unsupervised.mtx";

/// Optional low-dimensional embedding of the global output.
pub const GLOBAL_EMBEDDING_FILE_NAME: &str = "global_unsupervised_embedding.mtx";

/// Errors raised by the descriptor store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode dataset: {0}")]
    Encode(#[from] DatasetEncodeError),

    #[error("failed to decode dataset {path}: {source}")]
    Decode {
        path: PathBuf,
        source: DatasetDecodeError,
    },

    #[error("completion marker not found: {path}")]
    MissingMarker { path: PathBuf },

    #[error("invalid completion marker {path}: {source}")]
    InvalidMarker {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write sidecar {path}: {source}")]
    Sidecar {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// JSON sidecar describing a stored dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub n_samples: usize,
    pub n_features: usize,
    pub sparse: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl DatasetInfo {
    fn describe(dataset: &DescriptorDataset) -> Self {
        Self {
            n_samples: dataset.n_samples(),
            n_features: dataset.n_features(),
            sparse: dataset.is_sparse(),
            feature_names: dataset.feature_names().map(|n| n.to_vec()),
        }
    }
}

/// On-disk store for one run's descriptor tree.
///
/// The layout under the root mirrors the artifact path convention:
///
/// ```text
/// <root>/done_sources.json
/// <root>/<source_id>/raw.mtx
/// <root>/<source_id>/<kind>.artifact
/// <root>/<source_id>/individual_unsupervised.mtx (+ .json sidecar)
/// <root>/<kind>.artifact
/// <root>/global_unsupervised.mtx (+ .json sidecar)
/// <root>/global_unsupervised_embedding.mtx
/// ```
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    root: PathBuf,
}

impl DescriptorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The descriptors root directory of this run.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one source's files.
    pub fn source_dir(&self, source_id: &str) -> PathBuf {
        self.root.join(source_id)
    }

    /// Read the completion marker: the ordered list of source ids that
    /// finished upstream computation.
    pub fn completed_sources(&self) -> Result<Vec<String>, StoreError> {
        let path = self.root.join(COMPLETION_MARKER_FILE);
        let raw = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::MissingMarker { path: path.clone() }
            } else {
                StoreError::Io(e)
            }
        })?;
        let sources: Vec<String> = serde_json::from_str(&raw)
            .map_err(|source| StoreError::InvalidMarker { path, source })?;
        debug!(n_sources = sources.len(), "read completion marker");
        Ok(sources)
    }

    /// Open a dataset file belonging to one source.
    pub fn open(&self, source_id: &str, file_name: &str) -> Result<DescriptorDataset, StoreError> {
        self.open_path(&self.source_dir(source_id).join(file_name))
    }

    /// Open a dataset by full path.
    pub fn open_path(&self, path: &Path) -> Result<DescriptorDataset, StoreError> {
        let bytes = fs::read(path)?;
        codec::decode(&bytes).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save a dataset, creating parent directories as needed.
    pub fn save(&self, path: &Path, dataset: &DescriptorDataset) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = codec::encode(dataset)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Write the JSON metadata sidecar next to a dataset file.
    ///
    /// For `<name>.mtx` the sidecar is `<name>.json`.
    pub fn save_info(&self, path: &Path, dataset: &DescriptorDataset) -> Result<(), StoreError> {
        let sidecar = path.with_extension("json");
        let info = DatasetInfo::describe(dataset);
        let json = serde_json::to_string_pretty(&info).map_err(|source| StoreError::Sidecar {
            path: sidecar.clone(),
            source,
        })?;
        fs::write(&sidecar, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    fn dataset() -> DescriptorDataset {
        DescriptorDataset::new(
            array![[1.0, 2.0], [3.0, 4.0]],
            vec!["MOL-0".into(), "MOL-1".into()],
            vec!["CCO".into(), "CCN".into()],
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn save_and_open_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = DescriptorStore::new(dir.path());

        let path = store.source_dir("src-a").join(RAW_FILE_NAME);
        store.save(&path, &dataset()).unwrap();
        let loaded = store.open("src-a", RAW_FILE_NAME).unwrap();
        assert_eq!(loaded.keys(), dataset().keys());
        assert_eq!(loaded.values(), dataset().values());
    }

    #[test]
    fn sidecar_describes_dataset() {
        let dir = TempDir::new().unwrap();
        let store = DescriptorStore::new(dir.path());
        let ds = dataset();

        let path = store.source_dir("src-a").join(INDIVIDUAL_UNSUPERVISED_FILE_NAME);
        store.save(&path, &ds).unwrap();
        store.save_info(&path, &ds).unwrap();

        let sidecar = path.with_extension("json");
        let info: DatasetInfo =
            serde_json::from_str(&fs::read_to_string(sidecar).unwrap()).unwrap();
        assert_eq!(info.n_samples, 2);
        assert_eq!(info.n_features, 2);
        assert!(!info.sparse);
    }

    #[test]
    fn missing_marker_is_a_dedicated_error() {
        let dir = TempDir::new().unwrap();
        let store = DescriptorStore::new(dir.path());
        assert!(matches!(
            store.completed_sources(),
            Err(StoreError::MissingMarker { .. })
        ));
    }

    #[test]
    fn completion_marker_reads_source_list() {
        let dir = TempDir::new().unwrap();
        let store = DescriptorStore::new(dir.path());
        fs::write(
            dir.path().join(COMPLETION_MARKER_FILE),
            r#"["eos-1", "eos-2"]"#,
        )
        .unwrap();
        assert_eq!(store.completed_sources().unwrap(), vec!["eos-1", "eos-2"]);
    }
}

//! Descriptor dataset container.
//!
//! A [`DescriptorDataset`] pairs a feature matrix with the sample bookkeeping
//! that must travel with it through every pipeline stage: ordered unique
//! sample keys, the original input identifiers (e.g. SMILES strings), optional
//! feature names, and the sparsity flag set by the descriptor producer.

use std::collections::BTreeSet;

use ndarray::{Array2, ArrayView2};

/// Dataset construction/validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatasetError {
    #[error("number of keys ({keys}) does not match number of samples ({samples})")]
    KeyCountMismatch { samples: usize, keys: usize },

    #[error("number of inputs ({inputs}) does not match number of samples ({samples})")]
    InputCountMismatch { samples: usize, inputs: usize },

    #[error("number of feature names ({names}) does not match number of features ({features})")]
    FeatureNameCountMismatch { features: usize, names: usize },

    #[error("duplicate sample key: {0}")]
    DuplicateKey(String),
}

/// A descriptor source's feature matrix plus sample bookkeeping.
///
/// # Invariants
///
/// - `keys.len() == inputs.len() == values.nrows()`
/// - keys are unique
/// - `feature_names`, when present, has one entry per column
///
/// The sparsity flag is set by whoever produced the source matrix (binary or
/// count fingerprints) and is never recomputed downstream; it controls whether
/// robust scaling is skipped for the source.
#[derive(Debug, Clone)]
pub struct DescriptorDataset {
    values: Array2<f32>,
    keys: Vec<String>,
    inputs: Vec<String>,
    feature_names: Option<Vec<String>>,
    sparse: bool,
}

impl DescriptorDataset {
    /// Create a dataset, validating bookkeeping lengths and key uniqueness.
    pub fn new(
        values: Array2<f32>,
        keys: Vec<String>,
        inputs: Vec<String>,
        feature_names: Option<Vec<String>>,
        sparse: bool,
    ) -> Result<Self, DatasetError> {
        let n_samples = values.nrows();
        if keys.len() != n_samples {
            return Err(DatasetError::KeyCountMismatch {
                samples: n_samples,
                keys: keys.len(),
            });
        }
        if inputs.len() != n_samples {
            return Err(DatasetError::InputCountMismatch {
                samples: n_samples,
                inputs: inputs.len(),
            });
        }
        if let Some(ref names) = feature_names {
            if names.len() != values.ncols() {
                return Err(DatasetError::FeatureNameCountMismatch {
                    features: values.ncols(),
                    names: names.len(),
                });
            }
        }

        let mut seen = BTreeSet::new();
        for key in &keys {
            if !seen.insert(key.as_str()) {
                return Err(DatasetError::DuplicateKey(key.clone()));
            }
        }

        Ok(Self {
            values,
            keys,
            inputs,
            feature_names,
            sparse,
        })
    }

    /// Replace the value matrix, carrying keys and inputs through.
    ///
    /// Feature names are dropped: transformed columns no longer correspond to
    /// the original descriptors.
    ///
    /// # Panics
    ///
    /// Panics if the new matrix has a different number of rows.
    pub fn with_values(&self, values: Array2<f32>) -> Self {
        assert_eq!(
            values.nrows(),
            self.n_samples(),
            "replacement matrix must keep the sample count"
        );
        Self {
            values,
            keys: self.keys.clone(),
            inputs: self.inputs.clone(),
            feature_names: None,
            sparse: self.sparse,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of samples (rows).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    /// Number of features (columns).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// The feature matrix, sample-major.
    pub fn values(&self) -> ArrayView2<f32> {
        self.values.view()
    }

    /// Ordered unique sample keys.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Original input identifiers, aligned with `keys`.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Feature names, if the source provided them.
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Whether the source flagged this matrix as sparse.
    #[inline]
    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    /// Consume the dataset, returning its parts.
    pub fn into_parts(
        self,
    ) -> (
        Array2<f32>,
        Vec<String>,
        Vec<String>,
        Option<Vec<String>>,
        bool,
    ) {
        (
            self.values,
            self.keys,
            self.inputs,
            self.feature_names,
            self.sparse,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("KEY-{i}")).collect()
    }

    #[test]
    fn new_validates_lengths() {
        let values = array![[1.0, 2.0], [3.0, 4.0]];
        let ds = DescriptorDataset::new(
            values.clone(),
            keys(2),
            vec!["CCO".into(), "CCN".into()],
            None,
            false,
        )
        .unwrap();
        assert_eq!(ds.n_samples(), 2);
        assert_eq!(ds.n_features(), 2);

        let err = DescriptorDataset::new(values, keys(3), vec!["CCO".into()], None, false);
        assert!(matches!(err, Err(DatasetError::KeyCountMismatch { .. })));
    }

    #[test]
    fn new_rejects_duplicate_keys() {
        let values = array![[1.0], [2.0]];
        let err = DescriptorDataset::new(
            values,
            vec!["A".into(), "A".into()],
            vec!["CCO".into(), "CCN".into()],
            None,
            false,
        );
        assert!(matches!(err, Err(DatasetError::DuplicateKey(_))));
    }

    #[test]
    fn with_values_drops_feature_names() {
        let values = array![[1.0, 2.0], [3.0, 4.0]];
        let ds = DescriptorDataset::new(
            values,
            keys(2),
            vec!["CCO".into(), "CCN".into()],
            Some(vec!["d0".into(), "d1".into()]),
            true,
        )
        .unwrap();
        let replaced = ds.with_values(array![[9.0], [8.0]]);
        assert_eq!(replaced.n_features(), 1);
        assert!(replaced.feature_names().is_none());
        assert!(replaced.is_sparse());
        assert_eq!(replaced.keys(), ds.keys());
    }
}

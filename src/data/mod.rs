//! Feature matrix and dataset containers.
//!
//! Matrices are sample-major [`ndarray::Array2<f32>`] with shape
//! `[n_samples, n_features]`. Missing values are represented as `f32::NAN`.

pub mod dataset;
pub mod matrix;

pub use dataset::{DatasetError, DescriptorDataset};
pub use matrix::{axis, count_missing, has_missing, hstack, select_columns};

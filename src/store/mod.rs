//! On-disk storage for descriptor datasets.
//!
//! Datasets are stored in a native binary `.mtx` format (checksummed header +
//! Postcard payload, see [`codec`]) with a JSON metadata sidecar next to each
//! file. The [`DescriptorStore`] also reads the completion marker that lists
//! which descriptor sources finished upstream computation.

mod adapter;
pub mod codec;

pub use adapter::{
    DatasetInfo, DescriptorStore, StoreError, COMPLETION_MARKER_FILE,
    GLOBAL_EMBEDDING_FILE_NAME, GLOBAL_UNSUPERVISED_FILE_NAME,
    INDIVIDUAL_UNSUPERVISED_FILE_NAME, RAW_FILE_NAME,
};
pub use codec::{DatasetDecodeError, DatasetEncodeError, DatasetPayload};

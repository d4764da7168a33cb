//! Native `.mtx` storage format for descriptor datasets.
//!
//! The format consists of a 32-byte header followed by a Postcard-encoded
//! payload:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic ("MFDS")
//! 4       1     Version major
//! 5       1     Version minor
//! 6       2     Flags (bitfield)
//! 8       4     Payload size (bytes)
//! 12      4     CRC32 checksum of payload
//! 16      4     Number of samples
//! 20      4     Number of features
//! 24      8     Reserved
//! ```
//!
//! The payload is a version-tagged enum so new format versions add variants
//! rather than changing existing ones.

use serde::{Deserialize, Serialize};

use crate::data::{DatasetError, DescriptorDataset};
use ndarray::Array2;

/// Magic bytes identifying a molfeat dataset file.
pub const MAGIC: &[u8; 4] = b"MFDS";

/// Current format version (major).
pub const CURRENT_VERSION_MAJOR: u8 = 1;

/// Current format version (minor).
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Bitfield flags for dataset files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatasetFlags(u16);

impl DatasetFlags {
    /// The source flagged the matrix as sparse.
    pub const SPARSE: u16 = 1 << 0;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }
}

/// Errors that can occur when encoding a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetEncodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),
}

/// Errors that can occur when decoding a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetDecodeError {
    #[error("not a molfeat dataset file")]
    NotADataset,

    #[error("dataset requires format {major}.{minor} or later", major = .major, minor = .minor)]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),

    #[error("payload shape mismatch: {samples}x{features} header but {len} values")]
    ShapeMismatch {
        samples: usize,
        features: usize,
        len: usize,
    },

    #[error("invalid dataset payload: {0}")]
    InvalidDataset(#[from] DatasetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Header
// =============================================================================

/// 32-byte header for the dataset format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: DatasetFlags,
    pub payload_size: u32,
    pub checksum: u32,
    pub n_samples: u32,
    pub n_features: u32,
}

impl DatasetHeader {
    /// Create a header with the current version.
    pub fn new(n_samples: u32, n_features: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            flags: DatasetFlags::empty(),
            payload_size: 0,
            checksum: 0,
            n_samples,
            n_features,
        }
    }

    /// Serialize header to 32 bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6..8].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[8..12].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf[16..20].copy_from_slice(&self.n_samples.to_le_bytes());
        buf[20..24].copy_from_slice(&self.n_features.to_le_bytes());
        // Bytes 24..32 reserved.
        buf
    }

    /// Parse header from 32 bytes.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, DatasetDecodeError> {
        if &buf[0..4] != MAGIC {
            return Err(DatasetDecodeError::NotADataset);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(DatasetDecodeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        Ok(Self {
            version_major,
            version_minor,
            flags: DatasetFlags::from_bits(u16::from_le_bytes([buf[6], buf[7]])),
            payload_size: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            checksum: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            n_samples: u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
            n_features: u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
        })
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Version-tagged dataset payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DatasetPayload {
    V1(DatasetPayloadV1),
}

/// Version 1 payload: full dataset contents in row-major order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetPayloadV1 {
    pub keys: Vec<String>,
    pub inputs: Vec<String>,
    pub feature_names: Option<Vec<String>>,
    pub sparse: bool,
    /// Row-major values, length `n_samples * n_features`.
    pub values: Vec<f32>,
}

// =============================================================================
// Encode / Decode
// =============================================================================

/// Serialize a dataset to bytes (header + checksummed payload).
pub fn encode(dataset: &DescriptorDataset) -> Result<Vec<u8>, DatasetEncodeError> {
    let payload = DatasetPayload::V1(DatasetPayloadV1 {
        keys: dataset.keys().to_vec(),
        inputs: dataset.inputs().to_vec(),
        feature_names: dataset.feature_names().map(|n| n.to_vec()),
        sparse: dataset.is_sparse(),
        values: dataset.values().iter().copied().collect(),
    });
    let payload_bytes = postcard::to_allocvec(&payload)?;

    let mut header = DatasetHeader::new(dataset.n_samples() as u32, dataset.n_features() as u32);
    header.payload_size = payload_bytes.len() as u32;
    header.checksum = crc32fast::hash(&payload_bytes);
    if dataset.is_sparse() {
        header.flags.set(DatasetFlags::SPARSE);
    }

    let mut out = Vec::with_capacity(HEADER_SIZE + payload_bytes.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&payload_bytes);
    Ok(out)
}

/// Deserialize a dataset from bytes.
pub fn decode(bytes: &[u8]) -> Result<DescriptorDataset, DatasetDecodeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DatasetDecodeError::Truncated {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        });
    }
    let mut header_buf = [0u8; HEADER_SIZE];
    header_buf.copy_from_slice(&bytes[..HEADER_SIZE]);
    let header = DatasetHeader::from_bytes(&header_buf)?;

    let payload_bytes = &bytes[HEADER_SIZE..];
    let expected = header.payload_size as usize;
    if payload_bytes.len() < expected {
        return Err(DatasetDecodeError::Truncated {
            expected: HEADER_SIZE + expected,
            actual: bytes.len(),
        });
    }
    let payload_bytes = &payload_bytes[..expected];

    let actual_checksum = crc32fast::hash(payload_bytes);
    if actual_checksum != header.checksum {
        return Err(DatasetDecodeError::ChecksumMismatch {
            expected: header.checksum,
            actual: actual_checksum,
        });
    }

    let DatasetPayload::V1(payload) = postcard::from_bytes(payload_bytes)?;

    let n_samples = header.n_samples as usize;
    let n_features = header.n_features as usize;
    let len = payload.values.len();
    let values = Array2::from_shape_vec((n_samples, n_features), payload.values).map_err(|_| {
        DatasetDecodeError::ShapeMismatch {
            samples: n_samples,
            features: n_features,
            len,
        }
    })?;

    Ok(DescriptorDataset::new(
        values,
        payload.keys,
        payload.inputs,
        payload.feature_names,
        payload.sparse,
    )?)
}

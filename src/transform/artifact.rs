//! Artifact files: persisted fitted transformer state.
//!
//! An artifact is a 16-byte header followed by a Postcard-encoded payload:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic ("MFTA")
//! 4       1     Version major
//! 5       1     Version minor
//! 6       1     Transformer kind
//! 7       1     Reserved
//! 8       4     Payload size (bytes)
//! 12      4     CRC32 checksum of payload
//! ```
//!
//! The kind byte lets `restore` reject a mismatched artifact before decoding
//! the payload. Artifacts are written once in Train mode and read-only
//! afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Transformer, TransformerKind};

/// Magic bytes identifying a molfeat transformer artifact.
pub const MAGIC: &[u8; 4] = b"MFTA";

/// Current artifact format version (major).
pub const CURRENT_VERSION_MAJOR: u8 = 1;

/// Current artifact format version (minor).
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the artifact header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Errors that can occur when persisting or restoring an artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// No artifact at the given path. In Predict mode this means the
    /// transformer was never trained (or the trained model root is wrong).
    #[error("artifact not found: {path}")]
    Missing { path: PathBuf },

    #[error("not a molfeat artifact file")]
    NotAnArtifact,

    #[error("artifact requires format {major}.{minor} or later", major = .major, minor = .minor)]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("unknown transformer kind byte {0:#04x}")]
    UnknownKind(u8),

    #[error("artifact kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: TransformerKind,
        found: TransformerKind,
    },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("artifact truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("encoding error: {0}")]
    Encoding(#[source] postcard::Error),

    #[error("decoding error: {0}")]
    Decoding(#[source] postcard::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Version-tagged artifact payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum ArtifactPayload {
    V1(Transformer),
}

/// Serialize a transformer's fitted state to bytes.
pub fn to_bytes(transformer: &Transformer) -> Result<Vec<u8>, ArtifactError> {
    let payload = ArtifactPayload::V1(transformer.clone());
    let payload_bytes = postcard::to_allocvec(&payload).map_err(ArtifactError::Encoding)?;

    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(MAGIC);
    header[4] = CURRENT_VERSION_MAJOR;
    header[5] = CURRENT_VERSION_MINOR;
    header[6] = transformer.kind().as_u8();
    header[8..12].copy_from_slice(&(payload_bytes.len() as u32).to_le_bytes());
    header[12..16].copy_from_slice(&crc32fast::hash(&payload_bytes).to_le_bytes());

    let mut out = Vec::with_capacity(HEADER_SIZE + payload_bytes.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(&payload_bytes);
    Ok(out)
}

/// Deserialize a transformer, checking the kind against `expected`.
pub fn from_bytes(bytes: &[u8], expected: TransformerKind) -> Result<Transformer, ArtifactError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ArtifactError::Truncated {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        });
    }
    if &bytes[0..4] != MAGIC {
        return Err(ArtifactError::NotAnArtifact);
    }
    if bytes[4] > CURRENT_VERSION_MAJOR {
        return Err(ArtifactError::UnsupportedVersion {
            major: bytes[4],
            minor: bytes[5],
        });
    }
    let found = TransformerKind::from_u8(bytes[6]).ok_or(ArtifactError::UnknownKind(bytes[6]))?;
    if found != expected {
        return Err(ArtifactError::KindMismatch { expected, found });
    }

    let payload_size = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let checksum = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let payload_bytes = &bytes[HEADER_SIZE..];
    if payload_bytes.len() < payload_size {
        return Err(ArtifactError::Truncated {
            expected: HEADER_SIZE + payload_size,
            actual: bytes.len(),
        });
    }
    let payload_bytes = &payload_bytes[..payload_size];

    let actual = crc32fast::hash(payload_bytes);
    if actual != checksum {
        return Err(ArtifactError::ChecksumMismatch {
            expected: checksum,
            actual,
        });
    }

    let ArtifactPayload::V1(transformer) =
        postcard::from_bytes(payload_bytes).map_err(ArtifactError::Decoding)?;

    // The kind byte is advisory; the payload tag is authoritative.
    if transformer.kind() != expected {
        return Err(ArtifactError::KindMismatch {
            expected,
            found: transformer.kind(),
        });
    }
    Ok(transformer)
}

/// Write an artifact file, creating parent directories as needed.
pub fn persist(transformer: &Transformer, path: &Path) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = to_bytes(transformer)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Read an artifact file, mapping a missing file to [`ArtifactError::Missing`].
pub fn restore(path: &Path, expected: TransformerKind) -> Result<Transformer, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Io(e)
        }
    })?;
    from_bytes(&bytes, expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    fn fitted_scaler() -> Transformer {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let mut t = Transformer::new(TransformerKind::RobustScaler);
        t.fit(x.view()).unwrap();
        t
    }

    #[test]
    fn roundtrip_preserves_transform_output() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let t = fitted_scaler();

        let bytes = to_bytes(&t).unwrap();
        let restored = from_bytes(&bytes, TransformerKind::RobustScaler).unwrap();

        assert_eq!(
            t.transform(x.view()).unwrap(),
            restored.transform(x.view()).unwrap()
        );
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let bytes = to_bytes(&fitted_scaler()).unwrap();
        assert!(matches!(
            from_bytes(&bytes, TransformerKind::MedianImputer),
            Err(ArtifactError::KindMismatch { .. })
        ));
    }

    #[test]
    fn corrupt_payload_is_rejected() {
        let mut bytes = to_bytes(&fitted_scaler()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            from_bytes(&bytes, TransformerKind::RobustScaler),
            Err(ArtifactError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes = to_bytes(&fitted_scaler()).unwrap();
        bytes[0] = b'Z';
        assert!(matches!(
            from_bytes(&bytes, TransformerKind::RobustScaler),
            Err(ArtifactError::NotAnArtifact)
        ));
    }

    #[test]
    fn missing_file_is_a_dedicated_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("robust_scaler.artifact");
        assert!(matches!(
            restore(&path, TransformerKind::RobustScaler),
            Err(ArtifactError::Missing { .. })
        ));
    }

    #[test]
    fn persist_then_restore_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir
            .path()
            .join(TransformerKind::RobustScaler.artifact_file_name());
        let t = fitted_scaler();
        persist(&t, &path).unwrap();

        let restored = restore(&path, TransformerKind::RobustScaler).unwrap();
        let x = array![[0.0, 0.0], [5.0, 50.0]];
        assert_eq!(
            t.transform(x.view()).unwrap(),
            restored.transform(x.view()).unwrap()
        );
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::StorageError;
use crate::models::recording_result::RecordingMetadata;

/// Path of the JSON sidecar for `recording_path`: `{stem}.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), StorageError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(&path, json).map_err(|source| StorageError::Io { path, source })?;
    Ok(())
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, StorageError> {
    let path = metadata_path(recording_path);
    let json = fs::read_to_string(&path).map_err(|source| StorageError::Io { path, source })?;
    Ok(serde_json::from_str(&json)?)
}

/// SHA-256 hex digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex_encode(&Sha256::digest(bytes))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sidecar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("recording_1700000000.wav");
        let meta = RecordingMetadata::new_mono(44100, 441000, 441000, &recording.to_string_lossy(), "ab");

        write_metadata(&meta, &recording).unwrap();
        assert!(dir.path().join("recording_1700000000.metadata.json").exists());
        assert_eq!(read_metadata(&recording).unwrap(), meta);
    }

    #[test]
    fn missing_sidecar_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_metadata(&dir.path().join("nope.wav")).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}

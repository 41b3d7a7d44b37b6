//! Directory of saved recordings: naming, listing, deletion and age-based pruning.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};

use crate::models::config::{BufferSettings, StorageLocation};
use crate::models::error::StorageError;
use crate::storage::file_sink::write_atomically;
use crate::storage::metadata::metadata_path;
use crate::traits::file_sink::FileSink;

/// Extensions treated as recordings when listing the directory.
pub const RECORDING_EXTENSIONS: [&str; 3] = ["mov", "m4a", "wav"];

/// Owns the storage directory and its retention policy.
///
/// The rolling buffer never holds one of these; it is handed in as a
/// [`FileSink`] at export time.
#[derive(Debug, Clone)]
pub struct RecordingStore {
    directory: PathBuf,
    auto_delete_days: u32,
}

impl RecordingStore {
    pub fn new(directory: impl Into<PathBuf>, auto_delete_days: u32) -> Self {
        Self {
            directory: directory.into(),
            auto_delete_days,
        }
    }

    /// Resolve a [`StorageLocation`] to a concrete directory.
    pub fn for_location(location: StorageLocation, auto_delete_days: u32) -> Result<Self, StorageError> {
        let directory = match location {
            StorageLocation::Temporary => std::env::temp_dir(),
            StorageLocation::Documents => dirs::document_dir()
                .ok_or_else(|| StorageError::DirectoryUnavailable("no documents directory for this user".into()))?,
        };
        Ok(Self::new(directory, auto_delete_days))
    }

    pub fn from_settings(settings: &BufferSettings) -> Result<Self, StorageError> {
        Self::for_location(settings.storage_location, settings.auto_delete_days)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn auto_delete_days(&self) -> u32 {
        self.auto_delete_days
    }

    pub fn set_auto_delete_days(&mut self, days: u32) {
        self.auto_delete_days = days;
    }

    /// Reserve a fresh path named `recording_<unix-seconds>.<extension>`.
    ///
    /// See [`recording_path_at`](Self::recording_path_at).
    pub fn create_recording_path(&self, extension: &str) -> Result<PathBuf, StorageError> {
        self.recording_path_at(extension, Utc::now())
    }

    /// Reserve a recording path for a given instant, appending `_<n>` when
    /// that name is already taken.
    ///
    /// The name is claimed by creating an empty file with `create_new`, so
    /// two saves in the same second never get the same path. The export
    /// later replaces the placeholder. Creates the directory if missing.
    pub fn recording_path_at(&self, extension: &str, at: DateTime<Utc>) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.directory).map_err(|source| StorageError::Io {
            path: self.directory.clone(),
            source,
        })?;

        let stem = format!("recording_{}", at.timestamp());
        let mut n = 0u32;
        loop {
            let name = if n == 0 {
                format!("{stem}.{extension}")
            } else {
                format!("{stem}_{n}.{extension}")
            };
            let path = self.directory.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    log::debug!("reserved recording path {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(source) => return Err(StorageError::Io { path, source }),
            }
        }
    }

    /// Recordings in the directory, newest first. Hidden files are skipped.
    /// A directory that does not exist yet holds no recordings.
    pub fn list_recordings(&self) -> Result<Vec<PathBuf>, StorageError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.directory.clone(),
                    source,
                })
            }
        };

        let mut recordings: Vec<(PathBuf, SystemTime)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::Io {
                path: self.directory.clone(),
                source,
            })?;
            let path = entry.path();
            if !is_recording(&path) {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            recordings.push((path, modified));
        }

        recordings.sort_by(|a, b| b.1.cmp(&a.1));
        log::debug!("found {} recordings in {}", recordings.len(), self.directory.display());
        Ok(recordings.into_iter().map(|(path, _)| path).collect())
    }

    /// Delete a recording and its metadata sidecar.
    ///
    /// Returns `false` if the recording did not exist.
    pub fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("recording already gone: {}", path.display());
                return Ok(false);
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }

        let sidecar = metadata_path(path);
        if let Err(e) = fs::remove_file(&sidecar) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("failed to remove {}: {}", sidecar.display(), e);
            }
        }

        log::info!("deleted recording {}", path.display());
        Ok(true)
    }

    /// Delete recordings last modified more than `auto_delete_days` before `now`.
    ///
    /// Returns the deleted paths. Does nothing when `auto_delete_days` is 0.
    pub fn prune_if_needed(&self, now: DateTime<Utc>) -> Result<Vec<PathBuf>, StorageError> {
        if self.auto_delete_days == 0 {
            return Ok(Vec::new());
        }
        let cutoff = now - Duration::days(self.auto_delete_days as i64);

        let mut deleted = Vec::new();
        for path in self.list_recordings()? {
            let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(_) => continue,
            };
            if modified < cutoff && self.delete(&path)? {
                deleted.push(path);
            }
        }

        if !deleted.is_empty() {
            log::info!(
                "pruned {} recordings older than {} days",
                deleted.len(),
                self.auto_delete_days
            );
        }
        Ok(deleted)
    }

    /// Total size in bytes of all listed recordings.
    pub fn storage_usage(&self) -> Result<u64, StorageError> {
        let mut total = 0;
        for path in self.list_recordings()? {
            if let Ok(meta) = fs::metadata(&path) {
                total += meta.len();
            }
        }
        Ok(total)
    }
}

impl FileSink for RecordingStore {
    fn write(&self, bytes: &[u8], path: &Path) -> io::Result<()> {
        fs::create_dir_all(&self.directory)?;
        write_atomically(bytes, path)
    }
}

fn is_recording(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'));
    if hidden {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| RECORDING_EXTENSIONS.iter().any(|r| e.eq_ignore_ascii_case(r)))
        .unwrap_or(false)
}

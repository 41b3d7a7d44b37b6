use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::traits::capture_source::SubscriptionHandle;

/// Rejected buffer (re)configuration. No state is changed when returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("buffer duration {requested}s is outside {min}..={max}s")]
    DurationOutOfRange { requested: u32, min: u32, max: u32 },

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("buffer is active; stop it before reconfiguring")]
    BufferActive,
}

/// A `write()` that was refused. The buffer is left untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    #[error("buffer is not active")]
    Inactive,

    #[error("buffer is being reconfigured")]
    Reconfiguring,
}

/// Failure while saving the buffered window to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("snapshot of {0} bytes does not fit in a WAV data chunk")]
    TooLarge(u64),

    #[error("export worker failed: {0}")]
    Worker(String),
    #[error("could not reserve a recording path: {0}")]
    Storage(#[from] StorageError),
}

/// Errors reported by a capture source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("stream failed: {0}")]
    StreamFailed(String),

    #[error("unknown subscription {0:?}")]
    UnknownSubscription(SubscriptionHandle),
}

/// Recording directory failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("storage I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("metadata serialization failed: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Loading or saving persisted settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(#[from] ConfigurationError),
}

/// Controller-level error.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

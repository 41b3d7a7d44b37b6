//! # rolling-capture-core
//!
//! Keeps the last N seconds of microphone audio in memory and saves that
//! window as a mono 16-bit WAV file on demand.
//!
//! Capture backends implement [`CaptureSource`] and plug into the generic
//! [`BufferController`]. Storage is handed to exports as a [`FileSink`].
//!
//! ## Architecture
//!
//! ```text
//! rolling-capture-core (this crate)
//! ├── traits/       ← CaptureSource, FileSink, BufferDelegate
//! ├── models/       ← errors, BufferSettings, BufferState, RecordingMetadata
//! ├── processing/   ← RollingBuffer, WAV encoding, Resampler
//! ├── session/      ← BufferController (capture source ↔ buffer binding)
//! ├── storage/      ← AtomicFileSink, RecordingStore, metadata, settings
//! └── backends/     ← PushSource, CpalMicSource (feature "cpal")
//! ```
//!
//! ## Usage
//! ```no_run
//! use rolling_capture_core::{AtomicFileSink, BufferController, BufferSettings, PushSource};
//!
//! let source = PushSource::new("tap", 48000.0);
//! let feed = source.handle();
//! let mut controller = BufferController::new(source, BufferSettings::default()).unwrap();
//! controller.start().unwrap();
//!
//! // From the platform's audio callback:
//! feed.push(&[0.0; 1024], 48000.0, 1);
//!
//! // On "save":
//! controller
//!     .save_recent(&AtomicFileSink, std::path::Path::new("/tmp/recent.wav"))
//!     .unwrap();
//! ```

pub mod backends;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use backends::push_source::{PushSource, PushSourceHandle};
pub use models::audio_models::{AudioSource, AudioTrack, BufferDiagnostics};
pub use models::config::{BufferSettings, StorageLocation, MAX_BUFFER_SECS, MIN_BUFFER_SECS};
pub use models::error::{
    BufferError, CaptureError, ConfigurationError, ExportError, SettingsError, StorageError, WriteError,
};
pub use models::recording_result::{ExportedRecording, RecordingMetadata};
pub use models::state::BufferState;
pub use processing::rolling_buffer::{BufferSnapshot, RollingBuffer};
pub use session::controller::BufferController;
pub use storage::file_sink::AtomicFileSink;
pub use storage::recording_store::RecordingStore;
pub use storage::settings_store::{load_settings, save_settings};
pub use traits::buffer_delegate::BufferDelegate;
pub use traits::capture_source::{CaptureSource, SampleChunkCallback, SubscriptionHandle};
pub use traits::file_sink::FileSink;

#[cfg(feature = "cpal")]
pub use backends::cpal_source::CpalMicSource;

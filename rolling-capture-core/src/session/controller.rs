use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::audio_models::BufferDiagnostics;
use crate::models::config::{validate_duration, BufferSettings};
use crate::models::error::{BufferError, CaptureError, ConfigurationError, ExportError};
use crate::models::recording_result::ExportedRecording;
use crate::models::state::BufferState;
use crate::processing::resampler::{rates_differ, Resampler};
use crate::processing::rolling_buffer::{BufferSnapshot, RollingBuffer};
use crate::processing::wav_format;
use crate::storage::metadata::write_metadata;
use crate::storage::recording_store::RecordingStore;
use crate::traits::buffer_delegate::BufferDelegate;
use crate::traits::capture_source::{CaptureSource, SampleChunkCallback, SubscriptionHandle};
use crate::traits::file_sink::FileSink;

/// Counters touched from the capture callback and export workers.
#[derive(Debug, Default)]
struct Counters {
    callback_count: AtomicU64,
    samples_written: AtomicU64,
    rejected_chunks: AtomicU64,
    exports_completed: AtomicU64,
    exports_failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> BufferDiagnostics {
        BufferDiagnostics {
            callback_count: self.callback_count.load(Ordering::Relaxed),
            samples_written: self.samples_written.load(Ordering::Relaxed),
            rejected_chunks: self.rejected_chunks.load(Ordering::Relaxed),
            exports_completed: self.exports_completed.load(Ordering::Relaxed),
            exports_failed: self.exports_failed.load(Ordering::Relaxed),
        }
    }
}

/// Binds a [`RollingBuffer`] to a [`CaptureSource`].
///
/// Data flow:
/// ```text
/// [CaptureSource] → downmix → resample → [RollingBuffer] ─→ snapshot → WAV → [FileSink]
/// ```
///
/// Starting subscribes to the source and activates the buffer; stopping
/// unsubscribes and deactivates it but keeps its contents, so the last
/// window can still be saved afterwards.
pub struct BufferController<S: CaptureSource> {
    source: S,
    buffer: Arc<RollingBuffer>,
    settings: BufferSettings,
    subscription: Option<SubscriptionHandle>,
    delegate: Option<Arc<dyn BufferDelegate>>,
    counters: Arc<Counters>,
}

impl<S: CaptureSource> BufferController<S> {
    /// Allocate a buffer of `settings.buffer_length_secs` at the source's current rate.
    pub fn new(source: S, settings: BufferSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        let buffer = RollingBuffer::new(settings.buffer_length_secs, source.current_sample_rate())?;
        Ok(Self {
            source,
            buffer: Arc::new(buffer),
            settings,
            subscription: None,
            delegate: None,
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn BufferDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn is_running(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn state(&self) -> BufferState {
        if self.is_running() {
            BufferState::Buffering {
                buffered_secs: self.buffer.buffered_secs(),
            }
        } else {
            BufferState::Idle
        }
    }

    pub fn settings(&self) -> &BufferSettings {
        &self.settings
    }

    pub fn buffer(&self) -> &Arc<RollingBuffer> {
        &self.buffer
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn diagnostics(&self) -> BufferDiagnostics {
        self.counters.snapshot()
    }

    /// Start buffering. No-op if already running.
    ///
    /// If the device rate changed since the buffer was allocated, the buffer
    /// is reallocated first (it is inactive at that point).
    pub fn start(&mut self) -> Result<(), BufferError> {
        if self.is_running() {
            return Ok(());
        }
        if !self.source.is_available() {
            return Err(self.report(CaptureError::DeviceNotAvailable.into()));
        }

        let device_rate = self.source.current_sample_rate();
        if rates_differ(device_rate, self.buffer.sample_rate()) {
            log::debug!(
                "device rate changed {} -> {} Hz, reallocating buffer",
                self.buffer.sample_rate(),
                device_rate
            );
            if let Err(e) = self.buffer.configure(self.settings.buffer_length_secs, device_rate) {
                return Err(self.report(e.into()));
            }
        }

        self.buffer.start();
        let callback = Self::chunk_callback(Arc::clone(&self.buffer), Arc::clone(&self.counters));

        match self.source.subscribe(callback) {
            Ok(handle) => self.subscription = Some(handle),
            Err(e) => {
                self.buffer.stop();
                return Err(self.report(e.into()));
            }
        }

        log::info!(
            "buffering last {}s from {} at {} Hz",
            self.settings.buffer_length_secs,
            self.source.device_info().name,
            self.buffer.sample_rate()
        );
        self.notify_state();
        Ok(())
    }

    /// Stop buffering. No-op if not running.
    ///
    /// Buffer contents are kept. Exports already in flight are not affected.
    pub fn stop(&mut self) -> Result<(), BufferError> {
        let Some(handle) = self.subscription.take() else {
            return Ok(());
        };

        let result = self.source.unsubscribe(handle);
        self.buffer.stop();

        log::info!("buffering stopped");
        self.notify_state();

        result.map_err(|e| self.report(e.into()))
    }

    /// Change the window length. Refused while running; stop first.
    ///
    /// On success the buffer is reallocated and previous contents are lost.
    pub fn set_buffer_length(&mut self, duration_secs: u32) -> Result<(), ConfigurationError> {
        if self.is_running() {
            return Err(ConfigurationError::BufferActive);
        }
        validate_duration(duration_secs)?;
        self.buffer.configure(duration_secs, self.buffer.sample_rate())?;
        self.settings.buffer_length_secs = duration_secs;
        Ok(())
    }

    /// Save the current window to `destination` on the calling thread.
    pub fn save_recent(&self, sink: &dyn FileSink, destination: &Path) -> Result<ExportedRecording, ExportError> {
        let snapshot = self.buffer.snapshot();
        run_export(&snapshot, sink, destination, false, &self.counters, self.delegate.as_deref())
    }

    /// Save the current window into `store` under a fresh timestamped name,
    /// along with a metadata sidecar.
    ///
    /// The name is reserved before encoding starts, so saves running at the
    /// same time always land in distinct files.
    pub fn save_to_store(&self, store: &RecordingStore) -> Result<ExportedRecording, ExportError> {
        let destination = self.reserve_path(store)?;
        let snapshot = self.buffer.snapshot();
        run_export(&snapshot, store, &destination, true, &self.counters, self.delegate.as_deref())
    }

    /// Save the current window on a worker thread.
    ///
    /// The snapshot is taken before this returns; encoding and I/O happen on
    /// the worker so neither the caller nor the capture callback waits on disk.
    pub fn save_recent_in_background(
        &self,
        sink: Arc<dyn FileSink>,
        destination: PathBuf,
    ) -> Result<thread::JoinHandle<Result<ExportedRecording, ExportError>>, ExportError> {
        self.spawn_export(sink, destination, false)
    }

    /// Background variant of [`save_to_store`](Self::save_to_store).
    pub fn save_to_store_in_background(
        &self,
        store: RecordingStore,
    ) -> Result<thread::JoinHandle<Result<ExportedRecording, ExportError>>, ExportError> {
        let destination = self.reserve_path(&store)?;
        self.spawn_export(Arc::new(store), destination, true)
    }

    // --- Internal helpers ---

    fn reserve_path(&self, store: &RecordingStore) -> Result<PathBuf, ExportError> {
        store.create_recording_path("wav").map_err(|e| {
            let error = ExportError::from(e);
            log::error!("failed to reserve a recording path: {}", error);
            self.counters.exports_failed.fetch_add(1, Ordering::Relaxed);
            if let Some(ref delegate) = self.delegate {
                delegate.on_export_failed(&error);
            }
            error
        })
    }

    fn spawn_export(
        &self,
        sink: Arc<dyn FileSink>,
        destination: PathBuf,
        with_sidecar: bool,
    ) -> Result<thread::JoinHandle<Result<ExportedRecording, ExportError>>, ExportError> {
        let snapshot = self.buffer.snapshot();
        let counters = Arc::clone(&self.counters);
        let delegate = self.delegate.clone();
        let placeholder = with_sidecar.then(|| destination.clone());

        thread::Builder::new()
            .name("buffer-export".into())
            .spawn(move || {
                run_export(
                    &snapshot,
                    sink.as_ref(),
                    &destination,
                    with_sidecar,
                    &counters,
                    delegate.as_deref(),
                )
            })
            .map_err(|e| {
                if let Some(path) = placeholder {
                    let _ = fs::remove_file(path);
                }
                ExportError::Worker(e.to_string())
            })
    }

    /// The closure installed on the capture source.
    ///
    /// Runs on the audio thread: no blocking locks, no I/O. Allocates only
    /// when the chunk needs downmixing or resampling. The resampler carries
    /// its phase from chunk to chunk; with a single producer its lock is
    /// never contended.
    fn chunk_callback(buffer: Arc<RollingBuffer>, counters: Arc<Counters>) -> SampleChunkCallback {
        let target_rate = buffer.sample_rate();
        let resampler = Mutex::new(Resampler::new(target_rate));

        Arc::new(move |samples: &[f32], sample_rate: f64, channels: u16| {
            counters.callback_count.fetch_add(1, Ordering::Relaxed);

            let mono: Cow<'_, [f32]> = if channels > 1 {
                Cow::Owned(wav_format::downmix_to_mono(samples, channels as usize))
            } else {
                Cow::Borrowed(samples)
            };
            let chunk: Cow<'_, [f32]> = if rates_differ(sample_rate, target_rate) {
                match resampler.try_lock() {
                    Some(mut resampler) => Cow::Owned(resampler.process(&mono, sample_rate)),
                    None => {
                        counters.rejected_chunks.fetch_add(1, Ordering::Relaxed);
                        log::trace!("dropped {} samples: resampler busy", mono.len());
                        return;
                    }
                }
            } else {
                mono
            };

            match buffer.write(&chunk) {
                Ok(()) => {
                    counters
                        .samples_written
                        .fetch_add(chunk.len() as u64, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.rejected_chunks.fetch_add(1, Ordering::Relaxed);
                    log::trace!("dropped {} samples: {}", chunk.len(), e);
                }
            }
        })
    }

    fn notify_state(&self) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&self.state());
        }
    }

    fn report(&self, error: BufferError) -> BufferError {
        log::error!("rolling buffer: {}", error);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(&error);
        }
        error
    }
}

impl<S: CaptureSource> Drop for BufferController<S> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("failed to stop capture on drop: {}", e);
        }
    }
}

/// Encode, write, and report one export.
///
/// Store saves (`with_sidecar`) remove their reserved placeholder on failure.
fn run_export(
    snapshot: &BufferSnapshot,
    sink: &dyn FileSink,
    destination: &Path,
    with_sidecar: bool,
    counters: &Counters,
    delegate: Option<&dyn BufferDelegate>,
) -> Result<ExportedRecording, ExportError> {
    match snapshot.export_wav(sink, destination) {
        Ok(recording) => {
            if with_sidecar {
                if let Err(e) = write_metadata(&recording.metadata, &recording.file_path) {
                    log::warn!("recording saved without metadata: {}", e);
                }
            }
            counters.exports_completed.fetch_add(1, Ordering::Relaxed);
            if let Some(delegate) = delegate {
                delegate.on_export_finished(&recording);
            }
            Ok(recording)
        }
        Err(e) => {
            log::error!("failed to save buffer to {}: {}", destination.display(), e);
            if with_sidecar {
                let _ = fs::remove_file(destination);
            }
            counters.exports_failed.fetch_add(1, Ordering::Relaxed);
            if let Some(delegate) = delegate {
                delegate.on_export_failed(&e);
            }
            Err(e)
        }
    }
}

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::models::config::{validate_duration, validate_sample_rate};
use crate::models::error::{ConfigurationError, ExportError, WriteError};
use crate::models::recording_result::{ExportedRecording, RecordingMetadata};
use crate::processing::wav_format;
use crate::storage::metadata::sha256_hex;
use crate::traits::file_sink::FileSink;

/// Preallocated sample slots plus the producer's position.
///
/// Slots hold `f32::to_bits` so each one is read and written atomically.
struct SampleWindow {
    slots: Box<[AtomicU32]>,
    /// Samples ever written; the write cursor is this modulo capacity.
    total_written: AtomicU64,
    sample_rate: f64,
    duration_secs: u32,
}

impl SampleWindow {
    fn new(duration_secs: u32, sample_rate: f64) -> Result<Self, ConfigurationError> {
        validate_duration(duration_secs)?;
        validate_sample_rate(sample_rate)?;

        let capacity = (sample_rate * duration_secs as f64).round() as usize;
        if capacity == 0 {
            return Err(ConfigurationError::InvalidSampleRate(sample_rate));
        }

        let slots = (0..capacity).map(|_| AtomicU32::new(0.0f32.to_bits())).collect();
        Ok(Self {
            slots,
            total_written: AtomicU64::new(0),
            sample_rate,
            duration_secs,
        })
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn cursor(&self) -> usize {
        (self.total_written.load(Ordering::Acquire) % self.capacity() as u64) as usize
    }

    fn push(&self, chunk: &[f32]) {
        if chunk.is_empty() {
            return;
        }
        let capacity = self.capacity();
        let written = self.total_written.load(Ordering::Relaxed);

        // Anything before the final `capacity` samples would be overwritten
        // within this same call.
        let skip = chunk.len().saturating_sub(capacity);
        let mut index = ((written + skip as u64) % capacity as u64) as usize;
        for &sample in &chunk[skip..] {
            self.slots[index].store(sample.to_bits(), Ordering::Relaxed);
            index += 1;
            if index == capacity {
                index = 0;
            }
        }

        self.total_written
            .store(written + chunk.len() as u64, Ordering::Release);
    }

    fn ordered(&self) -> Vec<f32> {
        let cursor = self.cursor();
        let read = |slot: &AtomicU32| f32::from_bits(slot.load(Ordering::Relaxed));

        let mut samples = Vec::with_capacity(self.capacity());
        samples.extend(self.slots[cursor..].iter().map(read));
        samples.extend(self.slots[..cursor].iter().map(read));
        samples
    }

    fn recorded_samples(&self) -> usize {
        self.total_written
            .load(Ordering::Acquire)
            .min(self.capacity() as u64) as usize
    }
}

/// A copy of the window taken at one moment, oldest sample first.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferSnapshot {
    pub samples: Vec<f32>,
    pub sample_rate: f64,
    /// How many of the trailing `samples` came from the producer; the rest
    /// is zero pre-fill.
    pub recorded_samples: usize,
}

impl BufferSnapshot {
    /// Encode as a mono 16-bit PCM WAV file and write it through `sink`.
    ///
    /// The sink receives the complete file in one call. I/O failures are
    /// returned as-is, without retry.
    ///
    /// WAV headers carry whole-hertz rates, so a fractional capture rate is
    /// written as `round(sample_rate)`. Every sample is kept; the metadata
    /// `duration_secs` is measured at the header rate, matching what a
    /// player reports for the file.
    pub fn export_wav(&self, sink: &dyn FileSink, destination: &Path) -> Result<ExportedRecording, ExportError> {
        let sample_rate = self.sample_rate.round() as u32;

        let wav = wav_format::encode_mono_wav(&self.samples, sample_rate)?;
        let checksum = sha256_hex(&wav);

        sink.write(&wav, destination).map_err(|source| ExportError::Io {
            path: destination.to_path_buf(),
            source,
        })?;

        let metadata = RecordingMetadata::new_mono(
            sample_rate,
            self.samples.len() as u64,
            self.recorded_samples as u64,
            &destination.to_string_lossy(),
            &checksum,
        );
        log::info!(
            "saved {:.1}s buffer to {} ({} bytes)",
            metadata.duration_secs,
            destination.display(),
            wav.len()
        );

        Ok(ExportedRecording {
            file_path: destination.to_path_buf(),
            duration_secs: metadata.duration_secs,
            metadata,
            checksum,
        })
    }
}

/// Fixed-capacity circular buffer holding the last `duration_secs` of mono audio.
///
/// Written by exactly one producer (the capture callback) and read by
/// snapshot/export requests, possibly concurrently. `write` never blocks:
/// slots are atomics and the only lock is taken exclusively by
/// [`configure`](Self::configure), which is refused while the buffer is active.
///
/// Overflow behavior: overwrites the oldest samples. This is not an error.
pub struct RollingBuffer {
    window: RwLock<SampleWindow>,
    active: AtomicBool,
}

impl RollingBuffer {
    /// Allocate a zero-filled, inactive buffer.
    ///
    /// Fractional rates are accepted; capacity uses the exact rate, exports
    /// use the rate rounded to whole hertz.
    pub fn new(duration_secs: u32, sample_rate: f64) -> Result<Self, ConfigurationError> {
        Ok(Self {
            window: RwLock::new(SampleWindow::new(duration_secs, sample_rate)?),
            active: AtomicBool::new(false),
        })
    }

    /// Reallocate for a new window length or sample rate.
    ///
    /// Capacity becomes `round(sample_rate × duration_secs)`, the cursor
    /// resets to 0 and previous contents are discarded. Refused with
    /// [`ConfigurationError::BufferActive`] while the buffer is active.
    pub fn configure(&self, duration_secs: u32, sample_rate: f64) -> Result<(), ConfigurationError> {
        if self.is_active() {
            return Err(ConfigurationError::BufferActive);
        }
        let replacement = SampleWindow::new(duration_secs, sample_rate)?;

        let mut window = self.window.write();
        // start() holds the shared side while flipping the flag, so this is final.
        if self.is_active() {
            return Err(ConfigurationError::BufferActive);
        }
        *window = replacement;

        log::debug!(
            "rolling buffer configured: {}s at {} Hz ({} samples)",
            duration_secs,
            sample_rate,
            window.capacity()
        );
        Ok(())
    }

    /// Begin accepting writes. No-op if already active.
    pub fn start(&self) {
        let _window = self.window.read();
        if !self.active.swap(true, Ordering::AcqRel) {
            log::debug!("rolling buffer activated");
        }
    }

    /// Stop accepting writes. Contents are kept so a save can follow.
    pub fn stop(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            log::debug!("rolling buffer deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Append a chunk, overwriting the oldest samples once full.
    ///
    /// Bounded time, no allocation and no I/O. Must only be called from a
    /// single producer at a time. A rejected write changes nothing.
    pub fn write(&self, chunk: &[f32]) -> Result<(), WriteError> {
        let Some(window) = self.window.try_read() else {
            return Err(WriteError::Reconfiguring);
        };
        if !self.is_active() {
            return Err(WriteError::Inactive);
        }
        window.push(chunk);
        Ok(())
    }

    /// The window from oldest to newest: `samples[cursor..] ++ samples[..cursor]`.
    pub fn snapshot_ordered(&self) -> Vec<f32> {
        self.window.read().ordered()
    }

    /// Ordered samples together with the rate they were captured at.
    pub fn snapshot(&self) -> BufferSnapshot {
        let window = self.window.read();
        BufferSnapshot {
            samples: window.ordered(),
            sample_rate: window.sample_rate,
            recorded_samples: window.recorded_samples(),
        }
    }

    /// Encode the current window as mono 16-bit WAV and hand it to `sink`.
    ///
    /// The snapshot is copied first; encoding and I/O happen without holding
    /// any lock, so the producer keeps writing throughout. The buffer is not
    /// modified whether or not the export succeeds.
    pub fn export_wav(&self, sink: &dyn FileSink, destination: &Path) -> Result<ExportedRecording, ExportError> {
        self.snapshot().export_wav(sink, destination)
    }

    /// Number of sample slots.
    pub fn capacity(&self) -> usize {
        self.window.read().capacity()
    }

    pub fn sample_rate(&self) -> f64 {
        self.window.read().sample_rate
    }

    pub fn duration_secs(&self) -> u32 {
        self.window.read().duration_secs
    }

    /// Index of the next slot to be overwritten.
    pub fn write_cursor(&self) -> usize {
        self.window.read().cursor()
    }

    /// Samples of real audio held, at most `capacity()`.
    pub fn recorded_samples(&self) -> usize {
        self.window.read().recorded_samples()
    }

    /// Seconds of real audio held.
    pub fn buffered_secs(&self) -> f64 {
        let window = self.window.read();
        window.recorded_samples() as f64 / window.sample_rate
    }
}

impl std::fmt::Debug for RollingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let window = self.window.read();
        f.debug_struct("RollingBuffer")
            .field("capacity", &window.capacity())
            .field("sample_rate", &window.sample_rate)
            .field("duration_secs", &window.duration_secs)
            .field("cursor", &window.cursor())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;
    use std::thread;

    use parking_lot::Mutex;

    fn active_buffer(duration_secs: u32, sample_rate: f64) -> RollingBuffer {
        let buf = RollingBuffer::new(duration_secs, sample_rate).unwrap();
        buf.start();
        buf
    }

    #[test]
    fn capacity_is_rounded_product() {
        for &(secs, rate) in &[(10, 100.0), (30, 44100.0), (120, 48000.0), (10, 22050.5), (11, 8000.3)] {
            let buf = RollingBuffer::new(secs, rate).unwrap();
            assert_eq!(buf.capacity(), (rate * secs as f64).round() as usize);
            assert_eq!(buf.snapshot_ordered().len(), buf.capacity());
            assert_eq!(buf.write_cursor(), 0);
        }
    }

    #[test]
    fn example_scenario_evicts_first_two() {
        let buf = active_buffer(10, 100.0);
        assert_eq!(buf.capacity(), 1000);

        let first: Vec<f32> = (0..1000).map(|i| i as f32 / 10.0).collect();
        buf.write(&first).unwrap();
        buf.write(&[1000.0 / 10.0, 1001.0 / 10.0]).unwrap();

        let mut expected: Vec<f32> = first[2..].to_vec();
        expected.extend([1000.0 / 10.0, 1001.0 / 10.0]);
        assert_eq!(buf.snapshot_ordered(), expected);
        assert_eq!(buf.write_cursor(), 2);
    }

    #[test]
    fn wraparound_keeps_last_capacity_samples() {
        let capacity = 1000;
        for &k in &[1usize, 7, 500, 999] {
            let buf = active_buffer(10, 100.0);
            let input: Vec<f32> = (0..capacity + k).map(|i| i as f32).collect();
            // Uneven chunking must not matter.
            for chunk in input.chunks(37) {
                buf.write(chunk).unwrap();
            }
            assert_eq!(buf.snapshot_ordered(), input[k..].to_vec(), "k = {k}");
        }
    }

    #[test]
    fn partial_fill_keeps_zero_prefix() {
        let buf = active_buffer(10, 100.0);
        let input: Vec<f32> = (1..=250).map(|i| i as f32 * 0.001).collect();
        buf.write(&input).unwrap();

        let snapshot = buf.snapshot_ordered();
        assert_eq!(&snapshot[snapshot.len() - 250..], input.as_slice());
        assert!(snapshot[..750].iter().all(|&s| s == 0.0));
        assert_eq!(buf.recorded_samples(), 250);
    }

    #[test]
    fn chunk_larger_than_capacity_wraps_multiple_times() {
        let buf = active_buffer(10, 100.0);
        buf.write(&[9.0; 3]).unwrap();
        let input: Vec<f32> = (0..2503).map(|i| i as f32).collect();
        buf.write(&input).unwrap();

        assert_eq!(buf.snapshot_ordered(), input[1503..].to_vec());
        assert_eq!(buf.write_cursor(), (3 + 2503) % 1000);
        assert_eq!(buf.recorded_samples(), 1000);
    }

    #[test]
    fn write_while_inactive_is_rejected() {
        let buf = RollingBuffer::new(10, 100.0).unwrap();
        assert_eq!(buf.write(&[1.0, 2.0]), Err(WriteError::Inactive));
        assert_eq!(buf.write_cursor(), 0);
        assert!(buf.snapshot_ordered().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stop_retains_contents() {
        let buf = active_buffer(10, 100.0);
        buf.write(&[0.5; 10]).unwrap();
        buf.stop();

        assert!(!buf.is_active());
        assert_eq!(buf.recorded_samples(), 10);
        assert_eq!(buf.write(&[0.25]), Err(WriteError::Inactive));
        assert_eq!(&buf.snapshot_ordered()[990..], &[0.5; 10]);
    }

    #[test]
    fn start_is_idempotent() {
        let buf = active_buffer(10, 100.0);
        buf.write(&[0.5; 4]).unwrap();
        buf.start();
        assert!(buf.is_active());
        assert_eq!(buf.write_cursor(), 4);
    }

    #[test]
    fn configure_while_active_is_refused() {
        let buf = active_buffer(10, 100.0);
        buf.write(&[0.5; 4]).unwrap();

        assert_eq!(buf.configure(20, 100.0), Err(ConfigurationError::BufferActive));
        assert_eq!(buf.capacity(), 1000);
        assert_eq!(buf.write_cursor(), 4);
    }

    #[test]
    fn configure_reallocates_and_resets() {
        let buf = active_buffer(10, 100.0);
        buf.write(&[0.5; 40]).unwrap();
        buf.stop();

        buf.configure(60, 50.0).unwrap();
        assert_eq!(buf.capacity(), 3000);
        assert_eq!(buf.write_cursor(), 0);
        assert_eq!(buf.recorded_samples(), 0);
        assert_eq!(buf.duration_secs(), 60);
        assert!(buf.snapshot_ordered().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn invalid_configure_changes_nothing() {
        let buf = RollingBuffer::new(30, 100.0).unwrap();
        buf.start();
        buf.write(&[0.5; 4]).unwrap();
        buf.stop();

        assert!(matches!(
            buf.configure(5, 100.0),
            Err(ConfigurationError::DurationOutOfRange { requested: 5, .. })
        ));
        assert!(matches!(buf.configure(121, 100.0), Err(ConfigurationError::DurationOutOfRange { .. })));
        assert!(matches!(buf.configure(30, 0.0), Err(ConfigurationError::InvalidSampleRate(_))));

        assert_eq!(buf.capacity(), 3000);
        assert_eq!(buf.write_cursor(), 4);
    }

    #[test]
    fn export_encodes_snapshot() {
        let buf = active_buffer(10, 100.0);
        let input: Vec<f32> = (0..1000).map(|i| ((i % 200) as f32 - 100.0) / 100.0).collect();
        buf.write(&input).unwrap();
        buf.write(&[1.5, -1.5]).unwrap();

        let captured: Arc<Mutex<Vec<u8>>> = Arc::default();
        let sink = {
            let captured = Arc::clone(&captured);
            move |bytes: &[u8], _path: &Path| -> io::Result<()> {
                captured.lock().extend_from_slice(bytes);
                Ok(())
            }
        };

        let result = buf.export_wav(&sink, Path::new("/virtual/recent.wav")).unwrap();
        let bytes = captured.lock().clone();

        assert_eq!(bytes.len(), 44 + 2000);
        assert_eq!(&bytes[..44], &wav_format::generate_wav_header(100, 16, 1, 2000));
        assert_eq!(result.checksum, sha256_hex(&bytes));
        assert_eq!(result.metadata.sample_count, 1000);
        assert_eq!(result.metadata.recorded_samples, 1000);
        assert!((result.duration_secs - 10.0).abs() < 1e-9);

        let decoded: Vec<i16> = bytes[44..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        let mut expected_source = input[2..].to_vec();
        expected_source.extend([1.0, -1.0]);
        let expected: Vec<i16> = expected_source.iter().map(|s| (s * 32767.0).round() as i16).collect();
        assert_eq!(decoded, expected);
        assert_eq!(decoded[998], 32767);
        assert_eq!(decoded[999], -32767);
    }

    #[test]
    fn fractional_rate_exports_at_rounded_header_rate() {
        let buf = active_buffer(10, 22050.5);
        assert_eq!(buf.capacity(), 220505);
        buf.write(&[0.5; 100]).unwrap();

        let captured: Arc<Mutex<Vec<u8>>> = Arc::default();
        let sink = {
            let captured = Arc::clone(&captured);
            move |bytes: &[u8], _path: &Path| -> io::Result<()> {
                captured.lock().extend_from_slice(bytes);
                Ok(())
            }
        };
        let result = buf.export_wav(&sink, Path::new("/virtual/fractional.wav")).unwrap();
        let bytes = captured.lock().clone();

        assert_eq!(&bytes[..44], &wav_format::generate_wav_header(22051, 16, 1, 2 * 220505));
        assert_eq!(result.metadata.sample_rate, 22051);
        assert_eq!(result.metadata.sample_count, 220505);
        assert!((result.duration_secs - 220505.0 / 22051.0).abs() < 1e-9);
        assert_eq!(result.metadata.recorded_samples, 100);
    }

    #[test]
    fn failed_export_leaves_buffer_running() {
        let buf = active_buffer(10, 100.0);
        buf.write(&[0.25; 10]).unwrap();

        let failing = |_: &[u8], _: &Path| -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only volume"))
        };
        let err = buf.export_wav(&failing, Path::new("/ro/recent.wav")).unwrap_err();
        match err {
            ExportError::Io { path, source } => {
                assert_eq!(path, Path::new("/ro/recent.wav"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(buf.is_active());
        buf.write(&[0.5]).unwrap();
        assert_eq!(buf.recorded_samples(), 11);
    }

    #[test]
    fn concurrent_snapshots_never_see_foreign_values() {
        let buf = active_buffer(10, 100.0);
        let capacity = buf.capacity() as u64;

        // Value k always lands in slot k % capacity. Fill once so no pre-fill remains.
        let prefill: Vec<f32> = (0..capacity).map(|k| k as f32).collect();
        buf.write(&prefill).unwrap();

        let total: u64 = 2_000_000;
        thread::scope(|scope| {
            scope.spawn(|| {
                let mut next = capacity;
                let mut seed: u32 = 0x9e37_79b9;
                let mut chunk = Vec::with_capacity(512);
                while next < total {
                    seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    let len = 1 + (seed >> 23) as u64; // 1..=512
                    chunk.clear();
                    chunk.extend((next..(next + len).min(total)).map(|k| k as f32));
                    buf.write(&chunk).unwrap();
                    next += chunk.len() as u64;
                }
            });

            for _ in 0..200 {
                let snapshot = buf.snapshot_ordered();
                // Ordered position j maps to physical slot (cursor + j) % capacity for a
                // fixed cursor, so every value must agree on that offset.
                let mut offset = None;
                for (j, &value) in snapshot.iter().enumerate() {
                    assert_eq!(value.fract(), 0.0, "torn sample {value}");
                    assert!(value >= 0.0 && (value as u64) < total);
                    let slot_offset = (value as u64 + capacity - j as u64 % capacity) % capacity;
                    match offset {
                        None => offset = Some(slot_offset),
                        Some(o) => assert_eq!(o, slot_offset, "value {value} in wrong slot"),
                    }
                }
            }
        });

        assert_eq!(buf.recorded_samples(), capacity as usize);
    }
}

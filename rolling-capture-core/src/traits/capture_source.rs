use std::sync::Arc;

use crate::models::audio_models::AudioSource;
use crate::models::error::CaptureError;

/// Callback invoked for every chunk the source delivers.
///
/// Parameters:
/// - `samples`: f32 samples, interleaved when `channels > 1`.
/// - `sample_rate`: The rate the chunk was captured at.
/// - `channels`: Number of interleaved channels.
pub type SampleChunkCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// Token returned by [`CaptureSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// A live audio input the rolling buffer listens to.
///
/// The source owns session lifecycle, device selection and routing; the
/// buffer only subscribes to its chunk stream.
pub trait CaptureSource: Send + Sync {
    /// Whether the source can currently deliver audio.
    fn is_available(&self) -> bool;

    /// Rate, in Hz, at which chunks are currently produced.
    fn current_sample_rate(&self) -> f64;

    /// Start delivering chunks to `on_chunk`.
    ///
    /// The callback runs on the source's audio thread and must not block.
    fn subscribe(&mut self, on_chunk: SampleChunkCallback) -> Result<SubscriptionHandle, CaptureError>;

    /// Stop delivering chunks to the subscriber behind `handle`.
    fn unsubscribe(&mut self, handle: SubscriptionHandle) -> Result<(), CaptureError>;

    /// The device backing this source.
    fn device_info(&self) -> AudioSource;
}

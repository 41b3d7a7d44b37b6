//! Capture source fed by the host.
//!
//! For hosts that already own an audio callback (a platform tap, an FFI
//! bridge) and only need to forward its chunks into the rolling buffer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioSource, AudioTrackType};
use crate::models::error::CaptureError;
use crate::traits::capture_source::{CaptureSource, SampleChunkCallback, SubscriptionHandle};

type Subscriber = (SubscriptionHandle, SampleChunkCallback);

/// A [`CaptureSource`] whose chunks are delivered by calling
/// [`PushSourceHandle::push`] from the host's audio thread.
pub struct PushSource {
    name: String,
    sample_rate: f64,
    subscriber: Arc<Mutex<Option<Subscriber>>>,
    busy_drops: Arc<AtomicU64>,
    next_handle: AtomicU64,
}

/// Cloneable sending side of a [`PushSource`].
#[derive(Clone)]
pub struct PushSourceHandle {
    subscriber: Arc<Mutex<Option<Subscriber>>>,
    busy_drops: Arc<AtomicU64>,
}

impl PushSource {
    pub fn new(name: impl Into<String>, sample_rate: f64) -> Self {
        Self {
            name: name.into(),
            sample_rate,
            subscriber: Arc::new(Mutex::new(None)),
            busy_drops: Arc::new(AtomicU64::new(0)),
            next_handle: AtomicU64::new(1),
        }
    }

    /// The side the host pushes chunks through.
    pub fn handle(&self) -> PushSourceHandle {
        PushSourceHandle {
            subscriber: Arc::clone(&self.subscriber),
            busy_drops: Arc::clone(&self.busy_drops),
        }
    }

    /// Report a new device rate, e.g. after a route change. Takes effect for
    /// the next subscriber; chunks already flowing carry their own rate.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber.lock().is_some()
    }

    /// Chunks dropped because the subscriber slot was locked at push time.
    pub fn busy_drops(&self) -> u64 {
        self.busy_drops.load(Ordering::Relaxed)
    }
}

impl PushSourceHandle {
    /// Deliver one chunk. Returns whether a subscriber received it.
    ///
    /// Never blocks. The chunk is dropped when nobody is subscribed, and also
    /// when the subscriber slot is momentarily locked by `subscribe`,
    /// `unsubscribe` or `has_subscriber` on another thread. Drops of the
    /// second kind are counted in [`PushSource::busy_drops`].
    pub fn push(&self, samples: &[f32], sample_rate: f64, channels: u16) -> bool {
        // Clone out so the callback never runs under the lock.
        let callback = match self.subscriber.try_lock() {
            Some(guard) => guard.as_ref().map(|(_, cb)| Arc::clone(cb)),
            None => {
                self.busy_drops.fetch_add(1, Ordering::Relaxed);
                log::trace!("dropped {} samples: subscriber slot busy", samples.len());
                None
            }
        };
        match callback {
            Some(cb) => {
                cb(samples, sample_rate, channels);
                true
            }
            None => false,
        }
    }
}

impl CaptureSource for PushSource {
    fn is_available(&self) -> bool {
        true
    }

    fn current_sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn subscribe(&mut self, on_chunk: SampleChunkCallback) -> Result<SubscriptionHandle, CaptureError> {
        let mut slot = self.subscriber.lock();
        if slot.is_some() {
            return Err(CaptureError::StreamFailed("push source already has a subscriber".into()));
        }
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        *slot = Some((handle, on_chunk));
        Ok(handle)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) -> Result<(), CaptureError> {
        let mut slot = self.subscriber.lock();
        match slot.as_ref() {
            Some((current, _)) if *current == handle => {
                *slot = None;
                Ok(())
            }
            _ => Err(CaptureError::UnknownSubscription(handle)),
        }
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: format!("push:{}", self.name),
            name: self.name.clone(),
            source_type: AudioTrackType::Mic,
            is_default: false,
        }
    }
}

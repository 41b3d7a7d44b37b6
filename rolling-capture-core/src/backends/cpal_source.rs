//! Default-microphone capture source backed by cpal.
//!
//! The cpal stream is opened and owned by a dedicated thread, since streams
//! are not `Send` on every host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;

use crate::models::audio_models::{AudioSource, AudioTrackType};
use crate::models::error::CaptureError;
use crate::traits::capture_source::{CaptureSource, SampleChunkCallback, SubscriptionHandle};

/// Captures the system default input device.
pub struct CpalMicSource {
    device_name: String,
    sample_rate: f64,
    running: Arc<AtomicBool>,
    capture: Option<(SubscriptionHandle, thread::JoinHandle<()>)>,
    next_handle: u64,
}

impl CpalMicSource {
    /// Probe the default input device for its name and native rate.
    pub fn default_device() -> Result<Self, CaptureError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(CaptureError::DeviceNotAvailable)?;
        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::StreamFailed(format!("no input config: {}", e)))?;

        Ok(Self {
            device_name: device.name().unwrap_or_else(|_| "Default Microphone".into()),
            sample_rate: config.sample_rate().0 as f64,
            running: Arc::new(AtomicBool::new(false)),
            capture: None,
            next_handle: 1,
        })
    }
}

impl CaptureSource for CpalMicSource {
    fn is_available(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    fn current_sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn subscribe(&mut self, on_chunk: SampleChunkCallback) -> Result<SubscriptionHandle, CaptureError> {
        if self.capture.is_some() {
            return Err(CaptureError::StreamFailed("microphone already capturing".into()));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<f64, CaptureError>>(1);

        let join = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                let (stream, rate) = match open_stream(on_chunk) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(rate));

                while running.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(50));
                }
                drop(stream);
            })
            .map_err(|e| CaptureError::StreamFailed(format!("failed to spawn capture thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(rate)) => {
                self.sample_rate = rate;
                let handle = SubscriptionHandle(self.next_handle);
                self.next_handle += 1;
                self.capture = Some((handle, join));
                log::info!("microphone capture started on {} at {} Hz", self.device_name, rate);
                Ok(handle)
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = join.join();
                Err(CaptureError::StreamFailed("capture thread exited before starting".into()))
            }
        }
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) -> Result<(), CaptureError> {
        match self.capture.take() {
            Some((current, join)) if current == handle => {
                self.running.store(false, Ordering::SeqCst);
                let _ = join.join();
                log::info!("microphone capture stopped");
                Ok(())
            }
            other => {
                self.capture = other;
                Err(CaptureError::UnknownSubscription(handle))
            }
        }
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "default-mic".into(),
            name: self.device_name.clone(),
            source_type: AudioTrackType::Mic,
            is_default: true,
        }
    }
}

impl Drop for CpalMicSource {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some((_, join)) = self.capture.take() {
            let _ = join.join();
        }
    }
}

/// Open and start the default input stream. Returns the stream and its rate.
fn open_stream(callback: SampleChunkCallback) -> Result<(cpal::Stream, f64), CaptureError> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or(CaptureError::DeviceNotAvailable)?;
    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::StreamFailed(format!("no input config: {}", e)))?;

    let sample_rate = supported.sample_rate().0 as f64;
    let channels = supported.channels();
    let config = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, callback, sample_rate, channels),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, callback, sample_rate, channels),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, callback, sample_rate, channels),
        other => Err(CaptureError::StreamFailed(format!("unsupported sample format {:?}", other))),
    }?;

    stream.play().map_err(|e| match e {
        cpal::PlayStreamError::DeviceNotAvailable => CaptureError::DeviceNotAvailable,
        other => CaptureError::StreamFailed(other.to_string()),
    })?;
    Ok((stream, sample_rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    callback: SampleChunkCallback,
    sample_rate: f64,
    channels: u16,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let mut converted: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                converted.clear();
                converted.extend(data.iter().map(|&s| -> f32 { cpal::Sample::from_sample(s) }));
                callback(&converted, sample_rate, channels);
            },
            |err| log::error!("microphone stream error: {}", err),
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceNotAvailable,
            other => CaptureError::StreamFailed(other.to_string()),
        })
}

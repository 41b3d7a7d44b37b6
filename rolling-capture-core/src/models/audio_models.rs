use serde::{Deserialize, Serialize};

/// Type of audio source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioTrackType {
    Mic,
}

/// Audio channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioChannel {
    #[serde(rename = "C")]
    Center,
}

/// An audio track in a saved recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    #[serde(rename = "type")]
    pub track_type: AudioTrackType,
    pub channel: AudioChannel,
}

impl AudioTrack {
    /// The single mono microphone track every rolling export carries.
    pub fn mono_mic() -> Self {
        Self {
            track_type: AudioTrackType::Mic,
            channel: AudioChannel::Center,
        }
    }
}

/// An input device a capture source reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub source_type: AudioTrackType,
    pub is_default: bool,
}

/// Counters maintained by the controller's capture callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferDiagnostics {
    pub callback_count: u64,
    pub samples_written: u64,
    pub rejected_chunks: u64,
    pub exports_completed: u64,
    pub exports_failed: u64,
}

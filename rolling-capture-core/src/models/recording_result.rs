use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::AudioTrack;

/// A WAV file produced from the rolling buffer.
///
/// Independent of the buffer once returned; nothing links it back.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedRecording {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// Metadata written alongside an exported recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub sample_count: u64,
    /// Samples in the file that came from the microphone rather than the
    /// zero pre-fill of a window that had not yet filled up.
    pub recorded_samples: u64,
    pub file_path: String,
    pub checksum: String,
    pub created_at: String,
    pub tracks: Vec<AudioTrack>,
}

impl RecordingMetadata {
    /// Creates metadata for a mono rolling-buffer export.
    pub fn new_mono(
        sample_rate: u32,
        sample_count: u64,
        recorded_samples: u64,
        file_path: &str,
        checksum: &str,
    ) -> Self {
        let duration_secs = if sample_rate == 0 {
            0.0
        } else {
            sample_count as f64 / sample_rate as f64
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            duration_secs,
            sample_rate,
            sample_count,
            recorded_samples,
            file_path: file_path.to_string(),
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            tracks: vec![AudioTrack::mono_mic()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn duration_derived_from_sample_count() {
        let meta = RecordingMetadata::new_mono(44100, 441000, 220500, "/tmp/a.wav", "abc");
        assert_relative_eq!(meta.duration_secs, 10.0);
        assert_eq!(meta.tracks, vec![AudioTrack::mono_mic()]);
        assert!(uuid::Uuid::parse_str(&meta.id).is_ok());
    }

    #[test]
    fn serializes_track_type_field() {
        let meta = RecordingMetadata::new_mono(100, 1000, 1000, "x.wav", "00");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["tracks"][0]["type"], "mic");
        assert_eq!(json["tracks"][0]["channel"], "C");
    }
}

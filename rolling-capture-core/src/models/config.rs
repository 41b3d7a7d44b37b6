use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;

/// Shortest window the buffer may be configured for, in seconds.
pub const MIN_BUFFER_SECS: u32 = 10;

/// Longest window the buffer may be configured for, in seconds.
pub const MAX_BUFFER_SECS: u32 = 120;

/// Window length used when nothing has been persisted yet.
pub const DEFAULT_BUFFER_SECS: u32 = 30;

/// Highest capture rate accepted, in Hz.
pub const MAX_SAMPLE_RATE: f64 = 384_000.0;

/// Recordings older than this many days are pruned by default.
pub const DEFAULT_AUTO_DELETE_DAYS: u32 = 7;

/// Where saved recordings are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    /// OS temporary directory. Default.
    #[default]
    Temporary,
    /// The user's documents directory.
    Documents,
}

/// Persisted user settings for the rolling buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferSettings {
    /// Length of the rolling window in seconds (10..=120).
    pub buffer_length_secs: u32,

    pub storage_location: StorageLocation,

    /// Age in days after which saved recordings are deleted (0 = never).
    pub auto_delete_days: u32,
}

impl BufferSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_duration(self.buffer_length_secs)
    }
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            buffer_length_secs: DEFAULT_BUFFER_SECS,
            storage_location: StorageLocation::Temporary,
            auto_delete_days: DEFAULT_AUTO_DELETE_DAYS,
        }
    }
}

/// Check a window length against the supported range.
pub fn validate_duration(duration_secs: u32) -> Result<(), ConfigurationError> {
    if !(MIN_BUFFER_SECS..=MAX_BUFFER_SECS).contains(&duration_secs) {
        return Err(ConfigurationError::DurationOutOfRange {
            requested: duration_secs,
            min: MIN_BUFFER_SECS,
            max: MAX_BUFFER_SECS,
        });
    }
    Ok(())
}

/// Check a sample rate is positive and no higher than [`MAX_SAMPLE_RATE`].
pub fn validate_sample_rate(sample_rate: f64) -> Result<(), ConfigurationError> {
    if !sample_rate.is_finite() || sample_rate < 1.0 || sample_rate > MAX_SAMPLE_RATE {
        return Err(ConfigurationError::InvalidSampleRate(sample_rate));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product() {
        let settings = BufferSettings::default();
        assert_eq!(settings.buffer_length_secs, 30);
        assert_eq!(settings.storage_location, StorageLocation::Temporary);
        assert_eq!(settings.auto_delete_days, 7);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn duration_bounds_are_inclusive() {
        assert!(validate_duration(10).is_ok());
        assert!(validate_duration(120).is_ok());
        assert_eq!(
            validate_duration(9),
            Err(ConfigurationError::DurationOutOfRange { requested: 9, min: 10, max: 120 })
        );
        assert!(validate_duration(121).is_err());
    }

    #[test]
    fn sample_rate_rejects_nonsense() {
        assert!(validate_sample_rate(44100.0).is_ok());
        assert!(validate_sample_rate(0.0).is_err());
        assert!(validate_sample_rate(-48000.0).is_err());
        assert!(validate_sample_rate(f64::NAN).is_err());
        assert!(validate_sample_rate(f64::INFINITY).is_err());
        assert!(validate_sample_rate(MAX_SAMPLE_RATE).is_ok());
        assert!(validate_sample_rate(MAX_SAMPLE_RATE + 1.0).is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: BufferSettings = serde_json::from_str(r#"{"buffer_length_secs": 60}"#).unwrap();
        assert_eq!(settings.buffer_length_secs, 60);
        assert_eq!(settings.auto_delete_days, DEFAULT_AUTO_DELETE_DAYS);
    }

    #[test]
    fn storage_location_serializes_lowercase() {
        let json = serde_json::to_string(&StorageLocation::Documents).unwrap();
        assert_eq!(json, "\"documents\"");
    }
}

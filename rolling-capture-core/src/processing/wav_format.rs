//! WAV encoding for rolling-buffer exports.
//!
//! Generates the canonical 44-byte RIFF header and 16-bit PCM payload.

use crate::models::error::ExportError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Exports are always mono.
pub const EXPORT_CHANNELS: u16 = 1;

/// Exports are always 16-bit PCM.
pub const EXPORT_BIT_DEPTH: u16 = 16;

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Quantize one f32 sample to signed 16-bit.
///
/// Clamps to `[-1.0, 1.0]` first, then rounds to nearest, so `1.5` becomes
/// `32767` and `-1.5` becomes `-32767`.
#[inline]
pub fn quantize_sample(sample: f32) -> i16 {
    // NaN clamps to NaN and casts to 0.
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32).round() as i16
}

/// Encode mono f32 samples as a complete 16-bit PCM WAV file.
///
/// Fails with [`ExportError::TooLarge`] if the payload cannot be described
/// by the header's 32-bit size fields.
pub fn encode_mono_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, ExportError> {
    let data_size = samples.len() as u64 * (EXPORT_BIT_DEPTH as u64 / 8);
    if data_size > (u32::MAX - 36) as u64 {
        return Err(ExportError::TooLarge(data_size));
    }

    let header = generate_wav_header(sample_rate, EXPORT_BIT_DEPTH, EXPORT_CHANNELS, data_size as u32);

    let mut wav = Vec::with_capacity(WAV_HEADER_SIZE + data_size as usize);
    wav.extend_from_slice(&header);
    for &sample in samples {
        wav.extend_from_slice(&quantize_sample(sample).to_le_bytes());
    }
    Ok(wav)
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

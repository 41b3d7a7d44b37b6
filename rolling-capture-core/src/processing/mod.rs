pub mod resampler;
pub mod rolling_buffer;
pub mod wav_format;

//! Streaming linear-interpolation resampler for mono audio.
//!
//! Used when a capture source delivers chunks at a rate other than the one the
//! rolling buffer was sized for (e.g. after a Bluetooth route change).

/// Rates closer than this are treated as equal.
pub const RATE_TOLERANCE_HZ: f64 = 0.01;

/// Whether two rates differ enough to need conversion.
pub fn rates_differ(a: f64, b: f64) -> bool {
    (a - b).abs() >= RATE_TOLERANCE_HZ
}

/// Converts a chunked mono stream to `target_sample_rate`.
///
/// The read phase and the last input sample are carried between calls, so a
/// stream split into chunks yields the same output as one contiguous block:
/// no fractional sample is lost at a chunk edge and the first output of a
/// chunk interpolates from the previous chunk's tail. At most one output
/// sample is pending until the next chunk arrives.
#[derive(Debug, Clone)]
pub struct Resampler {
    target_sample_rate: f64,
    source_sample_rate: f64,
    /// Position of the next output, in source samples, relative to the first
    /// sample of the next chunk. `-1.0` addresses `previous`.
    phase: f64,
    previous: Option<f32>,
}

impl Resampler {
    pub fn new(target_sample_rate: f64) -> Self {
        Self {
            target_sample_rate,
            source_sample_rate: target_sample_rate,
            phase: 0.0,
            previous: None,
        }
    }

    pub fn target_sample_rate(&self) -> f64 {
        self.target_sample_rate
    }

    /// Whether chunks at `source_sample_rate` need converting.
    pub fn needs_resampling(&self, source_sample_rate: f64) -> bool {
        rates_differ(source_sample_rate, self.target_sample_rate)
    }

    /// Forget the carried phase and tail sample.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.previous = None;
    }

    /// Convert the next chunk of the stream.
    ///
    /// A chunk at the target rate passes through unchanged and ends the
    /// current stream. A change of source rate starts a new one.
    pub fn process(&mut self, samples: &[f32], source_sample_rate: f64) -> Vec<f32> {
        if !self.needs_resampling(source_sample_rate) || source_sample_rate <= 0.0 {
            self.reset();
            return samples.to_vec();
        }
        if rates_differ(source_sample_rate, self.source_sample_rate) {
            log::debug!(
                "resampling {} -> {} Hz",
                source_sample_rate,
                self.target_sample_rate
            );
            self.source_sample_rate = source_sample_rate;
            self.reset();
        }
        if samples.is_empty() {
            return Vec::new();
        }

        let step = source_sample_rate / self.target_sample_rate;
        let len = samples.len();
        let mut output = Vec::with_capacity((len as f64 / step) as usize + 1);

        loop {
            let floor = self.phase.floor();
            let left_index = floor as isize;
            if left_index + 1 >= len as isize {
                break;
            }
            let left = match (left_index, self.previous) {
                (i, _) if i >= 0 => samples[i as usize],
                (_, Some(previous)) => previous,
                (_, None) => samples[0],
            };
            let right = samples[(left_index + 1) as usize];
            let t = (self.phase - floor) as f32;
            output.push(left + (right - left) * t);
            self.phase += step;
        }

        self.phase -= len as f64;
        self.previous = Some(samples[len - 1]);
        output
    }
}

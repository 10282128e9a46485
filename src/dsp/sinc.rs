//! Windowed-sinc low-pass FIR filter.
//!
//! The kernel is a truncated sinc at the corner frequency, tapered with a
//! Blackman window and normalized to unity DC gain. It can run as a streaming
//! effect (per-channel history that persists across buffers) or as a one-shot
//! offline pass over a whole buffer.

use std::f64::consts::PI;

use crate::error::SynthError;

use super::buffer::{AudioBuffer, MAX_CHANNELS};
use super::effect::Effect;
use super::ring::RingBuffer;

/// Kernel length used when none is configured.
pub const DEFAULT_FILTER_LENGTH: usize = 64;
/// Longest kernel accepted, in taps.
pub const MAX_FILTER_LENGTH: usize = 4096;

/// Ideal low-pass impulse response at tap `i` of an `m`-tap kernel.
///
/// `corner` is normalized to the sample rate (0.0 to 0.5).
pub fn sinc(corner: f64, m: usize, i: usize) -> f64 {
    let x = i as f64 - (m / 2) as f64;
    if x == 0.0 {
        2.0 * PI * corner
    } else {
        (2.0 * PI * corner * x).sin() / x
    }
}

/// Blackman taper of `value` at tap `i` of an `m`-tap kernel.
pub fn blackman_window(value: f64, m: usize, i: usize) -> f64 {
    let m = m as f64;
    let i = i as f64;
    value * (0.42 - 0.5 * (2.0 * PI * i / m).cos() + 0.08 * (4.0 * PI * i / m).cos())
}

/// Kernel lengths are even; odd requests are bumped by one.
/// `None` if bumping would overflow.
pub fn even_length(filter_length: usize) -> Option<usize> {
    filter_length.checked_add(filter_length % 2)
}

/// Build a normalized low-pass kernel.
///
/// Fails when the length is zero or over `MAX_FILTER_LENGTH`, the corner is
/// outside [0, 0.5], or the raw coefficients sum to (effectively) zero and
/// cannot be normalized.
pub fn design_lowpass_kernel(filter_length: usize, corner: f64) -> Result<Vec<f32>, SynthError> {
    let m = even_length(filter_length)
        .filter(|&m| m > 0 && m <= MAX_FILTER_LENGTH)
        .ok_or(SynthError::InvalidFilterLength { length: filter_length })?;
    if !(0.0..=0.5).contains(&corner) {
        return Err(SynthError::InvalidCornerFrequency { corner });
    }
    let raw: Vec<f64> = (0..m)
        .map(|i| blackman_window(sinc(corner, m, i), m, i))
        .collect();

    let sum: f64 = raw.iter().sum();
    if !sum.is_finite() || sum.abs() < f64::EPSILON {
        return Err(SynthError::DegenerateKernel { sum });
    }
    Ok(raw.iter().map(|&k| (k / sum) as f32).collect())
}

/// Streaming low-pass filter with one history ring per channel.
#[derive(Debug, Clone)]
pub struct SincFilter {
    kernel: Vec<f32>,
    history: Vec<RingBuffer>,
    corner: f64,
}

impl SincFilter {
    pub fn new(channels: usize, filter_length: usize, corner: f64) -> Result<Self, SynthError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(SynthError::InvalidChannelCount { channels });
        }
        let kernel = design_lowpass_kernel(filter_length, corner)?;
        let history = (0..channels).map(|_| RingBuffer::new(kernel.len())).collect();
        Ok(SincFilter {
            kernel,
            history,
            corner,
        })
    }

    pub fn kernel(&self) -> &[f32] {
        &self.kernel
    }

    pub fn filter_length(&self) -> usize {
        self.kernel.len()
    }

    pub fn corner_frequency(&self) -> f64 {
        self.corner
    }

    pub fn channels(&self) -> usize {
        self.history.len()
    }

    /// Push one input sample into `channel`'s history and return the filtered output.
    #[inline]
    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        let ring = &mut self.history[channel];
        ring.push(input);
        self.kernel
            .iter()
            .enumerate()
            .map(|(k, &coeff)| ring.recent(k) * coeff)
            .sum()
    }

    /// Zero the streaming history. Capacity is unchanged.
    pub fn reset_filter(&mut self) {
        for ring in self.history.iter_mut() {
            ring.clear();
        }
    }

    /// Low-pass a whole buffer in one pass with a freshly designed kernel.
    ///
    /// History starts at zero for every channel, so nothing leaks between
    /// channels or from earlier calls.
    pub fn filter_offline(
        buffer: &mut AudioBuffer,
        corner: f64,
        filter_length: usize,
    ) -> Result<(), SynthError> {
        let kernel = design_lowpass_kernel(filter_length, corner)?;
        let len = kernel.len();
        let mut history = vec![0.0_f32; len];
        for channel in buffer.channels_mut() {
            history.fill(0.0);
            for sample in channel.iter_mut() {
                history.copy_within(1.., 0);
                history[len - 1] = *sample;
                *sample = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, &coeff)| history[len - 1 - k] * coeff)
                    .sum();
            }
        }
        Ok(())
    }
}

impl Effect for SincFilter {
    fn name(&self) -> &'static str {
        "lowpass"
    }

    fn apply(&mut self, buffer: &mut AudioBuffer) {
        let channels = buffer.channel_count().min(self.history.len());
        for c in 0..channels {
            for i in 0..buffer.frames() {
                let input = buffer.channel(c)[i];
                buffer.channel_mut(c)[i] = self.process_sample(c, input);
            }
        }
    }

    fn reset(&mut self) {
        self.reset_filter();
    }
}

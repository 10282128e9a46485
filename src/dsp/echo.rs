//! Echo effect — single-tap delay line that feeds its output back in.

use crate::error::SynthError;

use super::buffer::{AudioBuffer, MAX_CHANNELS};
use super::effect::Effect;
use super::math::sample_from_time;

/// Echo gain used when none is given.
pub const DEFAULT_DECAY: f32 = 0.5;
/// Longest delay line accepted, in samples.
pub const MAX_DELAY_SAMPLES: usize = 1 << 22;

/// A per-channel circular delay with one shared tap position.
///
/// Each output sample is `input + decay * line[pos]`, and that sum is
/// written back into the line, so an impulse repeats every `capacity`
/// samples scaled by successive powers of `decay`. The tap advances once
/// per frame, keeping every channel at the same delay.
#[derive(Debug, Clone)]
pub struct Echo {
    lines: Vec<Vec<f32>>,
    pos: usize,
    capacity: usize,
    sample_rate: u32,
    delay_time: f64,
    decay: f32,
}

impl Echo {
    /// Create an echo for `channels` channels with a delay of `delay_time` seconds.
    ///
    /// Fails when the delay is not positive, rounds to zero samples, or is
    /// longer than `MAX_DELAY_SAMPLES`.
    pub fn new(channels: usize, sample_rate: u32, delay_time: f64) -> Result<Self, SynthError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(SynthError::InvalidChannelCount { channels });
        }
        if !(delay_time > 0.0) || !delay_time.is_finite() {
            return Err(SynthError::InvalidDelayTime { delay_time });
        }
        let capacity = sample_from_time(sample_rate, delay_time);
        if capacity == 0 || capacity > MAX_DELAY_SAMPLES {
            return Err(SynthError::InvalidDelayTime { delay_time });
        }
        Ok(Echo {
            lines: vec![vec![0.0; capacity]; channels],
            pos: 0,
            capacity,
            sample_rate,
            delay_time,
            decay: DEFAULT_DECAY,
        })
    }

    /// Create an echo with a specific decay.
    pub fn with_decay(
        channels: usize,
        sample_rate: u32,
        delay_time: f64,
        decay: f32,
    ) -> Result<Self, SynthError> {
        let mut echo = Self::new(channels, sample_rate, delay_time)?;
        echo.set_decay(decay);
        Ok(echo)
    }

    /// Set the echo gain, clamped to [0, 1].
    pub fn set_decay(&mut self, decay: f32) {
        self.decay = if decay.is_nan() { 0.0 } else { decay.clamp(0.0, 1.0) };
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Delay length in samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn delay_time(&self) -> f64 {
        self.delay_time
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.lines.len()
    }

    /// Current tap position, always in [0, capacity).
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Effect for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn apply(&mut self, buffer: &mut AudioBuffer) {
        let channels = buffer.channel_count().min(self.lines.len());
        for n in 0..buffer.frames() {
            for c in 0..channels {
                let line = &mut self.lines[c];
                let sample = &mut buffer.channel_mut(c)[n];
                let mixed = *sample + self.decay * line[self.pos];
                line[self.pos] = mixed;
                *sample = mixed;
            }
            self.pos = (self.pos + 1) % self.capacity;
        }
    }

    fn reset(&mut self) {
        for line in self.lines.iter_mut() {
            line.fill(0.0);
        }
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(samples: Vec<f32>) -> AudioBuffer {
        AudioBuffer::from_channels(vec![samples]).unwrap()
    }

    fn impulse(len: usize) -> AudioBuffer {
        let mut data = vec![0.0; len];
        data[0] = 1.0;
        mono(data)
    }

    #[test]
    fn rejects_non_positive_delay() {
        assert!(matches!(
            Echo::new(2, 44100, 0.0),
            Err(SynthError::InvalidDelayTime { .. })
        ));
        assert!(Echo::new(2, 44100, -0.5).is_err());
        assert!(Echo::new(2, 44100, f64::NAN).is_err());
        // rounds to zero samples
        assert!(Echo::new(2, 1000, 0.0001).is_err());
        assert!(Echo::new(0, 1000, 0.01).is_err());
    }

    #[test]
    fn rejects_oversized_delay() {
        for delay_time in [1e300, f64::MAX, 1e6] {
            assert!(
                matches!(
                    Echo::new(2, 44100, delay_time),
                    Err(SynthError::InvalidDelayTime { .. })
                ),
                "delay {delay_time} should be rejected"
            );
        }
        assert!(Echo::new(2, u32::MAX, 60.0).is_err());
        assert!(Echo::new(MAX_CHANNELS + 1, 1000, 0.01).is_err());
        let longest = MAX_DELAY_SAMPLES as f64 / 1000.0;
        assert_eq!(Echo::new(1, 1000, longest).unwrap().capacity(), MAX_DELAY_SAMPLES);
    }

    #[test]
    fn capacity_from_delay_time() {
        let echo = Echo::new(2, 1000, 0.01).unwrap();
        assert_eq!(echo.capacity(), 10);
        let echo = Echo::new(2, 44100, 0.25).unwrap();
        assert_eq!(echo.capacity(), 11025);
    }

    #[test]
    fn decay_is_clamped() {
        let mut echo = Echo::new(1, 1000, 0.01).unwrap();
        echo.set_decay(1.5);
        assert_eq!(echo.decay(), 1.0);
        echo.set_decay(-0.2);
        assert_eq!(echo.decay(), 0.0);
        echo.set_decay(f32::NAN);
        assert_eq!(echo.decay(), 0.0);
    }

    #[test]
    fn impulse_repeats_with_decaying_taps() {
        let mut echo = Echo::with_decay(1, 1000, 0.01, 0.5).unwrap();
        let mut buf = impulse(35);
        echo.apply(&mut buf);

        let out = buf.channel(0);
        for (n, &s) in out.iter().enumerate() {
            let expected = match n {
                0 => 1.0,
                10 => 0.5,
                20 => 0.25,
                30 => 0.125,
                _ => 0.0,
            };
            assert!((s - expected).abs() < 1e-6, "sample {n}: expected {expected}, got {s}");
        }
    }

    #[test]
    fn state_carries_across_buffers() {
        let mut echo = Echo::with_decay(1, 1000, 0.01, 0.5).unwrap();
        let mut first = impulse(6);
        echo.apply(&mut first);
        let mut second = mono(vec![0.0; 6]);
        echo.apply(&mut second);
        // impulse at frame 0 returns at frame 10 = index 4 of the second block
        assert!((second.channel(0)[4] - 0.5).abs() < 1e-6);
        assert_eq!(echo.position(), 2);
    }

    #[test]
    fn reset_reproduces_sequence() {
        let mut echo = Echo::with_decay(1, 1000, 0.01, 0.5).unwrap();
        let mut a = impulse(40);
        echo.apply(&mut a);
        echo.reset();
        assert_eq!(echo.position(), 0);
        assert_eq!(echo.capacity(), 10);
        let mut b = impulse(40);
        echo.apply(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn second_impulse_stacks_on_first_echo() {
        let mut echo = Echo::with_decay(1, 1000, 0.01, 0.5).unwrap();
        let mut data = vec![0.0; 31];
        data[0] = 1.0;
        data[10] = 1.0;
        let mut buf = mono(data);
        echo.apply(&mut buf);
        let out = buf.channel(0);
        assert!((out[0] - 1.0).abs() < 1e-6);
        assert!(out[1..10].iter().all(|s| s.abs() < 1e-6));
        assert!((out[10] - 1.5).abs() < 1e-6);
        assert!((out[20] - 0.75).abs() < 1e-6);
        assert!((out[30] - 0.375).abs() < 1e-6);
    }

    #[test]
    fn channels_share_tap_position() {
        let mut echo = Echo::with_decay(2, 1000, 0.005, 1.0).unwrap();
        let mut buf = AudioBuffer::from_channels(vec![
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ])
        .unwrap();
        buf.channel_mut(1)[0] = -1.0;
        echo.apply(&mut buf);
        assert_eq!(buf.channel(0)[5], 1.0);
        assert_eq!(buf.channel(1)[5], -1.0);
        assert_eq!(echo.position(), 1);
    }
}

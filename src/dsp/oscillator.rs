//! Base waveforms evaluated from (frequency, time).
//!
//! Each generator is stateless; the caller owns the time accumulator.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Supported waveform shapes.
///
/// Names that are not recognised deserialize to `Silent`, which renders
/// zeros instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    #[serde(alias = "saw")]
    Sawtooth,
    Square,
    #[default]
    Triangle,
    #[serde(alias = "noise")]
    WhiteNoise,
    #[serde(other)]
    Silent,
}

impl Waveform {
    /// Map a host integer tag to a waveform. Unknown tags are silent.
    pub fn from_tag(tag: i32) -> Self {
        match tag {
            0 => Waveform::Sine,
            1 => Waveform::Sawtooth,
            2 => Waveform::Square,
            3 => Waveform::Triangle,
            4 => Waveform::WhiteNoise,
            _ => {
                log::warn!("Unknown waveform tag {tag}, rendering silence");
                Waveform::Silent
            }
        }
    }

    /// Parse a waveform name. Unknown names are silent.
    pub fn from_name(name: &str) -> Self {
        match name {
            "sine" => Waveform::Sine,
            "sawtooth" | "saw" => Waveform::Sawtooth,
            "square" => Waveform::Square,
            "triangle" => Waveform::Triangle,
            "whitenoise" | "noise" => Waveform::WhiteNoise,
            _ => Waveform::Silent,
        }
    }

    /// Evaluate the waveform at `time` seconds. `note` seeds the noise source.
    pub fn evaluate(self, note: u8, frequency: f64, time: f64) -> f64 {
        match self {
            Waveform::Sine => sine(frequency, time),
            Waveform::Sawtooth => sawtooth(frequency, time),
            Waveform::Square => square(frequency, time),
            Waveform::Triangle => triangle(frequency, time),
            Waveform::WhiteNoise => white_noise(note, time),
            Waveform::Silent => 0.0,
        }
    }
}

/// Position within the current cycle, in [0, 1).
fn cycle_phase(frequency: f64, time: f64) -> f64 {
    (frequency * time).rem_euclid(1.0)
}

pub fn sine(frequency: f64, time: f64) -> f64 {
    (2.0 * PI * frequency * time).sin()
}

/// Rises from -1 to +1 over one cycle, then drops.
pub fn sawtooth(frequency: f64, time: f64) -> f64 {
    2.0 * cycle_phase(frequency, time) - 1.0
}

pub fn square(frequency: f64, time: f64) -> f64 {
    if cycle_phase(frequency, time) < 0.5 {
        1.0
    } else {
        -1.0
    }
}

/// Piecewise linear: -1→+1 over the first half cycle, +1→-1 over the second.
pub fn triangle(frequency: f64, time: f64) -> f64 {
    let phase = cycle_phase(frequency, time);
    if phase < 0.5 {
        4.0 * phase - 1.0
    } else {
        3.0 - 4.0 * phase
    }
}

/// White noise in [-1, 1], reproducible for a given (note, time) pair.
///
/// The note seeds the generator and the bit pattern of `time` selects the
/// position in the sequence, so two voices at the same note and time agree.
pub fn white_noise(note: u8, time: f64) -> f64 {
    let seed = (note as u32).wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let bits = time.to_bits();
    let mut state = seed ^ (bits as u32) ^ ((bits >> 32) as u32).rotate_left(16);
    for _ in 0..3 {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        state ^= state >> 15;
    }
    (state as f64 / u32::MAX as f64) * 2.0 - 1.0
}

//! Synthesis math — pitch, time, and amplitude helpers.
//!
//! Everything here is a pure function of its arguments.

/// MIDI note number of A4.
pub const A4_NOTE: i32 = 69;
/// Standard concert pitch for A4 in Hz.
pub const A4_FREQUENCY: f64 = 440.0;

/// Equal-temperament frequency of a MIDI note at A4 = 440 Hz.
pub fn note_to_frequency(note: u8) -> f64 {
    midi_to_frequency(note as i32, A4_FREQUENCY)
}

/// Convert a MIDI note number to frequency using the given tuning pitch.
///
/// `tuning_pitch` is the frequency of A4 (MIDI 69).
/// Formula: `tuning_pitch * 2^((midi - 69) / 12)`
pub fn midi_to_frequency(midi: i32, tuning_pitch: f64) -> f64 {
    tuning_pitch * semitones_to_ratio((midi - A4_NOTE) as f64)
}

/// Frequency ratio of an interval in (possibly fractional) semitones.
pub fn semitones_to_ratio(semitones: f64) -> f64 {
    (2.0_f64).powf(semitones / 12.0)
}

/// Number of samples covering `seconds` at `sample_rate`, rounded to nearest.
///
/// Negative or NaN durations map to zero samples.
pub fn sample_from_time(sample_rate: u32, seconds: f64) -> usize {
    let samples = (sample_rate as f64 * seconds).round();
    if samples.is_nan() || samples <= 0.0 {
        0
    } else {
        samples as usize
    }
}

/// Linear gain for a MIDI velocity (0..=127).
pub fn velocity_to_gain(velocity: u8) -> f64 {
    velocity.min(127) as f64 / 127.0
}

/// Left/right gains for a balance pan in [-1, 1].
///
/// Centre leaves both channels at unity; panning attenuates the far side only.
pub fn balance_gains(pan: f64) -> (f64, f64) {
    let pan = if pan.is_nan() { 0.0 } else { pan.clamp(-1.0, 1.0) };
    ((1.0 - pan).min(1.0), (1.0 + pan).min(1.0))
}

/// Hard clamp to the [-1, 1] amplitude range.
pub fn clamp_unit(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

/// Soft clipper using tanh to prevent harsh digital clipping.
pub fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        assert!((note_to_frequency(69) - 440.0).abs() < 1e-9);
    }

    #[test]
    fn c4_frequency() {
        let c4 = note_to_frequency(60);
        assert!((c4 - 261.6256).abs() < 0.001, "C4 should be ~261.63 Hz, got {c4}");
    }

    #[test]
    fn octave_doubles_frequency() {
        for note in 0..116u8 {
            let ratio = note_to_frequency(note + 12) / note_to_frequency(note);
            assert!((ratio - 2.0).abs() < 1e-9, "Octave ratio off at note {note}");
        }
    }

    #[test]
    fn frequency_monotonic_in_note() {
        for note in 0..127u8 {
            assert!(
                note_to_frequency(note + 1) > note_to_frequency(note),
                "Frequency should rise from note {note} to {}",
                note + 1
            );
        }
    }

    #[test]
    fn tuning_432() {
        assert!((midi_to_frequency(69, 432.0) - 432.0).abs() < 1e-9);
    }

    #[test]
    fn sample_from_time_rounds() {
        assert_eq!(sample_from_time(1000, 0.01), 10);
        assert_eq!(sample_from_time(44100, 0.5), 22050);
        // 44100 * 0.00001 = 0.441 -> 0, 44100 * 0.00002 = 0.882 -> 1
        assert_eq!(sample_from_time(44100, 0.00001), 0);
        assert_eq!(sample_from_time(44100, 0.00002), 1);
    }

    #[test]
    fn sample_from_time_rejects_negative() {
        assert_eq!(sample_from_time(44100, -1.0), 0);
        assert_eq!(sample_from_time(44100, f64::NAN), 0);
    }

    #[test]
    fn velocity_gain_range() {
        assert_eq!(velocity_to_gain(0), 0.0);
        assert!((velocity_to_gain(127) - 1.0).abs() < 1e-12);
        assert!((velocity_to_gain(200) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn balance_centre_and_sides() {
        assert_eq!(balance_gains(0.0), (1.0, 1.0));
        assert_eq!(balance_gains(-1.0), (1.0, 0.0));
        assert_eq!(balance_gains(1.0), (0.0, 1.0));
        let (l, r) = balance_gains(0.5);
        assert!((l - 0.5).abs() < 1e-12 && (r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn soft_clip_bounded() {
        assert!(soft_clip(100.0) <= 1.0);
        assert!(soft_clip(-100.0) >= -1.0);
        assert_eq!(clamp_unit(3.0), 1.0);
    }
}

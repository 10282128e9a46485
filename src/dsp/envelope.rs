//! AHDSR envelope — stage timing in samples and the gain generator.

use serde::{Deserialize, Serialize};

use super::math::sample_from_time;

pub const DEFAULT_ATTACK: f64 = 0.01;
pub const DEFAULT_HOLD: f64 = 0.02;
pub const DEFAULT_DECAY: f64 = 0.1;
pub const DEFAULT_RELEASE: f64 = 0.3;
pub const DEFAULT_SUSTAIN: f64 = 0.7;

/// Envelope stage durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeTimes {
    pub attack: f64,
    pub hold: f64,
    pub decay: f64,
    pub release: f64,
}

impl Default for EnvelopeTimes {
    fn default() -> Self {
        EnvelopeTimes {
            attack: DEFAULT_ATTACK,
            hold: DEFAULT_HOLD,
            decay: DEFAULT_DECAY,
            release: DEFAULT_RELEASE,
        }
    }
}

impl EnvelopeTimes {
    /// Derive all four stage lengths at once for `sample_rate`.
    pub fn to_counts(&self, sample_rate: u32) -> EnvelopeCounts {
        EnvelopeCounts {
            attack: sample_from_time(sample_rate, self.attack),
            hold: sample_from_time(sample_rate, self.hold),
            decay: sample_from_time(sample_rate, self.decay),
            release: sample_from_time(sample_rate, self.release),
        }
    }
}

/// Envelope stage lengths in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvelopeCounts {
    pub attack: usize,
    pub hold: usize,
    pub decay: usize,
    pub release: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
}

/// Linear AHDSR gain generator driven by precomputed sample counts.
#[derive(Debug, Clone)]
pub struct Envelope {
    counts: EnvelopeCounts,
    sustain: f64,
    stage: Stage,
    level: f64,
    stage_counter: usize,
    /// Level at the start of the current stage (for retrigger and release).
    start_level: f64,
}

impl Envelope {
    /// `sustain` is clamped to [0, 1]; NaN sustains at silence.
    pub fn new(counts: EnvelopeCounts, sustain: f64) -> Self {
        Envelope {
            counts,
            sustain: if sustain.is_nan() { 0.0 } else { sustain.clamp(0.0, 1.0) },
            stage: Stage::Idle,
            level: 0.0,
            stage_counter: 0,
            start_level: 0.0,
        }
    }

    pub fn counts(&self) -> EnvelopeCounts {
        self.counts
    }

    /// Trigger the envelope (note on).
    pub fn gate_on(&mut self) {
        self.stage = Stage::Attack;
        self.stage_counter = 0;
        self.start_level = self.level;
    }

    /// Release the envelope (note off).
    pub fn gate_off(&mut self) {
        if self.stage == Stage::Idle || self.stage == Stage::Release {
            return;
        }
        self.stage = Stage::Release;
        self.stage_counter = 0;
        self.start_level = self.level;
    }

    /// Generate the next gain value in [0, 1].
    ///
    /// Each stage lasts exactly its sample count; zero-length stages are
    /// skipped without consuming a sample.
    pub fn next_gain(&mut self) -> f64 {
        loop {
            match self.stage {
                Stage::Idle => {
                    self.level = 0.0;
                    return self.level;
                }
                Stage::Attack => {
                    let from = self.start_level;
                    if self.ramp(self.counts.attack, from, 1.0, Stage::Hold) {
                        return self.level;
                    }
                }
                Stage::Hold => {
                    if self.stage_counter >= self.counts.hold {
                        self.enter(Stage::Decay);
                        continue;
                    }
                    self.stage_counter += 1;
                    self.level = 1.0;
                    return self.level;
                }
                Stage::Decay => {
                    if self.ramp(self.counts.decay, 1.0, self.sustain, Stage::Sustain) {
                        return self.level;
                    }
                }
                Stage::Sustain => {
                    self.level = self.sustain;
                    return self.level;
                }
                Stage::Release => {
                    let from = self.start_level;
                    if self.ramp(self.counts.release, from, 0.0, Stage::Idle) {
                        return self.level;
                    }
                }
            }
        }
    }

    /// Returns true if the envelope is idle (never started or fully released).
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn is_released(&self) -> bool {
        matches!(self.stage, Stage::Release | Stage::Idle)
    }

    /// Step a linear segment of `len` samples from `from` to `to`.
    /// Returns false when the segment is empty and `next` was entered
    /// without producing a sample.
    fn ramp(&mut self, len: usize, from: f64, to: f64, next: Stage) -> bool {
        if len == 0 {
            self.level = to;
            self.enter(next);
            return false;
        }
        self.stage_counter += 1;
        let t = self.stage_counter as f64 / len as f64;
        self.level = from + (to - from) * t;
        if self.stage_counter >= len {
            self.level = to;
            self.enter(next);
        }
        true
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.stage_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(attack: usize, hold: usize, decay: usize, release: usize) -> EnvelopeCounts {
        EnvelopeCounts { attack, hold, decay, release }
    }

    #[test]
    fn starts_idle() {
        let env = Envelope::new(EnvelopeCounts::default(), 0.7);
        assert!(env.is_finished());
    }

    #[test]
    fn counts_follow_sample_rate() {
        let times = EnvelopeTimes { attack: 0.01, hold: 0.02, decay: 0.1, release: 0.3 };
        assert_eq!(times.to_counts(1000), counts(10, 20, 100, 300));
        assert_eq!(times.to_counts(44100), counts(441, 882, 4410, 13230));
    }

    #[test]
    fn attack_ramps_linearly_to_one() {
        let mut env = Envelope::new(counts(4, 0, 0, 0), 0.5);
        env.gate_on();
        let ramp: Vec<f64> = (0..4).map(|_| env.next_gain()).collect();
        assert_eq!(ramp, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn hold_keeps_full_level() {
        let mut env = Envelope::new(counts(1, 3, 2, 0), 0.5);
        env.gate_on();
        assert_eq!(env.next_gain(), 1.0);
        for _ in 0..3 {
            assert_eq!(env.next_gain(), 1.0);
        }
        assert!((env.next_gain() - 0.75).abs() < 1e-12, "Decay should start after hold");
    }

    #[test]
    fn sustain_holds() {
        let mut env = Envelope::new(counts(2, 2, 2, 10), 0.6);
        env.gate_on();
        for _ in 0..20 {
            env.next_gain();
        }
        let s = env.next_gain();
        assert!((s - 0.6).abs() < 1e-12, "Should sustain at 0.6, got {s}");
    }

    #[test]
    fn nan_sustain_is_silent() {
        let mut env = Envelope::new(counts(0, 0, 0, 0), f64::NAN);
        env.gate_on();
        let s = env.next_gain();
        assert_eq!(s, 0.0, "NaN sustain should hold at 0, got {s}");

        let mut env = Envelope::new(counts(2, 0, 2, 2), f64::NAN);
        env.gate_on();
        let gains: Vec<f64> = (0..8).map(|_| env.next_gain()).collect();
        assert!(gains.iter().all(|g| g.is_finite()), "got {gains:?}");
        assert_eq!(gains[7], 0.0);
    }

    #[test]
    fn release_to_zero() {
        let mut env = Envelope::new(counts(2, 0, 2, 5), 0.7);
        env.gate_on();
        for _ in 0..10 {
            env.next_gain();
        }
        env.gate_off();
        assert!(env.is_released());
        for _ in 0..10 {
            env.next_gain();
        }
        assert!(env.is_finished(), "Should be finished after release");
        assert_eq!(env.next_gain(), 0.0);
    }

    #[test]
    fn zero_length_stages_jump_through() {
        let mut env = Envelope::new(EnvelopeCounts::default(), 0.4);
        env.gate_on();
        let s = env.next_gain();
        assert!((s - 0.4).abs() < 1e-12, "Empty stages should land on sustain, got {s}");
        assert!((env.next_gain() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn full_cycle_range() {
        let mut env = Envelope::new(EnvelopeTimes::default().to_counts(44100), DEFAULT_SUSTAIN);
        env.gate_on();
        for _ in 0..10000 {
            let s = env.next_gain();
            assert!((0.0..=1.0).contains(&s), "Envelope out of range: {s}");
        }
        env.gate_off();
        for _ in 0..20000 {
            let s = env.next_gain();
            assert!((0.0..=1.0).contains(&s), "Envelope out of range after release: {s}");
        }
        assert!(env.is_finished());
    }
}

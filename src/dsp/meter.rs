//! Level meter — observes per-channel decibel levels without touching audio.
//!
//! Levels are reported as the magnitude of the dBFS value, so a full-scale
//! signal reads 0 and quieter signals read larger numbers. Two strategies
//! exist: a fast one that looks at a single sample per buffer, and an RMS one
//! that averages the whole buffer. Each keeps its own peak tracker.

use serde::{Deserialize, Serialize};

use super::buffer::AudioBuffer;
use super::effect::Effect;

/// Starting peak for the RMS strategy.
pub const RMS_PEAK_START: f64 = 1.0;
/// Starting peak for the fast strategy.
pub const FAST_PEAK_START: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeterMode {
    /// First sample of each buffer only.
    Fast,
    /// Root-mean-square over the whole buffer.
    #[default]
    Rms,
}

/// Latest levels and peaks, left then right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterReading {
    pub mode: MeterMode,
    pub left: f64,
    pub right: f64,
    pub left_peak: f64,
    pub right_peak: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PeakTracker {
    peaks: [f64; 2],
}

impl PeakTracker {
    fn starting_at(value: f64) -> Self {
        PeakTracker { peaks: [value; 2] }
    }

    /// Non-finite levels (a silent channel) never raise the peak.
    fn observe(&mut self, channel: usize, level: f64) {
        if level.is_finite() && level > self.peaks[channel] {
            self.peaks[channel] = level;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Strategy {
    Fast(PeakTracker),
    Rms(PeakTracker),
}

impl Strategy {
    fn fresh(mode: MeterMode) -> Self {
        match mode {
            MeterMode::Fast => Strategy::Fast(PeakTracker::starting_at(FAST_PEAK_START)),
            MeterMode::Rms => Strategy::Rms(PeakTracker::starting_at(RMS_PEAK_START)),
        }
    }

    fn mode(&self) -> MeterMode {
        match self {
            Strategy::Fast(_) => MeterMode::Fast,
            Strategy::Rms(_) => MeterMode::Rms,
        }
    }

    fn tracker(&self) -> &PeakTracker {
        match self {
            Strategy::Fast(t) | Strategy::Rms(t) => t,
        }
    }
}

/// Magnitude of the dB value of a single sample.
pub fn fast_level(sample: f32) -> f64 {
    let s = sample as f64;
    (20.0 * (s * s).sqrt().log10()).abs()
}

/// Magnitude of the dB value of the RMS of `samples`.
pub fn rms_level(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return f64::INFINITY;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (20.0 * (sum / samples.len() as f64).sqrt().log10()).abs()
}

/// Tracks left/right levels of whatever passes through it.
///
/// A mono buffer reports its single channel as both left and right. Channels
/// past the second are not metered.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    strategy: Strategy,
    levels: [f64; 2],
}

impl LevelMeter {
    pub fn new(mode: MeterMode) -> Self {
        LevelMeter {
            strategy: Strategy::fresh(mode),
            levels: [0.0; 2],
        }
    }

    pub fn mode(&self) -> MeterMode {
        self.strategy.mode()
    }

    /// Select a strategy. Peaks always restart from that strategy's start value.
    pub fn set_mode(&mut self, mode: MeterMode) {
        self.strategy = Strategy::fresh(mode);
    }

    pub fn set_fast(&mut self, fast: bool) {
        self.set_mode(if fast { MeterMode::Fast } else { MeterMode::Rms });
    }

    pub fn is_fast(&self) -> bool {
        self.mode() == MeterMode::Fast
    }

    pub fn reading(&self) -> MeterReading {
        let peaks = self.strategy.tracker().peaks;
        MeterReading {
            mode: self.mode(),
            left: self.levels[0],
            right: self.levels[1],
            left_peak: peaks[0],
            right_peak: peaks[1],
        }
    }

    /// Measure `buffer` and update levels and peaks.
    pub fn measure(&mut self, buffer: &AudioBuffer) {
        if buffer.channel_count() == 0 || buffer.is_empty() {
            return;
        }
        let metered = buffer.channel_count().min(2);
        for c in 0..metered {
            let channel = buffer.channel(c);
            let level = match self.strategy {
                Strategy::Fast(_) => fast_level(channel[0]),
                Strategy::Rms(_) => rms_level(channel),
            };
            self.record(c, level);
        }
        if metered == 1 {
            let level = self.levels[0];
            self.record(1, level);
        }
    }

    fn record(&mut self, channel: usize, level: f64) {
        self.levels[channel] = level;
        match &mut self.strategy {
            Strategy::Fast(t) | Strategy::Rms(t) => t.observe(channel, level),
        }
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(MeterMode::default())
    }
}

impl Effect for LevelMeter {
    fn name(&self) -> &'static str {
        "meter"
    }

    fn apply(&mut self, buffer: &mut AudioBuffer) {
        self.measure(buffer);
    }

    fn reset(&mut self) {
        self.strategy = Strategy::fresh(self.mode());
        self.levels = [0.0; 2];
    }

    fn as_meter(&self) -> Option<&LevelMeter> {
        Some(self)
    }
}

//! Sample-bank regions — which sample plays for a (channel, note, velocity).

use serde::{Deserialize, Serialize};

use crate::error::RegionError;

use super::math::semitones_to_ratio;

/// How a region's sample loops during playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Play once to the end of the sample.
    #[default]
    None,
    /// Loop between the loop points for as long as the voice sounds.
    Continuous,
    /// Loop while the note is held, then play through after release.
    Sustain,
}

/// One zone of a sample bank. Immutable once built from bank data.
///
/// All key, velocity and channel ranges are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Region {
    /// Index into the externally owned sample pool.
    pub sample_index: usize,
    /// The MIDI note the sample was recorded at.
    pub root_note: u8,
    /// Tuning offset in semitones, nominally -1..1.
    pub tune: f64,
    pub lo_note: u8,
    pub hi_note: u8,
    pub lo_velocity: u8,
    pub hi_velocity: u8,
    pub lo_channel: u8,
    pub hi_channel: u8,
    /// Loop points as sample offsets.
    pub loop_start: u64,
    pub loop_end: u64,
    pub loop_mode: LoopMode,
    /// Linear gain.
    pub volume: f64,
    /// Balance, -1 (left) to 1 (right).
    pub pan: f64,
    /// Send levels in percent (0..=100).
    pub stereo_send: f64,
    pub reverb_send: f64,
    pub chorus_send: f64,
    /// Sample offset where playback starts.
    pub offset: u64,
}

impl Default for Region {
    fn default() -> Self {
        Region {
            sample_index: 0,
            root_note: 60,
            tune: 0.0,
            lo_note: 0,
            hi_note: 127,
            lo_velocity: 0,
            hi_velocity: 127,
            lo_channel: 0,
            hi_channel: 15,
            loop_start: 0,
            loop_end: 0,
            loop_mode: LoopMode::None,
            volume: 1.0,
            pan: 0.0,
            stereo_send: 0.0,
            reverb_send: 0.0,
            chorus_send: 0.0,
            offset: 0,
        }
    }
}

impl Region {
    /// True iff channel, note and velocity each fall inside this region's ranges.
    pub fn matches(&self, channel: u8, note: u8, velocity: u8) -> bool {
        (self.lo_channel..=self.hi_channel).contains(&channel)
            && (self.lo_note..=self.hi_note).contains(&note)
            && (self.lo_velocity..=self.hi_velocity).contains(&velocity)
    }

    /// True if any channel/velocity of this region covers `note`.
    pub fn covers_note(&self, note: u8) -> bool {
        (self.lo_note..=self.hi_note).contains(&note)
    }

    /// Playback rate so `note` sounds at pitch: 1.0 at the root, 2.0 an octave up.
    pub fn playback_rate(&self, note: u8) -> f64 {
        semitones_to_ratio(note as f64 - self.root_note as f64 + self.tune)
    }

    /// Check ranges and bounds of bank data.
    pub fn validate(&self) -> Result<(), RegionError> {
        check_range("note", self.lo_note, self.hi_note, 127)?;
        check_range("velocity", self.lo_velocity, self.hi_velocity, 127)?;
        check_range("channel", self.lo_channel, self.hi_channel, 15)?;
        check_bounds("rootNote", self.root_note as f64, 0.0, 127.0)?;
        check_bounds("pan", self.pan, -1.0, 1.0)?;
        check_bounds("volume", self.volume, 0.0, f64::MAX)?;
        check_bounds("stereoSend", self.stereo_send, 0.0, 100.0)?;
        check_bounds("reverbSend", self.reverb_send, 0.0, 100.0)?;
        check_bounds("chorusSend", self.chorus_send, 0.0, 100.0)?;
        if !self.tune.is_finite() {
            return Err(RegionError::OutOfRange {
                field: "tune",
                value: self.tune,
                min: f64::MIN,
                max: f64::MAX,
            });
        }
        if self.loop_mode != LoopMode::None && self.loop_start > self.loop_end {
            return Err(RegionError::InvalidLoop {
                start: self.loop_start,
                end: self.loop_end,
            });
        }
        Ok(())
    }
}

fn check_range(field: &'static str, lo: u8, hi: u8, max: u8) -> Result<(), RegionError> {
    if lo > hi {
        return Err(RegionError::InvertedRange { field, lo, hi });
    }
    check_bounds(field, hi as f64, 0.0, max as f64)
}

fn check_bounds(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), RegionError> {
    if value.is_nan() || value < min || value > max {
        return Err(RegionError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Drop exact duplicates, keeping the first occurrence of each region.
pub fn dedup_regions(regions: Vec<Region>) -> Vec<Region> {
    let mut unique: Vec<Region> = Vec::with_capacity(regions.len());
    for region in regions {
        if !unique.contains(&region) {
            unique.push(region);
        }
    }
    unique
}

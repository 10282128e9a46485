//! Sample-bank instrument.
//!
//! Plays back recorded samples selected by region matching, with
//! pitch-shifting via linear interpolation resampling, loop points, and
//! per-region volume and pan.

use std::sync::Arc;

use crate::error::SynthError;

use super::envelope::{DEFAULT_SUSTAIN, EnvelopeCounts, EnvelopeTimes};
use super::instrument::{Instrument, VoiceCursor};
use super::math::clamp_unit;
use super::region::{LoopMode, Region, dedup_regions};

/// A single sample buffer loaded into memory.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// Mono f64 samples.
    pub data: Vec<f64>,
    /// Native sample rate of the audio.
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f64>, sample_rate: u32) -> Self {
        SampleBuffer { data, sample_rate }
    }

    /// Create from 16-bit signed PCM data.
    pub fn from_i16(pcm: &[i16], sample_rate: u32) -> Self {
        let data: Vec<f64> = pcm.iter().map(|&s| s as f64 / 32768.0).collect();
        SampleBuffer { data, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read a sample with linear interpolation at a fractional position.
    /// Positions outside the buffer read as silence.
    pub fn read_interpolated(&self, position: f64) -> f64 {
        if self.data.is_empty() || !(position >= 0.0) {
            return 0.0;
        }

        let idx = position as usize;
        if idx >= self.data.len() - 1 {
            return if idx < self.data.len() {
                self.data[idx]
            } else {
                0.0
            };
        }

        let frac = position - idx as f64;
        self.data[idx] * (1.0 - frac) + self.data[idx + 1] * frac
    }
}

/// Instrument backed by a set of regions over a shared sample pool.
///
/// When regions overlap, the first match in bank order plays.
#[derive(Debug, Clone)]
pub struct SampleBankInstrument {
    sample_rate: u32,
    regions: Vec<Region>,
    samples: Arc<[SampleBuffer]>,
    times: EnvelopeTimes,
    counts: EnvelopeCounts,
    sustain: f64,
}

impl SampleBankInstrument {
    /// Build from parsed bank regions. Regions are validated, exact duplicates
    /// are dropped, and every sample reference must resolve in `samples`.
    pub fn new(
        sample_rate: u32,
        regions: Vec<Region>,
        samples: Arc<[SampleBuffer]>,
    ) -> Result<Self, SynthError> {
        for region in &regions {
            region.validate()?;
            if region.sample_index >= samples.len() {
                return Err(SynthError::MissingSample {
                    index: region.sample_index,
                    pool_size: samples.len(),
                });
            }
        }
        let before = regions.len();
        let regions = dedup_regions(regions);
        if regions.len() != before {
            log::debug!("Dropped {} duplicate sample-bank regions", before - regions.len());
        }
        let times = EnvelopeTimes::default();
        Ok(SampleBankInstrument {
            sample_rate,
            regions,
            samples,
            times,
            counts: times.to_counts(sample_rate),
            sustain: DEFAULT_SUSTAIN,
        })
    }

    pub fn with_envelope(mut self, times: EnvelopeTimes, sustain: f64) -> Self {
        self.times = times;
        self.counts = times.to_counts(self.sample_rate);
        self.sustain = if sustain.is_nan() { 0.0 } else { sustain.clamp(0.0, 1.0) };
        self
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// All regions matching a note event, in bank order.
    pub fn matching_regions(
        &self,
        channel: u8,
        note: u8,
        velocity: u8,
    ) -> impl Iterator<Item = &Region> {
        self.regions
            .iter()
            .filter(move |r| r.matches(channel, note, velocity))
    }

    /// The region that plays for a note event.
    pub fn find_region(&self, channel: u8, note: u8, velocity: u8) -> Option<&Region> {
        self.matching_regions(channel, note, velocity).next()
    }

    /// Read position in the region's sample after `time` seconds of playback.
    fn position(&self, region: &Region, buffer: &SampleBuffer, note: u8, cursor: &VoiceCursor) -> f64 {
        let mut position = region.offset as f64
            + cursor.time * buffer.sample_rate as f64 * region.playback_rate(note);

        let looping = match region.loop_mode {
            LoopMode::None => false,
            LoopMode::Continuous => true,
            LoopMode::Sustain => !cursor.released,
        };
        let loop_start = region.loop_start as f64;
        let loop_end = region.loop_end as f64;
        if looping && loop_end > loop_start && position >= loop_end {
            let loop_length = loop_end - loop_start;
            position = loop_start + (position - loop_end) % loop_length;
        }
        position
    }
}

impl Instrument for SampleBankInstrument {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Notes no region covers get an empty envelope.
    fn envelope(&self, note: u8) -> EnvelopeCounts {
        if self.regions.iter().any(|r| r.covers_note(note)) {
            self.counts
        } else {
            EnvelopeCounts::default()
        }
    }

    fn sustain_level(&self) -> f64 {
        self.sustain
    }

    fn enforce_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate {
            self.counts = self.times.to_counts(sample_rate);
            self.sample_rate = sample_rate;
        }
    }

    fn sample_at_time(
        &self,
        note: u8,
        channel: u8,
        _synth_sample_rate: u32,
        cursor: &mut VoiceCursor,
    ) -> f64 {
        let Some(region) = self.find_region(channel, note, cursor.velocity) else {
            return 0.0;
        };
        let buffer = &self.samples[region.sample_index];
        let position = self.position(region, buffer, note, cursor);
        clamp_unit(buffer.read_interpolated(position) * region.volume)
    }

    fn pan(&self, note: u8, channel: u8, velocity: u8) -> f64 {
        self.find_region(channel, note, velocity)
            .map_or(0.0, |r| r.pan)
    }
}

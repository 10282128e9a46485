//! Instrument contract and the waveform-generator instrument.
//!
//! An instrument produces one sample at a time for a sounding note and
//! reports how long each envelope stage lasts, in samples, at its current
//! sample rate. The time accumulator belongs to the caller (see `VoiceCursor`).

use super::envelope::{DEFAULT_SUSTAIN, EnvelopeCounts, EnvelopeTimes};
use super::math::note_to_frequency;
use super::oscillator::Waveform;
use super::sampler::SampleBankInstrument;

/// Output scale applied to generator instruments.
pub const DEFAULT_AMPLITUDE: f64 = 0.5;

/// Per-voice playback state owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceCursor {
    /// Seconds since the voice started (or since the last phase wrap).
    pub time: f64,
    pub velocity: u8,
    /// Set once the note has been released.
    pub released: bool,
}

impl VoiceCursor {
    pub fn new(velocity: u8) -> Self {
        VoiceCursor {
            time: 0.0,
            velocity,
            released: false,
        }
    }

    /// Move forward by one sample period.
    #[inline]
    pub fn advance(&mut self, sample_rate: u32) {
        if sample_rate > 0 {
            self.time += 1.0 / sample_rate as f64;
        }
    }
}

pub trait Instrument {
    /// Sample rate the envelope counts were derived for.
    fn sample_rate(&self) -> u32;

    /// All four envelope stage lengths for `note`, in samples.
    fn envelope(&self, note: u8) -> EnvelopeCounts;

    fn attack(&self, note: u8) -> usize {
        self.envelope(note).attack
    }

    fn hold(&self, note: u8) -> usize {
        self.envelope(note).hold
    }

    fn decay(&self, note: u8) -> usize {
        self.envelope(note).decay
    }

    fn release(&self, note: u8) -> usize {
        self.envelope(note).release
    }

    /// Sustain level in [0, 1].
    fn sustain_level(&self) -> f64 {
        DEFAULT_SUSTAIN
    }

    /// Re-derive every envelope count for `sample_rate` if it differs from
    /// the current rate. A repeated call with the same rate is a no-op.
    fn enforce_sample_rate(&mut self, sample_rate: u32);

    /// One sample in [-1, 1] for `note` on MIDI `channel` at `cursor.time`.
    ///
    /// May rewrite `cursor.time` (phase wrap); never advances it.
    fn sample_at_time(
        &self,
        note: u8,
        channel: u8,
        synth_sample_rate: u32,
        cursor: &mut VoiceCursor,
    ) -> f64;

    /// Balance for a note, -1 (left) to 1 (right).
    fn pan(&self, _note: u8, _channel: u8, _velocity: u8) -> f64 {
        0.0
    }
}

/// An instrument that evaluates a base waveform at the note's frequency.
#[derive(Debug, Clone)]
pub struct WaveformInstrument {
    sample_rate: u32,
    waveform: Waveform,
    times: EnvelopeTimes,
    counts: EnvelopeCounts,
    sustain: f64,
    amplitude: f64,
}

impl WaveformInstrument {
    pub fn new(sample_rate: u32, waveform: Waveform) -> Self {
        Self::with_envelope(sample_rate, waveform, EnvelopeTimes::default())
    }

    pub fn with_envelope(sample_rate: u32, waveform: Waveform, times: EnvelopeTimes) -> Self {
        WaveformInstrument {
            sample_rate,
            waveform,
            times,
            counts: times.to_counts(sample_rate),
            sustain: DEFAULT_SUSTAIN,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn envelope_times(&self) -> EnvelopeTimes {
        self.times
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Output scale, clamped to [0, 1].
    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.amplitude = if amplitude.is_nan() { 0.0 } else { amplitude.clamp(0.0, 1.0) };
    }

    pub fn set_sustain(&mut self, sustain: f64) {
        self.sustain = if sustain.is_nan() { 0.0 } else { sustain.clamp(0.0, 1.0) };
    }
}

impl Instrument for WaveformInstrument {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn envelope(&self, _note: u8) -> EnvelopeCounts {
        self.counts
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
        _channel: u8,
        _synth_sample_rate: u32,
        cursor: &mut VoiceCursor,
    ) -> f64 {
        let frequency = note_to_frequency(note);
        // Restart the cycle instead of letting time grow without bound.
        if frequency * cursor.time > 1.0 {
            cursor.time = 0.0;
        }
        self.waveform.evaluate(note, frequency, cursor.time) * self.amplitude
    }
}

/// Either kind of instrument, dispatched without boxing.
#[derive(Debug, Clone)]
pub enum InstrumentKind {
    Waveform(WaveformInstrument),
    SampleBank(SampleBankInstrument),
}

impl Instrument for InstrumentKind {
    fn sample_rate(&self) -> u32 {
        match self {
            InstrumentKind::Waveform(i) => i.sample_rate(),
            InstrumentKind::SampleBank(i) => i.sample_rate(),
        }
    }

    fn envelope(&self, note: u8) -> EnvelopeCounts {
        match self {
            InstrumentKind::Waveform(i) => i.envelope(note),
            InstrumentKind::SampleBank(i) => i.envelope(note),
        }
    }

    fn sustain_level(&self) -> f64 {
        match self {
            InstrumentKind::Waveform(i) => i.sustain_level(),
            InstrumentKind::SampleBank(i) => i.sustain_level(),
        }
    }

    fn enforce_sample_rate(&mut self, sample_rate: u32) {
        match self {
            InstrumentKind::Waveform(i) => i.enforce_sample_rate(sample_rate),
            InstrumentKind::SampleBank(i) => i.enforce_sample_rate(sample_rate),
        }
    }

    fn sample_at_time(
        &self,
        note: u8,
        channel: u8,
        synth_sample_rate: u32,
        cursor: &mut VoiceCursor,
    ) -> f64 {
        match self {
            InstrumentKind::Waveform(i) => i.sample_at_time(note, channel, synth_sample_rate, cursor),
            InstrumentKind::SampleBank(i) => {
                i.sample_at_time(note, channel, synth_sample_rate, cursor)
            }
        }
    }

    fn pan(&self, note: u8, channel: u8, velocity: u8) -> f64 {
        match self {
            InstrumentKind::Waveform(i) => i.pan(note, channel, velocity),
            InstrumentKind::SampleBank(i) => i.pan(note, channel, velocity),
        }
    }
}

impl From<WaveformInstrument> for InstrumentKind {
    fn from(i: WaveformInstrument) -> Self {
        InstrumentKind::Waveform(i)
    }
}

impl From<SampleBankInstrument> for InstrumentKind {
    fn from(i: SampleBankInstrument) -> Self {
        InstrumentKind::SampleBank(i)
    }
}

//! Synth engine — routes note events to per-channel instruments, mixes the
//! active voices into a block and runs the master effect chain over it.
//!
//! Events carry a frame offset into the next rendered block, so starts and
//! releases land on exact samples regardless of block size.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::SynthError;

use super::buffer::{AudioBuffer, MAX_CHANNELS};
use super::effect::{Effect, EffectChain};
use super::instrument::{Instrument, InstrumentKind};
use super::math::soft_clip;
use super::voice::Voice;

/// Number of MIDI channels, each with its own instrument slot.
pub const MIDI_CHANNELS: usize = 16;
/// Voice pool size used when none is configured.
pub const DEFAULT_MAX_VOICES: usize = 32;
/// Largest voice pool; bigger requests are clamped to it.
pub const MAX_VOICES: usize = 1024;

/// A note-on event. Velocity 0 is treated as a note-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteOn {
    pub note: u8,
    pub velocity: u8,
    #[serde(default)]
    pub channel: u8,
}

impl NoteOn {
    pub fn new(channel: u8, note: u8, velocity: u8) -> Self {
        NoteOn { note, velocity, channel }
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        if self.note > 127 || self.velocity > 127 || self.channel as usize >= MIDI_CHANNELS {
            return Err(SynthError::InvalidNoteEvent {
                note: self.note,
                velocity: self.velocity,
                channel: self.channel,
            });
        }
        Ok(())
    }
}

fn check_channel(channel: u8) -> Result<usize, SynthError> {
    let index = channel as usize;
    if index >= MIDI_CHANNELS {
        return Err(SynthError::InvalidChannel { channel });
    }
    Ok(index)
}

/// Polyphonic engine with a fixed-size voice pool.
#[derive(Debug)]
pub struct SynthEngine {
    sample_rate: u32,
    channels: usize,
    master_gain: f64,
    instruments: Vec<Option<InstrumentKind>>,
    /// Oldest first; the front is stolen when the pool is full.
    voices: Vec<Voice>,
    max_voices: usize,
    effects: EffectChain,
}

impl SynthEngine {
    pub fn new(sample_rate: u32, channels: usize, max_voices: usize) -> Result<Self, SynthError> {
        if sample_rate == 0 {
            return Err(SynthError::InvalidSampleRate { sample_rate });
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(SynthError::InvalidChannelCount { channels });
        }
        let max_voices = max_voices.clamp(1, MAX_VOICES);
        log::debug!(
            "Engine created: {sample_rate} Hz, {channels} channels, {max_voices} voices"
        );
        Ok(SynthEngine {
            sample_rate,
            channels,
            master_gain: 1.0,
            instruments: vec![None; MIDI_CHANNELS],
            voices: Vec::with_capacity(max_voices),
            max_voices,
            effects: EffectChain::new(),
        })
    }

    /// Build an engine, its instruments and its effect chain from config.
    pub fn from_config(config: &EngineConfig) -> Result<Self, SynthError> {
        config.validate()?;
        let mut engine = SynthEngine::new(config.sample_rate, config.channels, config.max_voices)?;
        engine.set_master_gain(config.master_gain)?;
        for instrument in &config.instruments {
            engine.set_instrument(instrument.channel, instrument.build(config.sample_rate))?;
        }
        for effect in &config.effects {
            engine.push_effect(effect.build(config.channels, config.sample_rate)?);
        }
        log::debug!("Effect chain from config: {:?}", engine.effects.names());
        Ok(engine)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    pub fn master_gain(&self) -> f64 {
        self.master_gain
    }

    pub fn set_master_gain(&mut self, gain: f64) -> Result<(), SynthError> {
        if !gain.is_finite() || gain < 0.0 {
            return Err(SynthError::InvalidMasterGain { gain });
        }
        self.master_gain = gain;
        Ok(())
    }

    /// Assign an instrument to a MIDI channel, adopting the engine's rate.
    pub fn set_instrument(
        &mut self,
        channel: u8,
        instrument: impl Into<InstrumentKind>,
    ) -> Result<(), SynthError> {
        let index = check_channel(channel)?;
        let mut instrument = instrument.into();
        instrument.enforce_sample_rate(self.sample_rate);
        log::debug!("Instrument assigned to channel {channel}");
        self.instruments[index] = Some(instrument);
        Ok(())
    }

    /// Remove a channel's instrument. Its sounding voices stop at the next render.
    pub fn clear_instrument(&mut self, channel: u8) -> Result<Option<InstrumentKind>, SynthError> {
        let index = check_channel(channel)?;
        Ok(self.instruments[index].take())
    }

    pub fn instrument(&self, channel: u8) -> Option<&InstrumentKind> {
        self.instruments.get(channel as usize)?.as_ref()
    }

    /// Change the output rate and re-derive every instrument's envelope counts.
    ///
    /// Effects keep the rate they were built for.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), SynthError> {
        if sample_rate == 0 {
            return Err(SynthError::InvalidSampleRate { sample_rate });
        }
        if sample_rate == self.sample_rate {
            return Ok(());
        }
        log::debug!("Sample rate {} -> {sample_rate}", self.sample_rate);
        self.sample_rate = sample_rate;
        for instrument in self.instruments.iter_mut().flatten() {
            instrument.enforce_sample_rate(sample_rate);
        }
        Ok(())
    }

    pub fn push_effect(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(effect);
    }

    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    pub fn note_on(&mut self, event: NoteOn) -> Result<(), SynthError> {
        self.note_on_at(event, 0)
    }

    /// Start a note `offset` frames into the next rendered block.
    pub fn note_on_at(&mut self, event: NoteOn, offset: usize) -> Result<(), SynthError> {
        event.validate()?;
        if event.velocity == 0 {
            return self.note_off_at(event.channel, event.note, offset);
        }
        let Some(instrument) = &self.instruments[event.channel as usize] else {
            log::debug!(
                "Note {} ignored, no instrument on channel {}",
                event.note,
                event.channel
            );
            return Ok(());
        };
        let voice = Voice::new(instrument, event.channel, event.note, event.velocity, offset);
        if self.voices.len() >= self.max_voices {
            let stolen = self.voices.remove(0);
            log::debug!(
                "Voice pool full, stealing note {} on channel {}",
                stolen.note(),
                stolen.channel()
            );
        }
        self.voices.push(voice);
        Ok(())
    }

    pub fn note_off(&mut self, channel: u8, note: u8) -> Result<(), SynthError> {
        self.note_off_at(channel, note, 0)
    }

    /// Release every held voice for (`channel`, `note`) `offset` frames into
    /// the next rendered block.
    pub fn note_off_at(&mut self, channel: u8, note: u8, offset: usize) -> Result<(), SynthError> {
        check_channel(channel)?;
        for voice in self.voices.iter_mut().filter(|v| v.matches(channel, note)) {
            voice.note_off_at(offset);
        }
        Ok(())
    }

    /// Release every voice now.
    pub fn all_notes_off(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.note_off();
        }
    }

    /// Voices still sounding or waiting to start.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Render one block into `out`, replacing its contents.
    ///
    /// Voices are summed, scaled by the master gain and soft-clipped, then
    /// the effect chain runs over the result.
    pub fn render(&mut self, out: &mut AudioBuffer) {
        out.clear();
        let instruments = &self.instruments;
        let sample_rate = self.sample_rate;
        for voice in self.voices.iter_mut() {
            match &instruments[voice.channel() as usize] {
                Some(instrument) => voice.render(instrument, sample_rate, out),
                None => voice.note_off(),
            }
        }
        // A voice whose instrument was removed is dropped at once.
        self.voices.retain(|v| {
            !v.is_finished() && instruments[v.channel() as usize].is_some()
        });

        let gain = self.master_gain;
        for channel in out.channels_mut() {
            for sample in channel.iter_mut() {
                *sample = soft_clip(*sample as f64 * gain) as f32;
            }
        }
        self.effects.apply(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::EnvelopeTimes;
    use crate::dsp::instrument::WaveformInstrument;
    use crate::dsp::meter::{LevelMeter, MeterMode};
    use crate::dsp::oscillator::Waveform;

    fn engine_with_square() -> SynthEngine {
        let mut engine = SynthEngine::new(44100, 2, 4).unwrap();
        let times = EnvelopeTimes { attack: 0.0, hold: 0.0, decay: 0.0, release: 0.0 };
        engine
            .set_instrument(0, WaveformInstrument::with_envelope(44100, Waveform::Square, times))
            .unwrap();
        engine
    }

    fn peak(buf: &AudioBuffer) -> f32 {
        buf.channels()
            .flat_map(|c| c.iter())
            .fold(0.0_f32, |m, &s| m.max(s.abs()))
    }

    #[test]
    fn rejects_bad_construction() {
        assert!(matches!(
            SynthEngine::new(0, 2, 8),
            Err(SynthError::InvalidSampleRate { .. })
        ));
        assert!(matches!(
            SynthEngine::new(44100, 0, 8),
            Err(SynthError::InvalidChannelCount { channels: 0 })
        ));
        assert!(matches!(
            SynthEngine::new(44100, usize::MAX, 8),
            Err(SynthError::InvalidChannelCount { .. })
        ));
        assert_eq!(SynthEngine::new(44100, 2, 0).unwrap().max_voices(), 1);
        assert_eq!(SynthEngine::new(44100, 2, usize::MAX).unwrap().max_voices(), MAX_VOICES);
    }

    #[test]
    fn silent_without_notes() {
        let mut engine = engine_with_square();
        let mut out = AudioBuffer::new(2, 256);
        engine.render(&mut out);
        assert_eq!(peak(&out), 0.0);
    }

    #[test]
    fn note_on_produces_bounded_output() {
        let mut engine = engine_with_square();
        engine.note_on(NoteOn::new(0, 69, 127)).unwrap();
        let mut out = AudioBuffer::new(2, 512);
        engine.render(&mut out);
        let p = peak(&out);
        assert!(p > 0.1, "Note should sound, peak {p}");
        assert!(p < 1.0, "Soft clip keeps output inside (-1, 1), peak {p}");
        assert_eq!(engine.active_voices(), 1);
    }

    #[test]
    fn render_replaces_buffer_contents() {
        let mut engine = engine_with_square();
        let mut out = AudioBuffer::from_channels(vec![vec![0.9; 64], vec![0.9; 64]]).unwrap();
        engine.render(&mut out);
        assert_eq!(peak(&out), 0.0);
    }

    #[test]
    fn note_on_at_offset_is_sample_accurate() {
        let mut engine = engine_with_square();
        engine.note_on_at(NoteOn::new(0, 69, 127), 10).unwrap();
        let mut out = AudioBuffer::new(2, 32);
        engine.render(&mut out);
        assert!(out.channel(0)[..10].iter().all(|&s| s == 0.0));
        assert!(out.channel(0)[10] != 0.0);
    }

    #[test]
    fn note_off_with_zero_release_frees_voice() {
        let mut engine = engine_with_square();
        engine.note_on(NoteOn::new(0, 60, 100)).unwrap();
        let mut out = AudioBuffer::new(2, 64);
        engine.render(&mut out);
        engine.note_off(0, 60).unwrap();
        engine.render(&mut out);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn velocity_zero_is_note_off() {
        let mut engine = engine_with_square();
        engine.note_on(NoteOn::new(0, 60, 100)).unwrap();
        engine.note_on(NoteOn::new(0, 60, 0)).unwrap();
        assert_eq!(engine.active_voices(), 1, "Velocity 0 must not start a voice");
        let mut out = AudioBuffer::new(2, 64);
        engine.render(&mut out);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn note_off_at_offset_releases_mid_block() {
        let mut engine = engine_with_square();
        engine.note_on(NoteOn::new(0, 69, 127)).unwrap();
        engine.note_off_at(0, 69, 20).unwrap();
        let mut out = AudioBuffer::new(2, 64);
        engine.render(&mut out);
        assert!(out.channel(0)[..20].iter().all(|&s| s != 0.0));
        assert!(out.channel(0)[21..].iter().all(|&s| s == 0.0));
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn oldest_voice_is_stolen() {
        let mut engine = engine_with_square();
        for note in 60..66 {
            engine.note_on(NoteOn::new(0, note, 100)).unwrap();
        }
        assert_eq!(engine.active_voices(), 4);
        // 60 and 61 were stolen, so releasing them changes nothing
        engine.note_off(0, 60).unwrap();
        engine.note_off(0, 61).unwrap();
        let mut out = AudioBuffer::new(2, 16);
        engine.render(&mut out);
        assert_eq!(engine.active_voices(), 4);
    }

    #[test]
    fn all_notes_off_releases_everything() {
        let mut engine = engine_with_square();
        engine.note_on(NoteOn::new(0, 60, 100)).unwrap();
        engine.note_on(NoteOn::new(0, 64, 100)).unwrap();
        engine.all_notes_off();
        let mut out = AudioBuffer::new(2, 16);
        engine.render(&mut out);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn channel_without_instrument_is_ignored() {
        let mut engine = engine_with_square();
        engine.note_on(NoteOn::new(3, 60, 100)).unwrap();
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn clearing_instrument_drops_its_voices() {
        let mut engine = engine_with_square();
        engine.note_on(NoteOn::new(0, 60, 100)).unwrap();
        assert!(engine.clear_instrument(0).unwrap().is_some());
        let mut out = AudioBuffer::new(2, 16);
        engine.render(&mut out);
        assert_eq!(engine.active_voices(), 0);
        assert_eq!(peak(&out), 0.0);
    }

    #[test]
    fn rejects_invalid_events() {
        let mut engine = engine_with_square();
        assert!(matches!(
            engine.note_on(NoteOn::new(16, 60, 100)),
            Err(SynthError::InvalidNoteEvent { .. })
        ));
        assert!(engine.note_on(NoteOn::new(0, 128, 100)).is_err());
        assert!(engine.note_on(NoteOn::new(0, 60, 200)).is_err());
        assert!(matches!(
            engine.note_off(20, 60),
            Err(SynthError::InvalidChannel { channel: 20 })
        ));
        assert!(engine.set_instrument(16, WaveformInstrument::new(44100, Waveform::Sine)).is_err());
    }

    #[test]
    fn set_instrument_adopts_engine_rate() {
        let mut engine = SynthEngine::new(22050, 2, 4).unwrap();
        engine.set_instrument(1, WaveformInstrument::new(44100, Waveform::Sine)).unwrap();
        assert_eq!(engine.instrument(1).unwrap().sample_rate(), 22050);
    }

    #[test]
    fn set_sample_rate_forwards_to_instruments() {
        let mut engine = engine_with_square();
        engine.set_instrument(5, WaveformInstrument::new(44100, Waveform::Sine)).unwrap();
        engine.set_sample_rate(48000).unwrap();
        assert_eq!(engine.sample_rate(), 48000);
        assert_eq!(engine.instrument(0).unwrap().sample_rate(), 48000);
        assert_eq!(
            engine.instrument(5).unwrap().envelope(60),
            EnvelopeTimes::default().to_counts(48000)
        );
        assert!(engine.set_sample_rate(0).is_err());
    }

    #[test]
    fn master_gain_scales_and_validates() {
        let mut engine = engine_with_square();
        engine.set_master_gain(0.0).unwrap();
        engine.note_on(NoteOn::new(0, 69, 127)).unwrap();
        let mut out = AudioBuffer::new(2, 64);
        engine.render(&mut out);
        assert_eq!(peak(&out), 0.0);
        assert!(engine.set_master_gain(-1.0).is_err());
        assert!(engine.set_master_gain(f64::NAN).is_err());
    }

    #[test]
    fn effect_chain_runs_after_mix() {
        let mut engine = engine_with_square();
        engine.push_effect(Box::new(LevelMeter::new(MeterMode::Rms)));
        engine.note_on(NoteOn::new(0, 69, 127)).unwrap();
        let mut out = AudioBuffer::new(2, 441);
        engine.render(&mut out);
        let meters = engine.effects().meters();
        assert_eq!(meters.len(), 1);
        let level = meters[0].reading().left;
        assert!(level.is_finite() && level < 20.0, "Meter saw the mix, level {level}");
    }

    #[test]
    fn mono_output_is_supported() {
        let mut engine = SynthEngine::new(44100, 1, 4).unwrap();
        engine.set_instrument(0, WaveformInstrument::new(44100, Waveform::Sine)).unwrap();
        engine.note_on(NoteOn::new(0, 69, 127)).unwrap();
        let mut out = AudioBuffer::new(1, 256);
        engine.render(&mut out);
        assert!(peak(&out) > 0.0);
    }
}

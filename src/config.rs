//! Engine configuration loaded from JSON.
//!
//! ```json
//! {
//!   "sampleRate": 48000,
//!   "instruments": [{ "channel": 0, "waveform": "saw", "envelope": { "release": 0.5 } }],
//!   "effects": [
//!     { "type": "lowpass", "cornerFrequency": 0.1 },
//!     { "type": "echo", "delayTime": 0.25, "decay": 0.4 },
//!     { "type": "meter", "fast": true }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::dsp::buffer::MAX_CHANNELS;
use crate::dsp::echo::{DEFAULT_DECAY, Echo};
use crate::dsp::effect::Effect;
use crate::dsp::engine::{DEFAULT_MAX_VOICES, MIDI_CHANNELS};
use crate::dsp::envelope::EnvelopeTimes;
use crate::dsp::instrument::WaveformInstrument;
use crate::dsp::meter::{LevelMeter, MeterMode};
use crate::dsp::oscillator::Waveform;
use crate::dsp::sinc::{DEFAULT_FILTER_LENGTH, SincFilter};
use crate::error::SynthError;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHANNELS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub channels: usize,
    pub max_voices: usize,
    pub master_gain: f64,
    pub instruments: Vec<InstrumentConfig>,
    pub effects: Vec<EffectConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            max_voices: DEFAULT_MAX_VOICES,
            master_gain: 1.0,
            instruments: Vec::new(),
            effects: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, SynthError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, SynthError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check everything that can be checked without building effects.
    pub fn validate(&self) -> Result<(), SynthError> {
        if self.sample_rate == 0 {
            return Err(SynthError::InvalidSampleRate {
                sample_rate: self.sample_rate,
            });
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(SynthError::InvalidChannelCount {
                channels: self.channels,
            });
        }
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return Err(SynthError::InvalidMasterGain {
                gain: self.master_gain,
            });
        }
        for instrument in &self.instruments {
            if instrument.channel as usize >= MIDI_CHANNELS {
                return Err(SynthError::InvalidChannel {
                    channel: instrument.channel,
                });
            }
        }
        Ok(())
    }
}

/// A waveform instrument bound to one MIDI channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstrumentConfig {
    pub channel: u8,
    pub waveform: Waveform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sustain: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope: Option<EnvelopeTimes>,
}

impl InstrumentConfig {
    pub fn build(&self, sample_rate: u32) -> WaveformInstrument {
        let times = self.envelope.unwrap_or_default();
        let mut instrument = WaveformInstrument::with_envelope(sample_rate, self.waveform, times);
        if let Some(amplitude) = self.amplitude {
            instrument.set_amplitude(amplitude);
        }
        if let Some(sustain) = self.sustain {
            instrument.set_sustain(sustain);
        }
        instrument
    }
}

fn default_decay() -> f32 {
    DEFAULT_DECAY
}

fn default_filter_length() -> usize {
    DEFAULT_FILTER_LENGTH
}

/// One entry of the master effect chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum EffectConfig {
    Echo {
        /// Seconds.
        delay_time: f64,
        #[serde(default = "default_decay")]
        decay: f32,
    },
    Meter {
        #[serde(default)]
        fast: bool,
    },
    Lowpass {
        #[serde(default = "default_filter_length")]
        filter_length: usize,
        /// Normalized to the sample rate, 0.0 to 0.5.
        corner_frequency: f64,
    },
}

impl EffectConfig {
    pub fn build(&self, channels: usize, sample_rate: u32) -> Result<Box<dyn Effect>, SynthError> {
        Ok(match *self {
            EffectConfig::Echo { delay_time, decay } => {
                Box::new(Echo::with_decay(channels, sample_rate, delay_time, decay)?)
            }
            EffectConfig::Meter { fast } => Box::new(LevelMeter::new(if fast {
                MeterMode::Fast
            } else {
                MeterMode::Rms
            })),
            EffectConfig::Lowpass {
                filter_length,
                corner_frequency,
            } => Box::new(SincFilter::new(channels, filter_length, corner_frequency)?),
        })
    }
}

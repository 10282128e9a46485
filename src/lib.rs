pub mod config;
pub mod dsp;
pub mod error;

use crate::config::EngineConfig;
use crate::dsp::buffer::AudioBuffer;
use crate::dsp::engine::NoteOn;
use crate::dsp::meter::MeterMode;
use crate::error::SynthError;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn to_js(e: SynthError) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed: return the tonebank-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Render one note through an engine described by a JSON config.
/// Returns interleaved f32 samples for AudioWorklet playback.
pub fn render_note_samples(
    config_json: &str,
    event: NoteOn,
    hold_seconds: f64,
    tail_seconds: f64,
) -> Result<Vec<f32>, SynthError> {
    let config = EngineConfig::from_json(config_json)?;
    let buffer = dsp::renderer::render_note(&config, event, hold_seconds, tail_seconds)?;
    Ok(buffer.to_interleaved())
}

/// WASM-exposed: render one note to interleaved f32 samples.
#[wasm_bindgen]
pub fn render_note(
    config_json: &str,
    channel: u8,
    note: u8,
    velocity: u8,
    hold_seconds: f64,
    tail_seconds: f64,
) -> Result<Vec<f32>, JsValue> {
    let event = NoteOn::new(channel, note, velocity);
    render_note_samples(config_json, event, hold_seconds, tail_seconds).map_err(to_js)
}

/// WASM-exposed: render one note to a WAV byte array.
#[wasm_bindgen]
pub fn render_note_wav(
    config_json: &str,
    channel: u8,
    note: u8,
    velocity: u8,
    hold_seconds: f64,
    tail_seconds: f64,
) -> Result<Vec<u8>, JsValue> {
    let config = EngineConfig::from_json(config_json).map_err(to_js)?;
    let event = NoteOn::new(channel, note, velocity);
    dsp::renderer::render_note_wav(&config, event, hold_seconds, tail_seconds).map_err(to_js)
}

/// WASM-exposed: meter interleaved samples and return the reading as a JS object.
#[wasm_bindgen]
pub fn measure_levels(samples: &[f32], channels: usize, fast: bool) -> Result<JsValue, JsValue> {
    let buffer = AudioBuffer::from_interleaved(samples, channels).map_err(to_js)?;
    let mode = if fast { MeterMode::Fast } else { MeterMode::Rms };
    let reading = dsp::renderer::measure_levels(&buffer, mode);
    serde_wasm_bindgen::to_value(&reading).map_err(|e| JsValue::from_str(&format!("{e}")))
}

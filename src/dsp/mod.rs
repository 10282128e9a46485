//! DSP Engine — Pure Rust synthesis, sample playback and effects.
//!
//! Instruments produce samples, voices shape them with envelopes, the engine
//! mixes voices into planar blocks and the effect chain processes the mix.
//! The same code runs natively and inside an AudioWorklet via WASM.

pub mod buffer;
pub mod echo;
pub mod effect;
pub mod engine;
pub mod envelope;
pub mod instrument;
pub mod math;
pub mod meter;
pub mod oscillator;
pub mod region;
pub mod renderer;
pub mod ring;
pub mod sampler;
pub mod sinc;
pub mod voice;

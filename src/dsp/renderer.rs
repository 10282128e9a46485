//! Offline renderer — plays a single note through a configured engine and
//! collects the result, optionally as a WAV byte buffer.

use crate::config::EngineConfig;
use crate::error::SynthError;

use super::buffer::AudioBuffer;
use super::engine::{NoteOn, SynthEngine};
use super::math::sample_from_time;
use super::meter::{LevelMeter, MeterMode, MeterReading};

/// Frames rendered per engine call.
pub const BLOCK_FRAMES: usize = 128;
/// Longest note render, in frames (hold plus tail).
pub const MAX_RENDER_FRAMES: usize = 1 << 24;

/// Render `event` held for `hold_seconds`, then `tail_seconds` of release.
///
/// The note-off lands on the exact hold frame even when that falls inside a
/// block. Renders longer than `MAX_RENDER_FRAMES` are rejected.
pub fn render_note(
    config: &EngineConfig,
    event: NoteOn,
    hold_seconds: f64,
    tail_seconds: f64,
) -> Result<AudioBuffer, SynthError> {
    let mut engine = SynthEngine::from_config(config)?;
    let rate = engine.sample_rate();
    let hold = sample_from_time(rate, hold_seconds);
    let total = hold
        .checked_add(sample_from_time(rate, tail_seconds))
        .filter(|&frames| frames <= MAX_RENDER_FRAMES)
        .ok_or(SynthError::InvalidDuration {
            seconds: hold_seconds + tail_seconds,
        })?;
    let channels = engine.channels();

    let mut out = AudioBuffer::new(channels, total);
    let mut block = AudioBuffer::new(channels, BLOCK_FRAMES);
    engine.note_on(event)?;

    let mut pos = 0;
    while pos < total {
        let len = BLOCK_FRAMES.min(total - pos);
        if len < block.frames() {
            block = AudioBuffer::new(channels, len);
        }
        if (pos..pos + len).contains(&hold) {
            engine.note_off_at(event.channel, event.note, hold - pos)?;
        }
        engine.render(&mut block);
        out.copy_from(&block, pos);
        pos += len;
    }
    log::debug!("Rendered note {} into {total} frames", event.note);
    Ok(out)
}

/// Meter a whole buffer in one pass.
pub fn measure_levels(buffer: &AudioBuffer, mode: MeterMode) -> MeterReading {
    let mut meter = LevelMeter::new(mode);
    meter.measure(buffer);
    meter.reading()
}

/// Render a note to a WAV file as bytes (16-bit PCM, config channel count).
pub fn render_note_wav(
    config: &EngineConfig,
    event: NoteOn,
    hold_seconds: f64,
    tail_seconds: f64,
) -> Result<Vec<u8>, SynthError> {
    let buffer = render_note(config, event, hold_seconds, tail_seconds)?;
    let pcm: Vec<i16> = buffer
        .to_interleaved()
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect();
    let channels = u16::try_from(buffer.channel_count())
        .map_err(|_| SynthError::InvalidChannelCount { channels: buffer.channel_count() })?;
    Ok(encode_wav(&pcm, config.sample_rate, channels))
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

//! Planar multi-channel sample buffer shared by the engine and effects.

use crate::error::SynthError;

/// Most channels an engine or effect will allocate state for.
pub const MAX_CHANNELS: usize = 64;

/// A block of audio stored as one `Vec<f32>` per channel.
///
/// Every channel holds the same number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// A silent buffer of `channels` x `frames`.
    pub fn new(channels: usize, frames: usize) -> Self {
        AudioBuffer {
            channels: vec![vec![0.0; frames]; channels],
        }
    }

    /// Wrap existing planar data. All channels must have the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self, SynthError> {
        if let Some(first) = channels.first() {
            let expected = first.len();
            if let Some(bad) = channels.iter().find(|c| c.len() != expected) {
                return Err(SynthError::BufferShape {
                    expected,
                    found: bad.len(),
                });
            }
        }
        Ok(AudioBuffer { channels })
    }

    /// Split interleaved samples into planar channels.
    pub fn from_interleaved(samples: &[f32], channels: usize) -> Result<Self, SynthError> {
        if channels == 0 {
            return Err(SynthError::InvalidChannelCount { channels });
        }
        if samples.len() % channels != 0 {
            return Err(SynthError::BufferShape {
                expected: samples.len() - samples.len() % channels,
                found: samples.len(),
            });
        }
        let frames = samples.len() / channels;
        let mut buffer = AudioBuffer::new(channels, frames);
        for (frame, chunk) in samples.chunks_exact(channels).enumerate() {
            for (c, &s) in chunk.iter().enumerate() {
                buffer.channels[c][frame] = s;
            }
        }
        Ok(buffer)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    /// Zero every sample without touching the allocation.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Copy `other` into this buffer starting at `offset` frames.
    /// Frames or channels that do not fit are dropped.
    pub fn copy_from(&mut self, other: &AudioBuffer, offset: usize) {
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            if offset >= dst.len() {
                break;
            }
            let n = src.len().min(dst.len() - offset);
            dst[offset..offset + n].copy_from_slice(&src[..n]);
        }
    }

    /// Interleave into a single `Vec` (frame-major).
    pub fn to_interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let mut out = Vec::with_capacity(frames * self.channel_count());
        for i in 0..frames {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }
}

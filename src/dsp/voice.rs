//! Voice — one sounding note: instrument samples shaped by an envelope.

use super::buffer::AudioBuffer;
use super::envelope::Envelope;
use super::instrument::{Instrument, VoiceCursor};
use super::math::{balance_gains, velocity_to_gain};

/// A single note instance rendered additively into a shared buffer.
#[derive(Debug, Clone)]
pub struct Voice {
    note: u8,
    channel: u8,
    cursor: VoiceCursor,
    envelope: Envelope,
    /// Velocity gain [0, 1].
    gain: f64,
    /// Frames to wait in the next block before sounding.
    start_delay: usize,
    /// Frames into the next block at which the gate closes.
    release_at: Option<usize>,
    finished: bool,
}

impl Voice {
    /// Start a note `start_offset` frames into the next rendered block.
    pub fn new<I: Instrument + ?Sized>(
        instrument: &I,
        channel: u8,
        note: u8,
        velocity: u8,
        start_offset: usize,
    ) -> Self {
        let mut envelope = Envelope::new(instrument.envelope(note), instrument.sustain_level());
        envelope.gate_on();
        Voice {
            note,
            channel,
            cursor: VoiceCursor::new(velocity),
            envelope,
            gain: velocity_to_gain(velocity),
            start_delay: start_offset,
            release_at: None,
            finished: false,
        }
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn velocity(&self) -> u8 {
        self.cursor.velocity
    }

    /// Release the note now.
    pub fn note_off(&mut self) {
        self.release_at = None;
        self.release();
    }

    /// Release the note `offset` frames into the next rendered block.
    pub fn note_off_at(&mut self, offset: usize) {
        if offset == 0 {
            self.note_off();
        } else {
            self.release_at = Some(offset);
        }
    }

    /// A held (not yet released or pending release) voice playing this note.
    pub fn matches(&self, channel: u8, note: u8) -> bool {
        !self.finished
            && !self.cursor.released
            && self.release_at.is_none()
            && self.channel == channel
            && self.note == note
    }

    pub fn is_released(&self) -> bool {
        self.cursor.released
    }

    /// Is this voice done (envelope finished)?
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn release(&mut self) {
        self.cursor.released = true;
        self.envelope.gate_off();
    }

    /// Add this voice's output for one block into `out`.
    ///
    /// A mono buffer receives the unpanned signal; otherwise the first two
    /// channels receive it balanced by the instrument's pan.
    pub fn render<I: Instrument + ?Sized>(
        &mut self,
        instrument: &I,
        synth_sample_rate: u32,
        out: &mut AudioBuffer,
    ) {
        if self.finished || out.channel_count() == 0 {
            return;
        }
        let frames = out.frames();
        let start = self.start_delay.min(frames);
        self.start_delay -= start;

        let velocity = self.cursor.velocity;
        let (left, right) = balance_gains(instrument.pan(self.note, self.channel, velocity));
        let stereo = out.channel_count() > 1;

        for i in 0..frames {
            match self.release_at {
                Some(0) => {
                    self.release_at = None;
                    self.release();
                }
                Some(n) => self.release_at = Some(n - 1),
                None => {}
            }
            if i < start {
                continue;
            }

            let level = self.envelope.next_gain();
            let sample = instrument.sample_at_time(
                self.note,
                self.channel,
                synth_sample_rate,
                &mut self.cursor,
            ) * level
                * self.gain;
            self.cursor.advance(synth_sample_rate);

            if stereo {
                out.channel_mut(0)[i] += (sample * left) as f32;
                out.channel_mut(1)[i] += (sample * right) as f32;
            } else {
                out.channel_mut(0)[i] += sample as f32;
            }

            if self.envelope.is_finished() {
                self.finished = true;
                break;
            }
        }
    }
}

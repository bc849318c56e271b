// src/host/source.rs

//! One-shot playback of a decoded buffer into the graph.

use super::buffer::{AudioBlock, AudioBuffer, RENDER_QUANTUM};
use super::DspUnit;
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceState {
    Idle,
    Playing,
    Ended,
}

/// Plays a shared buffer once from a start offset, mapping its channels onto
/// the graph's channel count. A source is never restarted; build a new one.
#[derive(Debug, Clone)]
pub struct BufferSource {
    buffer: Arc<AudioBuffer>,
    channel_count: usize,
    position: usize,
    state: SourceState,
}

impl BufferSource {
    pub fn new(buffer: Arc<AudioBuffer>, channel_count: usize) -> Self {
        Self {
            buffer,
            channel_count: channel_count.max(1),
            position: 0,
            state: SourceState::Idle,
        }
    }

    pub fn buffer(&self) -> &Arc<AudioBuffer> {
        &self.buffer
    }

    /// Begins playback at `offset_frames`. Ignored unless the source is idle.
    pub fn start(&mut self, offset_frames: usize) {
        if self.state != SourceState::Idle {
            return;
        }
        self.position = offset_frames;
        self.state = if offset_frames >= self.buffer.frames() {
            SourceState::Ended
        } else {
            SourceState::Playing
        };
    }

    pub fn stop(&mut self) {
        self.state = SourceState::Ended;
    }

    pub fn is_playing(&self) -> bool {
        self.state == SourceState::Playing
    }

    pub fn is_ended(&self) -> bool {
        self.state == SourceState::Ended
    }

    /// Frame of the buffer that will be read next.
    pub fn position(&self) -> usize {
        self.position
    }

    fn sample(&self, out_channel: usize, frame: usize) -> f32 {
        let buffer = &self.buffer;
        let source_channels = buffer.channel_count();
        if source_channels == self.channel_count {
            return buffer.channel(out_channel)[frame];
        }
        if source_channels == 1 {
            return buffer.channel(0)[frame];
        }
        if self.channel_count == 1 {
            let sum: f32 = buffer.channels().iter().map(|c| c[frame]).sum();
            return sum / source_channels as f32;
        }
        if out_channel < source_channels {
            buffer.channel(out_channel)[frame]
        } else {
            0.0
        }
    }
}

impl DspUnit for BufferSource {
    fn process(&mut self, _input: &AudioBlock, output: &mut AudioBlock) {
        output.silence();
        if self.state != SourceState::Playing {
            return;
        }
        let remaining = self.buffer.frames().saturating_sub(self.position);
        let frames = remaining.min(RENDER_QUANTUM);
        let channels = output.channel_count().min(self.channel_count);
        for channel in 0..channels {
            for frame in 0..frames {
                output.channel_mut(channel)[frame] = self.sample(channel, self.position + frame);
            }
        }
        self.position += frames;
        if self.position >= self.buffer.frames() {
            self.state = SourceState::Ended;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// src/host/buffer.rs

//! Planar sample storage.
//!
//! `AudioBuffer` holds a whole recording, impulse or render result.
//! `AudioBlock` is the fixed-size scratch that travels between units during
//! one render quantum.

/// Number of frames processed per graph pass.
pub const RENDER_QUANTUM: usize = 128;

/// A multi-channel, fixed-length block of float samples at one sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Builds a buffer from planar channel data. Channels longer than the
    /// shortest one are truncated so every channel has the same length.
    pub fn new(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(frames);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn silent(channel_count: usize, frames: usize, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: vec![vec![0.0; frames]; channel_count],
        }
    }

    /// De-interleaves `samples` (frame-major) into planar channels. A trailing
    /// partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Self {
        let channel_count = channel_count.max(1);
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }
}

/// One render quantum worth of audio for every channel of a graph.
#[derive(Debug, Clone, Default)]
pub struct AudioBlock {
    channels: Vec<[f32; RENDER_QUANTUM]>,
}

impl AudioBlock {
    pub fn new(channel_count: usize) -> Self {
        Self {
            channels: vec![[0.0; RENDER_QUANTUM]; channel_count],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> &[f32; RENDER_QUANTUM] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32; RENDER_QUANTUM] {
        &mut self.channels[index]
    }

    pub fn channels(&self) -> &[[f32; RENDER_QUANTUM]] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [[f32; RENDER_QUANTUM]] {
        &mut self.channels
    }

    pub fn silence(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Sums `other` into this block, channel by channel.
    pub fn add_from(&mut self, other: &AudioBlock) {
        for (dst, src) in self.channels.iter_mut().zip(&other.channels) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d += *s;
            }
        }
    }

    pub fn copy_from(&mut self, other: &AudioBlock) {
        for (dst, src) in self.channels.iter_mut().zip(&other.channels) {
            dst.copy_from_slice(src);
        }
    }

    pub fn is_silent(&self) -> bool {
        self.channels
            .iter()
            .all(|channel| channel.iter().all(|s| *s == 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_frames_are_split_per_channel() {
        let buffer = AudioBuffer::from_interleaved(&[0.1, -0.1, 0.2, -0.2, 0.3], 2, 48000);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0), &[0.1, 0.2]);
        assert_eq!(buffer.channel(1), &[-0.1, -0.2]);
    }

    #[test]
    fn uneven_channels_are_truncated() {
        let buffer = AudioBuffer::new(44100, vec![vec![1.0; 10], vec![1.0; 7]]);
        assert_eq!(buffer.frames(), 7);
        assert_eq!(buffer.channel(0).len(), 7);
    }

    #[test]
    fn duration_follows_sample_rate() {
        let buffer = AudioBuffer::silent(2, 22050, 44100);
        assert!((buffer.duration() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn block_mixing_sums_channels() {
        let mut a = AudioBlock::new(2);
        let mut b = AudioBlock::new(2);
        a.channel_mut(0)[3] = 0.25;
        b.channel_mut(0)[3] = 0.5;
        b.channel_mut(1)[0] = -1.0;
        a.add_from(&b);
        assert_eq!(a.channel(0)[3], 0.75);
        assert_eq!(a.channel(1)[0], -1.0);
        a.silence();
        assert!(a.is_silent());
    }
}

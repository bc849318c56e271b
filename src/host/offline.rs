// src/host/offline.rs

//! Faster-than-real-time rendering of a graph into a buffer.

use super::buffer::{AudioBuffer, RENDER_QUANTUM};
use super::graph::{AudioGraph, ContextKind, GraphError};
use thiserror::Error;

pub const MIN_SAMPLE_RATE: u32 = 3000;
pub const MAX_SAMPLE_RATE: u32 = 768_000;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render format: {0}")]
    InvalidSpec(String),
    #[error("source buffer holds no audio")]
    EmptySource,
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A graph bound to a fixed output length. Rendering consumes the context.
pub struct OfflineContext {
    graph: AudioGraph,
    length: usize,
}

impl OfflineContext {
    pub fn new(channel_count: usize, length: usize, sample_rate: u32) -> Result<Self, RenderError> {
        if channel_count == 0 {
            return Err(RenderError::InvalidSpec("channel count must be at least 1".into()));
        }
        if length == 0 {
            return Err(RenderError::InvalidSpec("length must be at least 1 frame".into()));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(RenderError::InvalidSpec(format!(
                "sample rate {sample_rate} outside {MIN_SAMPLE_RATE}..={MAX_SAMPLE_RATE}"
            )));
        }
        Ok(Self {
            graph: AudioGraph::new(ContextKind::Offline, sample_rate, channel_count),
            length,
        })
    }

    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AudioGraph {
        &mut self.graph
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Pulls quanta until `length` frames exist and returns exactly that many.
    pub fn start_rendering(mut self) -> AudioBuffer {
        let channel_count = self.graph.channel_count();
        let mut channels: Vec<Vec<f32>> = (0..channel_count)
            .map(|_| Vec::with_capacity(self.length + RENDER_QUANTUM))
            .collect();
        let mut rendered = 0;
        while rendered < self.length {
            let block = self.graph.process_quantum();
            let take = (self.length - rendered).min(RENDER_QUANTUM);
            for (channel, out) in channels.iter_mut().enumerate() {
                out.extend_from_slice(&block.channel(channel)[..take]);
            }
            rendered += take;
        }
        tracing::debug!(frames = rendered, channels = channel_count, "offline render finished");
        AudioBuffer::new(self.graph.sample_rate(), channels)
    }
}

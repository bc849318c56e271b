// src/audio_engine.rs

//! Live playback.
//!
//! [`LiveEngine`] lives on the UI thread and owns the transport state
//! machine. [`LiveGraph`] lives inside the output callback and owns the
//! long-lived node groups. The two only talk through a lock-free command
//! queue plus a few atomics, so the callback never blocks on the UI.

pub mod command;
pub mod helpers;

use crate::catalog::{catalog, EffectKind};
use crate::chain::ChainState;
use crate::factory::{self, NodeGroups, Ramp};
use crate::host::{
    Analyser, AudioBlock, AudioBuffer, AudioGraph, BufferSource, ContextKind, Gain, GraphError,
    NodeId, PreparedImpulse, RENDER_QUANTUM,
};
use crate::{impulse, router};
use anyhow::Result;
use command::LiveCommand;
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// The live graph always runs in stereo; the device callback maps it onto
/// whatever channel layout the output has.
pub const LIVE_CHANNELS: usize = 2;
const COMMAND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
}

/// Frames rendered by the audio side, readable from anywhere.
#[derive(Debug, Clone)]
pub struct EngineClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl EngineClock {
    fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

// --- Control side ---

pub struct LiveEngine {
    command_producer: HeapProducer<LiveCommand>,
    clock: EngineClock,
    state: TransportState,
    /// Playback start position in seconds, updated on pause and seek.
    offset: f64,
    /// Clock frame at which the current playback started.
    epoch: u64,
    recording: Option<Arc<AudioBuffer>>,
    live_recording: Option<Arc<AudioBuffer>>,
    source_ended: Arc<AtomicBool>,
    impulse_decay: f32,
}

impl LiveEngine {
    /// Builds both halves. `meter_tap` receives a mono copy of the master
    /// output for metering.
    pub fn new(
        sample_rate: u32,
        chain: &ChainState,
        meter_tap: HeapProducer<f32>,
    ) -> Result<(LiveEngine, LiveGraph), GraphError> {
        let (command_producer, command_consumer) =
            HeapRb::<LiveCommand>::new(COMMAND_QUEUE_CAPACITY).split();
        let clock = EngineClock::new(sample_rate);
        let source_ended = Arc::new(AtomicBool::new(false));

        let mut graph = AudioGraph::new(ContextKind::Realtime, sample_rate, LIVE_CHANNELS);
        let groups = factory::instantiate(&mut graph, catalog())?;
        let master = graph.add(Gain::new(sample_rate as f32, 1.0));
        let analyser = graph.add(Analyser::new(meter_tap));
        let destination = graph.destination();
        graph.connect(master, analyser)?;
        graph.connect(analyser, destination)?;

        for kind in chain.order() {
            if let (Some(group), Some(settings)) = (groups.get(*kind), chain.settings(*kind)) {
                group.apply_settings(&mut graph, settings, Ramp::Immediate);
            }
        }
        let decay = chain
            .get(EffectKind::Reverb, "decay")
            .unwrap_or(impulse::DEFAULT_DECAY);
        if decay != impulse::DEFAULT_DECAY {
            if let Some(group) = groups.get(EffectKind::Reverb) {
                group.set_impulse_buffer(&mut graph, &impulse::generate(sample_rate, decay, decay));
            }
        }

        let engine = LiveEngine {
            command_producer,
            clock: clock.clone(),
            state: TransportState::Stopped,
            offset: 0.0,
            epoch: 0,
            recording: None,
            live_recording: None,
            source_ended: source_ended.clone(),
            impulse_decay: decay,
        };
        let live_graph = LiveGraph {
            command_consumer,
            graph,
            groups,
            master,
            source: None,
            clock: clock.frames,
            source_ended,
            block: AudioBlock::new(LIVE_CHANNELS),
            block_cursor: RENDER_QUANTUM,
        };
        tracing::info!(sample_rate, "live engine ready");
        Ok((engine, live_graph))
    }

    fn send(&mut self, command: LiveCommand) {
        if self.command_producer.push(command).is_err() {
            tracing::warn!("live command queue full, command dropped");
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn clock(&self) -> &EngineClock {
        &self.clock
    }

    /// The recording at its native rate, as loaded.
    pub fn recording(&self) -> Option<&Arc<AudioBuffer>> {
        self.recording.as_ref()
    }

    pub fn has_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn duration(&self) -> f64 {
        self.recording.as_ref().map(|r| r.duration()).unwrap_or(0.0)
    }

    /// Replaces the recording. Playback stops and the position returns to the
    /// start. On error the previous recording stays loaded.
    pub fn load(&mut self, recording: impl Into<Arc<AudioBuffer>>) -> Result<()> {
        let recording = recording.into();
        let live = helpers::resample(&recording, self.clock.sample_rate())?;
        self.stop();
        self.offset = 0.0;
        self.recording = Some(recording);
        self.live_recording = Some(Arc::new(live));
        Ok(())
    }

    pub fn play(&mut self, chain: &ChainState) {
        if self.is_playing() {
            return;
        }
        let Some(recording) = self.live_recording.clone() else {
            return;
        };
        let offset_frames = (self.offset * recording.sample_rate() as f64) as usize;
        self.source_ended.store(false, Ordering::Release);
        self.send(LiveCommand::Play {
            recording,
            offset_frames,
            chain: chain.clone(),
        });
        self.epoch = self.clock.frames();
        self.state = TransportState::Playing;
        tracing::debug!(offset = self.offset, "playback started");
    }

    /// Stops playback and remembers where it got to. Wraps to the start once
    /// the end has been reached. No-op when already stopped.
    pub fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.send(LiveCommand::Stop);
        self.offset += self.elapsed();
        if self.offset >= self.duration() {
            self.offset = 0.0;
        }
        self.state = TransportState::Stopped;
        tracing::debug!(offset = self.offset, "playback paused");
    }

    fn stop(&mut self) {
        if self.is_playing() {
            self.send(LiveCommand::Stop);
            self.state = TransportState::Stopped;
        }
    }

    pub fn toggle(&mut self, chain: &ChainState) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play(chain);
        }
    }

    /// Moves the playhead. While playing, restarts from the new position.
    pub fn seek(&mut self, seconds: f64, chain: &ChainState) {
        let target = seconds.clamp(0.0, self.duration());
        if self.is_playing() {
            self.pause();
            self.offset = target;
            self.play(chain);
        } else {
            self.offset = target;
        }
    }

    fn elapsed(&self) -> f64 {
        self.clock.frames().saturating_sub(self.epoch) as f64 / self.clock.sample_rate() as f64
    }

    /// Current playhead in seconds.
    pub fn position(&self) -> f64 {
        match self.state {
            TransportState::Playing => (self.offset + self.elapsed()).min(self.duration()),
            TransportState::Stopped => self.offset,
        }
    }

    /// Playhead as a fraction of the recording.
    pub fn progress(&self) -> f32 {
        let duration = self.duration();
        if duration <= 0.0 {
            0.0
        } else {
            (self.position() / duration).clamp(0.0, 1.0) as f32
        }
    }

    /// Forwards one parameter edit, smoothed. Reverb decay swaps in a newly
    /// generated impulse instead.
    pub fn set_parameter(&mut self, effect: EffectKind, key: &str, value: f32) {
        let Some(param) = effect.descriptor().param(key) else {
            return;
        };
        if effect == EffectKind::Reverb && param.key == "decay" {
            self.set_decay(value);
            return;
        }
        self.send(LiveCommand::SetParameter {
            effect,
            key: param.key,
            value,
        });
    }

    fn set_decay(&mut self, decay: f32) {
        if decay == self.impulse_decay {
            return;
        }
        self.impulse_decay = decay;
        let buffer = impulse::generate(self.clock.sample_rate(), decay, decay);
        let prepared = PreparedImpulse::prepare(&buffer, LIVE_CHANNELS);
        self.send(LiveCommand::SetImpulse {
            impulse: Box::new(prepared),
        });
    }

    /// Pushes every value of `chain` (after a global reset, for example).
    pub fn apply_all(&mut self, chain: &ChainState) {
        for kind in chain.order() {
            let Some(settings) = chain.settings(*kind) else {
                continue;
            };
            if *kind == EffectKind::Reverb {
                if let Some(decay) = settings.get("decay") {
                    self.set_decay(decay);
                }
            }
            self.send(LiveCommand::ApplySettings {
                effect: *kind,
                settings: settings.clone(),
            });
        }
    }

    /// Topology changed (reorder or bypass): a running source is restarted
    /// at the current position through the new wiring.
    pub fn rewire(&mut self, chain: &ChainState) {
        if self.is_playing() {
            self.pause();
            self.play(chain);
        }
    }

    /// Call once per UI frame. Returns `true` when playback ran off the end
    /// and the transport went back to the start.
    pub fn poll(&mut self) -> bool {
        if self.is_playing() && self.source_ended.swap(false, Ordering::AcqRel) {
            self.state = TransportState::Stopped;
            self.offset = 0.0;
            tracing::debug!("playback reached the end");
            return true;
        }
        false
    }
}

// --- Audio side ---

pub struct LiveGraph {
    command_consumer: HeapConsumer<LiveCommand>,
    graph: AudioGraph,
    groups: NodeGroups,
    master: NodeId,
    source: Option<NodeId>,
    clock: Arc<AtomicU64>,
    source_ended: Arc<AtomicBool>,
    block: AudioBlock,
    block_cursor: usize,
}

impl LiveGraph {
    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    pub fn groups(&self) -> &NodeGroups {
        &self.groups
    }

    pub fn master(&self) -> NodeId {
        self.master
    }

    pub fn source(&self) -> Option<NodeId> {
        self.source
    }

    pub fn handle_commands(&mut self) {
        while let Some(command) = self.command_consumer.pop() {
            match command {
                LiveCommand::Play {
                    recording,
                    offset_frames,
                    chain,
                } => {
                    self.drop_source();
                    let mut source = BufferSource::new(recording, LIVE_CHANNELS);
                    source.start(offset_frames);
                    let id = self.graph.add(source);
                    self.source = Some(id);
                    if let Err(e) =
                        router::connect(&mut self.graph, id, self.master, &chain, &self.groups)
                    {
                        tracing::warn!("failed to wire live chain: {}", e);
                    }
                }
                LiveCommand::Stop => self.drop_source(),
                LiveCommand::SetParameter { effect, key, value } => {
                    if let Some(group) = self.groups.get(effect) {
                        group.apply_parameter(&mut self.graph, key, value, Ramp::Smoothed);
                    }
                }
                LiveCommand::ApplySettings { effect, settings } => {
                    if let Some(group) = self.groups.get(effect) {
                        group.apply_settings(&mut self.graph, &settings, Ramp::Smoothed);
                    }
                }
                LiveCommand::SetImpulse { impulse } => {
                    if let Some(group) = self.groups.get(EffectKind::Reverb) {
                        group.set_impulse(&mut self.graph, *impulse);
                    }
                }
            }
        }
    }

    fn drop_source(&mut self) {
        if let Some(id) = self.source.take() {
            self.graph.remove(id);
        }
    }

    fn render_quantum(&mut self) {
        let out = self.graph.process_quantum();
        self.block.copy_from(out);
        self.block_cursor = 0;

        if let Some(id) = self.source {
            let ended = self
                .graph
                .unit::<BufferSource>(id)
                .map(BufferSource::is_ended)
                .unwrap_or(true);
            if ended {
                self.drop_source();
                self.source_ended.store(true, Ordering::Release);
            }
        }
    }

    /// Fills an interleaved device buffer. Frames left over from the last
    /// quantum are used first so device and graph block sizes need not match.
    pub fn render_interleaved(&mut self, out: &mut [f32], device_channels: usize) {
        let device_channels = device_channels.max(1);
        let mut written = 0;
        while written * device_channels < out.len() {
            if self.block_cursor >= RENDER_QUANTUM {
                self.render_quantum();
            }
            let frames = helpers::interleave_into(
                self.block.channels(),
                self.block_cursor,
                &mut out[written * device_channels..],
                device_channels,
            );
            if frames == 0 {
                break;
            }
            self.block_cursor += frames;
            written += frames;
        }
        self.clock.fetch_add(written as u64, Ordering::AcqRel);
    }
}

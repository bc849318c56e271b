// src/audio_engine/command.rs

//! Messages from the control thread to the audio callback.

use crate::catalog::EffectKind;
use crate::chain::{ChainState, EffectSettings};
use crate::host::{AudioBuffer, PreparedImpulse};
use std::sync::Arc;

#[derive(Debug)]
pub enum LiveCommand {
    /// Start a new source at `offset_frames`, wired through `chain`. Any
    /// source still playing is dropped first.
    Play {
        recording: Arc<AudioBuffer>,
        offset_frames: usize,
        chain: ChainState,
    },
    /// Halt and discard the current source. Harmless when nothing plays.
    Stop,
    SetParameter {
        effect: EffectKind,
        key: &'static str,
        value: f32,
    },
    ApplySettings {
        effect: EffectKind,
        settings: EffectSettings,
    },
    /// A reverb kernel already partitioned off the audio thread.
    SetImpulse { impulse: Box<PreparedImpulse> },
}

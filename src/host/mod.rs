// src/host/mod.rs

//! The audio host: a small pull graph of processing units evaluated one
//! render quantum at a time, in either a real-time or an offline context.
//! The effect engine only composes these units; it never does DSP itself.

pub mod analyser;
pub mod biquad;
pub mod buffer;
pub mod convolver;
pub mod delay;
pub mod dynamics;
pub mod gain;
pub mod graph;
pub mod offline;
pub mod param;
pub mod source;

pub use analyser::Analyser;
pub use biquad::{Biquad, BiquadKind};
pub use buffer::{AudioBlock, AudioBuffer, RENDER_QUANTUM};
pub use convolver::{Convolver, PreparedImpulse};
pub use delay::DelayLine;
pub use dynamics::Dynamics;
pub use gain::Gain;
pub use graph::{AudioGraph, ContextKind, GraphError, NodeId};
pub use offline::{OfflineContext, RenderError};
pub use param::AudioParam;
pub use source::BufferSource;

use std::any::Any;

/// A common interface for every processing unit that can live in a graph.
pub trait DspUnit: Send + Any {
    /// Renders one quantum. `input` is the sum of every connected upstream
    /// output; `output` has the graph's channel count.
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock);

    /// Units that emit before reading their input (delay lines) may close a
    /// feedback cycle. For those the graph calls `process` with silence first
    /// and hands over the real input through `absorb` once every other unit
    /// has run.
    fn breaks_cycles(&self) -> bool {
        false
    }

    fn absorb(&mut self, _input: &AudioBlock) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// src/factory.rs

//! Builds one node group per catalog entry inside a graph.
//!
//! Every group exposes the same shape: an input junction and an output
//! junction, both unity gains, with the effect's own units wired between
//! them when the group is created. Routing only ever touches the junctions.

use crate::catalog::{EffectDescriptor, EffectKind};
use crate::chain::EffectSettings;
use crate::host::{
    AudioBuffer, AudioGraph, AudioParam, Biquad, BiquadKind, ContextKind, Convolver, DelayLine,
    Dynamics, Gain, GraphError, NodeId, PreparedImpulse,
};
use crate::impulse;
use std::collections::BTreeMap;

pub const LOW_SHELF_HZ: f32 = 320.0;
pub const PEAK_HZ: f32 = 1000.0;
pub const HIGH_SHELF_HZ: f32 = 3200.0;
pub const MAX_DELAY_SECONDS: f32 = 2.0;

// Smoothing time constants for live edits, in seconds.
const GAIN_TIME_CONSTANT: f32 = 0.1;
const DELAY_TIME_CONSTANT: f32 = 0.2;
const MIX_TIME_CONSTANT: f32 = 0.01;

/// How a parameter change reaches a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    /// Jump straight to the value (offline setup).
    Immediate,
    /// Approach the value with a short time constant (live edits).
    Smoothed,
}

/// The internal units of one effect, by variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectUnits {
    Equalizer {
        low: NodeId,
        mid: NodeId,
        high: NodeId,
    },
    Compressor {
        dynamics: NodeId,
    },
    Delay {
        delay: NodeId,
        feedback: NodeId,
        wet: NodeId,
        dry: NodeId,
    },
    Reverb {
        convolver: NodeId,
        wet: NodeId,
        dry: NodeId,
    },
}

impl EffectUnits {
    pub fn nodes(&self) -> Vec<NodeId> {
        match *self {
            EffectUnits::Equalizer { low, mid, high } => vec![low, mid, high],
            EffectUnits::Compressor { dynamics } => vec![dynamics],
            EffectUnits::Delay {
                delay,
                feedback,
                wet,
                dry,
            } => vec![delay, feedback, wet, dry],
            EffectUnits::Reverb {
                convolver,
                wet,
                dry,
            } => vec![convolver, wet, dry],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeGroup {
    pub kind: EffectKind,
    pub input: NodeId,
    pub output: NodeId,
    pub units: EffectUnits,
}

impl NodeGroup {
    /// Pushes one parameter value into the matching unit. Returns `false`
    /// for keys that have no unit behind them (reverb decay is applied by
    /// swapping the impulse instead).
    pub fn apply_parameter(&self, graph: &mut AudioGraph, key: &str, value: f32, ramp: Ramp) -> bool {
        match (self.units, key) {
            (EffectUnits::Equalizer { low, .. }, "low_gain") => {
                with_biquad(graph, low, |p| set(p, value, ramp, GAIN_TIME_CONSTANT))
            }
            (EffectUnits::Equalizer { mid, .. }, "mid_gain") => {
                with_biquad(graph, mid, |p| set(p, value, ramp, GAIN_TIME_CONSTANT))
            }
            (EffectUnits::Equalizer { high, .. }, "high_gain") => {
                with_biquad(graph, high, |p| set(p, value, ramp, GAIN_TIME_CONSTANT))
            }
            (EffectUnits::Compressor { dynamics }, key) => {
                let Some(unit) = graph.unit_mut::<Dynamics>(dynamics) else {
                    return false;
                };
                let param = match key {
                    "threshold" => unit.threshold_mut(),
                    "ratio" => unit.ratio_mut(),
                    "attack" => unit.attack_mut(),
                    "release" => unit.release_mut(),
                    _ => return false,
                };
                set(param, value, ramp, GAIN_TIME_CONSTANT);
                true
            }
            (EffectUnits::Delay { delay, .. }, "time") => match graph.unit_mut::<DelayLine>(delay) {
                Some(unit) => {
                    set(unit.delay_time_mut(), value, ramp, DELAY_TIME_CONSTANT);
                    true
                }
                None => false,
            },
            (EffectUnits::Delay { feedback, .. }, "feedback") => {
                with_gain(graph, feedback, value, ramp, GAIN_TIME_CONSTANT)
            }
            (EffectUnits::Delay { wet, dry, .. }, "mix")
            | (EffectUnits::Reverb { wet, dry, .. }, "mix") => {
                with_gain(graph, dry, 1.0 - value, ramp, MIX_TIME_CONSTANT)
                    && with_gain(graph, wet, value, ramp, MIX_TIME_CONSTANT)
            }
            _ => false,
        }
    }

    /// Pushes every value of `settings`. Bypass is a routing concern and is
    /// not looked at here.
    pub fn apply_settings(&self, graph: &mut AudioGraph, settings: &EffectSettings, ramp: Ramp) {
        for (key, value) in settings.values() {
            self.apply_parameter(graph, key, value, ramp);
        }
    }

    /// Installs a reverb impulse. No-op for other effects.
    pub fn set_impulse(&self, graph: &mut AudioGraph, impulse: PreparedImpulse) -> bool {
        let EffectUnits::Reverb { convolver, .. } = self.units else {
            return false;
        };
        match graph.unit_mut::<Convolver>(convolver) {
            Some(unit) => {
                unit.set_impulse(impulse);
                true
            }
            None => false,
        }
    }

    pub fn set_impulse_buffer(&self, graph: &mut AudioGraph, buffer: &AudioBuffer) -> bool {
        let prepared = PreparedImpulse::prepare(buffer, graph.channel_count());
        self.set_impulse(graph, prepared)
    }
}

fn set(param: &mut AudioParam, value: f32, ramp: Ramp, time_constant: f32) {
    match ramp {
        Ramp::Immediate => param.set_value(value),
        Ramp::Smoothed => param.set_target_at_time(value, time_constant),
    }
}

fn with_biquad(graph: &mut AudioGraph, id: NodeId, f: impl FnOnce(&mut AudioParam)) -> bool {
    match graph.unit_mut::<Biquad>(id) {
        Some(unit) => {
            f(unit.gain_db_mut());
            true
        }
        None => false,
    }
}

fn with_gain(graph: &mut AudioGraph, id: NodeId, value: f32, ramp: Ramp, time_constant: f32) -> bool {
    match graph.unit_mut::<Gain>(id) {
        Some(unit) => {
            set(unit.gain_mut(), value, ramp, time_constant);
            true
        }
        None => false,
    }
}

/// All node groups of one graph, keyed by effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeGroups {
    groups: BTreeMap<EffectKind, NodeGroup>,
}

impl NodeGroups {
    pub fn get(&self, kind: EffectKind) -> Option<&NodeGroup> {
        self.groups.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Creates one group per descriptor in `catalog`, every unit at its catalog
/// default. In a real-time graph the reverb starts with the default impulse;
/// an offline reverb stays silent until the caller installs one.
pub fn instantiate(graph: &mut AudioGraph, catalog: &[EffectDescriptor]) -> Result<NodeGroups, GraphError> {
    let mut groups = BTreeMap::new();
    for descriptor in catalog {
        let group = build_group(graph, descriptor)?;
        for param in descriptor.params {
            group.apply_parameter(graph, param.key, param.default, Ramp::Immediate);
        }
        tracing::debug!(effect = descriptor.id(), "node group created");
        groups.insert(descriptor.kind, group);
    }
    Ok(NodeGroups { groups })
}

fn build_group(graph: &mut AudioGraph, descriptor: &EffectDescriptor) -> Result<NodeGroup, GraphError> {
    let sample_rate = graph.sample_rate() as f32;
    let channels = graph.channel_count();
    let input = graph.add(Gain::new(sample_rate, 1.0));
    let output = graph.add(Gain::new(sample_rate, 1.0));

    let units = match descriptor.kind {
        EffectKind::Equalizer => {
            let low = graph.add(Biquad::new(BiquadKind::LowShelf, LOW_SHELF_HZ, sample_rate, channels));
            let mid = graph.add(Biquad::new(BiquadKind::Peaking, PEAK_HZ, sample_rate, channels));
            let high = graph.add(Biquad::new(BiquadKind::HighShelf, HIGH_SHELF_HZ, sample_rate, channels));
            graph.connect(input, low)?;
            graph.connect(low, mid)?;
            graph.connect(mid, high)?;
            graph.connect(high, output)?;
            EffectUnits::Equalizer { low, mid, high }
        }
        EffectKind::Compressor => {
            let dynamics = graph.add(Dynamics::new(sample_rate));
            graph.connect(input, dynamics)?;
            graph.connect(dynamics, output)?;
            EffectUnits::Compressor { dynamics }
        }
        EffectKind::Delay => {
            let delay = graph.add(DelayLine::new(sample_rate, channels, MAX_DELAY_SECONDS));
            let feedback = graph.add(Gain::new(sample_rate, 0.0));
            let wet = graph.add(Gain::new(sample_rate, 0.0));
            let dry = graph.add(Gain::new(sample_rate, 1.0));
            graph.connect(input, dry)?;
            graph.connect(dry, output)?;
            graph.connect(input, delay)?;
            graph.connect(delay, feedback)?;
            graph.connect(feedback, delay)?;
            graph.connect(delay, wet)?;
            graph.connect(wet, output)?;
            EffectUnits::Delay {
                delay,
                feedback,
                wet,
                dry,
            }
        }
        EffectKind::Reverb => {
            let mut unit = Convolver::new(channels);
            if graph.kind() == ContextKind::Realtime {
                let buffer = impulse::generate(
                    graph.sample_rate(),
                    impulse::DEFAULT_DURATION,
                    impulse::DEFAULT_DECAY,
                );
                unit.set_buffer(&buffer);
            }
            let convolver = graph.add(unit);
            let wet = graph.add(Gain::new(sample_rate, 0.0));
            let dry = graph.add(Gain::new(sample_rate, 1.0));
            graph.connect(input, dry)?;
            graph.connect(dry, output)?;
            graph.connect(input, convolver)?;
            graph.connect(convolver, wet)?;
            graph.connect(wet, output)?;
            EffectUnits::Reverb {
                convolver,
                wet,
                dry,
            }
        }
    };

    Ok(NodeGroup {
        kind: descriptor.kind,
        input,
        output,
        units,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;

    fn offline_groups() -> (AudioGraph, NodeGroups) {
        let mut graph = AudioGraph::new(ContextKind::Offline, 44100, 2);
        let groups = instantiate(&mut graph, catalog()).unwrap();
        (graph, groups)
    }

    #[test]
    fn one_group_per_catalog_entry() {
        let (graph, groups) = offline_groups();
        assert_eq!(groups.len(), 4);
        for group in groups.iter() {
            assert!(graph.contains(group.input));
            assert!(graph.contains(group.output));
            for node in group.units.nodes() {
                assert!(graph.contains(node));
            }
        }
    }

    #[test]
    fn units_start_at_catalog_defaults() {
        let (mut graph, groups) = offline_groups();
        let delay = groups.get(EffectKind::Delay).unwrap();
        let EffectUnits::Delay { delay: line, feedback, wet, dry } = delay.units else {
            panic!("wrong units for delay");
        };
        assert!((graph.unit::<DelayLine>(line).unwrap().delay_time().value() - 0.3).abs() < 1e-6);
        assert!((graph.unit::<Gain>(feedback).unwrap().gain().value() - 0.4).abs() < 1e-6);
        assert!((graph.unit::<Gain>(wet).unwrap().gain().value() - 0.4).abs() < 1e-6);
        assert!((graph.unit::<Gain>(dry).unwrap().gain().value() - 0.6).abs() < 1e-6);

        let comp = groups.get(EffectKind::Compressor).unwrap();
        let EffectUnits::Compressor { dynamics } = comp.units else {
            panic!("wrong units for compressor");
        };
        let unit = graph.unit_mut::<Dynamics>(dynamics).unwrap();
        assert_eq!(unit.threshold().value(), -24.0);
        assert_eq!(unit.ratio().value(), 4.0);
    }

    #[test]
    fn mix_is_complementary() {
        let (mut graph, groups) = offline_groups();
        let reverb = groups.get(EffectKind::Reverb).unwrap();
        assert!(reverb.apply_parameter(&mut graph, "mix", 0.75, Ramp::Immediate));
        let EffectUnits::Reverb { wet, dry, .. } = reverb.units else {
            panic!("wrong units for reverb");
        };
        assert_eq!(graph.unit::<Gain>(wet).unwrap().gain().value(), 0.75);
        assert_eq!(graph.unit::<Gain>(dry).unwrap().gain().value(), 0.25);
    }

    #[test]
    fn smoothed_edits_only_set_a_target() {
        let (mut graph, groups) = offline_groups();
        let eq = groups.get(EffectKind::Equalizer).unwrap();
        assert!(eq.apply_parameter(&mut graph, "mid_gain", 6.0, Ramp::Smoothed));
        let EffectUnits::Equalizer { mid, .. } = eq.units else {
            panic!("wrong units for eq");
        };
        let gain = graph.unit::<Biquad>(mid).unwrap().gain_db();
        assert_eq!(gain.value(), 0.0);
        assert_eq!(gain.target(), 6.0);
    }

    #[test]
    fn unknown_keys_and_decay_are_not_unit_parameters() {
        let (mut graph, groups) = offline_groups();
        let reverb = groups.get(EffectKind::Reverb).unwrap();
        assert!(!reverb.apply_parameter(&mut graph, "decay", 3.0, Ramp::Immediate));
        let eq = groups.get(EffectKind::Equalizer).unwrap();
        assert!(!eq.apply_parameter(&mut graph, "mix", 0.5, Ramp::Immediate));
    }

    #[test]
    fn reverb_impulse_depends_on_context() {
        let (graph, groups) = offline_groups();
        let EffectUnits::Reverb { convolver, .. } = groups.get(EffectKind::Reverb).unwrap().units else {
            panic!("wrong units for reverb");
        };
        assert!(!graph.unit::<Convolver>(convolver).unwrap().has_impulse());

        let mut live = AudioGraph::new(ContextKind::Realtime, 8000, 2);
        let groups = instantiate(&mut live, catalog()).unwrap();
        let EffectUnits::Reverb { convolver, .. } = groups.get(EffectKind::Reverb).unwrap().units else {
            panic!("wrong units for reverb");
        };
        let unit = live.unit::<Convolver>(convolver).unwrap();
        assert!(unit.has_impulse());
        assert_eq!(unit.impulse().map(PreparedImpulse::frames), Some(16000));
    }
}

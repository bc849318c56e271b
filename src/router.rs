// src/router.rs

//! Wires a source through the enabled effects of a chain into a destination.

use crate::catalog::EffectKind;
use crate::chain::ChainState;
use crate::factory::NodeGroups;
use crate::host::{AudioGraph, GraphError, NodeId};

/// Replaces whatever wiring exists between `source` and `destination` with
/// `source -> enabled effects in chain order -> destination`. Bypassed
/// effects are left fully detached. Returns the effects now in the path.
pub fn connect(
    graph: &mut AudioGraph,
    source: NodeId,
    destination: NodeId,
    chain: &ChainState,
    groups: &NodeGroups,
) -> Result<Vec<EffectKind>, GraphError> {
    graph.disconnect_outputs(source);
    graph.disconnect_inputs(destination);
    for group in groups.iter() {
        graph.disconnect_inputs(group.input);
        graph.disconnect_outputs(group.output);
    }

    let mut tail = source;
    let mut route = Vec::new();
    for kind in chain.enabled() {
        let Some(group) = groups.get(kind) else {
            continue;
        };
        graph.connect(tail, group.input)?;
        tail = group.output;
        route.push(kind);
    }
    graph.connect(tail, destination)?;

    tracing::debug!(route = ?route, "chain wired");
    Ok(route)
}

/// Follows the wiring from `source` and returns the effects the signal
/// passes through, or `None` if the path forks, dead-ends or never reaches
/// `destination`.
pub fn trace(
    graph: &AudioGraph,
    source: NodeId,
    destination: NodeId,
    groups: &NodeGroups,
) -> Option<Vec<EffectKind>> {
    let mut route = Vec::new();
    let mut at = source;
    // Each hop either enters a group or ends at the destination.
    for _ in 0..=groups.len() {
        let next = match graph.downstream(at).as_slice() {
            [next] => *next,
            _ => return None,
        };
        if next == destination {
            return Some(route);
        }
        let group = groups.iter().find(|group| group.input == next)?;
        route.push(group.kind);
        at = group.output;
    }
    None
}

// src/host/graph.rs

//! Node storage, connections and per-quantum evaluation order.

use super::buffer::{AudioBlock, RENDER_QUANTUM};
use super::gain::Gain;
use super::DspUnit;
use thiserror::Error;

/// Handle to a unit inside one particular graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// Which flavour of host a graph belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Realtime,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0:?} does not exist in this graph")]
    UnknownNode(NodeId),
    #[error("node {0:?} cannot be connected to itself")]
    SelfConnection(NodeId),
}

struct Node {
    unit: Box<dyn DspUnit>,
    inputs: Vec<NodeId>,
    output: AudioBlock,
}

/// A set of units plus the connections between them. Every graph owns a
/// unity-gain destination node; only units that can reach it are rendered.
pub struct AudioGraph {
    kind: ContextKind,
    sample_rate: u32,
    channel_count: usize,
    nodes: Vec<Option<Node>>,
    destination: NodeId,
    order: Vec<usize>,
    cycle_breakers: Vec<usize>,
    order_dirty: bool,
    mix: AudioBlock,
    frames_processed: u64,
    reported_cycle: bool,
}

impl AudioGraph {
    pub fn new(kind: ContextKind, sample_rate: u32, channel_count: usize) -> Self {
        let channel_count = channel_count.max(1);
        let mut graph = Self {
            kind,
            sample_rate,
            channel_count,
            nodes: Vec::new(),
            destination: NodeId(0),
            order: Vec::new(),
            cycle_breakers: Vec::new(),
            order_dirty: true,
            mix: AudioBlock::new(channel_count),
            frames_processed: 0,
            reported_cycle: false,
        };
        graph.destination = graph.add(Gain::new(sample_rate as f32, 1.0));
        graph
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames_processed as f64 / self.sample_rate as f64
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Adds a unit, reusing the slot of a removed one when there is one.
    pub fn add<U: DspUnit>(&mut self, unit: U) -> NodeId {
        let node = Node {
            unit: Box::new(unit),
            inputs: Vec::new(),
            output: AudioBlock::new(self.channel_count),
        };
        self.order_dirty = true;
        match self.nodes.iter().position(Option::is_none) {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Drops a unit and every connection touching it. The destination
    /// cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Option<Box<dyn DspUnit>> {
        if id == self.destination {
            return None;
        }
        let node = self.nodes.get_mut(id.0)?.take()?;
        self.disconnect_outputs(id);
        self.order_dirty = true;
        Some(node.unit)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0), Some(Some(_)))
    }

    /// Connects `from`'s output into `to`'s input. Connecting twice is a
    /// no-op.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        if from == to {
            return Err(GraphError::SelfConnection(from));
        }
        if !self.contains(from) {
            return Err(GraphError::UnknownNode(from));
        }
        let target = self.node_mut(to)?;
        if !target.inputs.contains(&from) {
            target.inputs.push(from);
            self.order_dirty = true;
        }
        Ok(())
    }

    pub fn disconnect(&mut self, from: NodeId, to: NodeId) {
        if let Some(Some(node)) = self.nodes.get_mut(to.0) {
            node.inputs.retain(|input| *input != from);
            self.order_dirty = true;
        }
    }

    /// Removes every connection leaving `from`.
    pub fn disconnect_outputs(&mut self, from: NodeId) {
        for node in self.nodes.iter_mut().flatten() {
            node.inputs.retain(|input| *input != from);
        }
        self.order_dirty = true;
    }

    /// Removes every connection arriving at `to`.
    pub fn disconnect_inputs(&mut self, to: NodeId) {
        if let Some(Some(node)) = self.nodes.get_mut(to.0) {
            node.inputs.clear();
            self.order_dirty = true;
        }
    }

    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        match self.nodes.get(to.0) {
            Some(Some(node)) => node.inputs.contains(&from),
            _ => false,
        }
    }

    pub fn inputs_of(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id.0) {
            Some(Some(node)) => &node.inputs,
            _ => &[],
        }
    }

    /// Nodes that `id` feeds directly, in id order.
    pub fn downstream(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| match node {
                Some(node) if node.inputs.contains(&id) => Some(NodeId(index)),
                _ => None,
            })
            .collect()
    }

    pub fn unit<T: DspUnit>(&self, id: NodeId) -> Option<&T> {
        match self.nodes.get(id.0) {
            Some(Some(node)) => node.unit.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn unit_mut<T: DspUnit>(&mut self, id: NodeId) -> Option<&mut T> {
        match self.nodes.get_mut(id.0) {
            Some(Some(node)) => node.unit.as_any_mut().downcast_mut::<T>(),
            _ => None,
        }
    }

    /// Renders one quantum through every unit that reaches the destination
    /// and returns the destination's output.
    pub fn process_quantum(&mut self) -> &AudioBlock {
        if self.order_dirty {
            self.rebuild_order();
        }

        let order = std::mem::take(&mut self.order);
        for &index in &order {
            self.render_node(index);
        }
        self.order = order;

        let breakers = std::mem::take(&mut self.cycle_breakers);
        for &index in &breakers {
            self.collect_inputs(index);
            if let Some(node) = self.nodes[index].as_mut() {
                node.unit.absorb(&self.mix);
            }
        }
        self.cycle_breakers = breakers;

        self.frames_processed += RENDER_QUANTUM as u64;
        self.nodes[self.destination.0]
            .as_ref()
            .map(|node| &node.output)
            .unwrap_or(&self.mix)
    }

    fn render_node(&mut self, index: usize) {
        let breaks_cycles = match self.nodes[index].as_ref() {
            Some(node) => node.unit.breaks_cycles(),
            None => return,
        };
        if breaks_cycles {
            self.mix.silence();
        } else {
            self.collect_inputs(index);
        }
        if let Some(node) = self.nodes[index].as_mut() {
            node.unit.process(&self.mix, &mut node.output);
        }
    }

    fn collect_inputs(&mut self, index: usize) {
        let mut mix = std::mem::take(&mut self.mix);
        mix.silence();
        if let Some(node) = self.nodes[index].as_ref() {
            for input in &node.inputs {
                if let Some(Some(upstream)) = self.nodes.get(input.0) {
                    mix.add_from(&upstream.output);
                }
            }
        }
        self.mix = mix;
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        match self.nodes.get_mut(id.0) {
            Some(Some(node)) => Ok(node),
            _ => Err(GraphError::UnknownNode(id)),
        }
    }

    /// Topologically orders the nodes that can reach the destination. Edges
    /// into cycle-breaking units do not constrain the order because those
    /// units emit before they absorb.
    fn rebuild_order(&mut self) {
        let count = self.nodes.len();
        let mut reachable = vec![false; count];
        let mut stack = vec![self.destination.0];
        reachable[self.destination.0] = true;
        while let Some(index) = stack.pop() {
            if let Some(node) = &self.nodes[index] {
                for input in &node.inputs {
                    if !reachable[input.0] && self.nodes[input.0].is_some() {
                        reachable[input.0] = true;
                        stack.push(input.0);
                    }
                }
            }
        }

        let mut pending = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        self.cycle_breakers.clear();
        for (index, node) in self.nodes.iter().enumerate() {
            let Some(node) = node else { continue };
            if !reachable[index] {
                continue;
            }
            if node.unit.breaks_cycles() {
                self.cycle_breakers.push(index);
                continue;
            }
            for input in &node.inputs {
                if reachable[input.0] {
                    pending[index] += 1;
                    dependents[input.0].push(index);
                }
            }
        }

        let mut ready: Vec<usize> = (0..count)
            .filter(|&index| reachable[index] && pending[index] == 0)
            .rev()
            .collect();
        let mut order = Vec::with_capacity(count);
        let mut placed = vec![false; count];
        while let Some(index) = ready.pop() {
            order.push(index);
            placed[index] = true;
            for &dependent in dependents[index].iter().rev() {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.push(dependent);
                }
            }
        }

        let stranded: Vec<usize> = (0..count)
            .filter(|&index| reachable[index] && !placed[index])
            .collect();
        if !stranded.is_empty() {
            if !self.reported_cycle {
                tracing::warn!(
                    nodes = stranded.len(),
                    "feedback cycle without a delay line; reading previous quantum"
                );
                self.reported_cycle = true;
            }
            order.extend(stranded);
        }

        self.order = order;
        self.order_dirty = false;
    }
}

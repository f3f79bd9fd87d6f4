use std::fmt;

use crate::MAX_BLOCK_SIZE;

use super::{
    gain::GainNode,
    message::GraphCommand,
    node::{Node, NodeId, NodeKind, RenderCtx, Target},
    oscillator::{OscNode, OscState},
};

/// Errors raised when a `GraphCommand` cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GraphError {
    /// The id was never handed out by this graph.
    UnknownNode(NodeId),
    /// The node existed once but has been dropped from the graph.
    Retired(NodeId),
    /// Creation ids must match `next_id()`.
    IdMismatch { expected: NodeId, actual: NodeId },
    NotAnOscillator(NodeId),
    NotAGain(NodeId),
    /// Oscillators produce sound but accept no input.
    NotAnInput(NodeId),
    /// Connecting would make the output chain loop back on itself.
    Cycle { from: NodeId, to: NodeId },
    /// Oscillators can only be started once.
    AlreadyStarted(NodeId),
    NonFinite(f32),
    Full { capacity: usize },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownNode(id) => write!(f, "unknown node {id}"),
            GraphError::Retired(id) => write!(f, "node {id} has been retired"),
            GraphError::IdMismatch { expected, actual } => {
                write!(f, "expected new node id {expected}, got {actual}")
            }
            GraphError::NotAnOscillator(id) => write!(f, "node {id} is not an oscillator"),
            GraphError::NotAGain(id) => write!(f, "node {id} is not a gain"),
            GraphError::NotAnInput(id) => write!(f, "node {id} does not accept input"),
            GraphError::Cycle { from, to } => {
                write!(f, "connecting {from} to {to} would create a cycle")
            }
            GraphError::AlreadyStarted(id) => write!(f, "oscillator {id} was already started"),
            GraphError::NonFinite(value) => write!(f, "parameter value {value} is not finite"),
            GraphError::Full { capacity } => {
                write!(f, "signal graph is full ({capacity} nodes)")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Lookup result for ids that may have been retired.
enum Slot {
    Live(usize),
    Retired,
}

/// A set of oscillator and gain nodes routed to a single output sink.
///
/// Every node has at most one output. A running oscillator is heard when
/// following its outputs reaches `Target::Destination`; its samples are
/// scaled by every gain passed on the way.
///
/// Nodes are dropped once they can no longer make sound: an oscillator as
/// soon as it is stopped, a gain once it has neither inputs nor an output
/// after a stop or disconnect touched it. Commands addressed to a dropped
/// node that cannot matter anymore (stop, disconnect, parameter changes) are
/// accepted and ignored.
#[derive(Debug, Clone)]
pub struct SignalGraph {
    nodes: Vec<(NodeId, Node)>,
    capacity: usize,
    next_id: u64,
    scratch: Vec<f32>,
}

impl SignalGraph {
    /// Create a graph that holds at most `capacity` live nodes.
    ///
    /// All storage is reserved up front so applying commands and rendering
    /// never allocate.
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            capacity,
            next_id: 0,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Id the next created node will receive.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.next_id)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.position(id).map(|idx| &self.nodes[idx].1)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.position(id).is_some()
    }

    /// Current frequency of a live oscillator.
    pub fn frequency(&self, id: NodeId) -> Option<f32> {
        self.node(id)
            .and_then(Node::as_oscillator)
            .map(OscNode::frequency)
    }

    /// Current value of a live gain node.
    pub fn gain(&self, id: NodeId) -> Option<f32> {
        self.node(id).and_then(Node::as_gain).map(GainNode::gain)
    }

    pub fn output(&self, id: NodeId) -> Option<Target> {
        self.node(id).and_then(|node| node.output)
    }

    /// Number of oscillators currently running.
    pub fn running_oscillators(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|(_, node)| node.as_oscillator())
            .filter(|osc| osc.is_running())
            .count()
    }

    /// Check that `command` can be applied without changing anything.
    pub fn validate(&self, command: &GraphCommand) -> Result<(), GraphError> {
        match *command {
            GraphCommand::CreateOscillator { id, .. } | GraphCommand::CreateGain { id } => {
                let expected = self.next_id();
                if id != expected {
                    return Err(GraphError::IdMismatch {
                        expected,
                        actual: id,
                    });
                }
                if self.nodes.len() >= self.capacity {
                    return Err(GraphError::Full {
                        capacity: self.capacity,
                    });
                }
                Ok(())
            }
            GraphCommand::Connect { from, to } => {
                match self.slot(from)? {
                    Slot::Live(_) => {}
                    Slot::Retired => return Err(GraphError::Retired(from)),
                }
                if let Target::Node(to) = to {
                    let idx = match self.slot(to)? {
                        Slot::Live(idx) => idx,
                        Slot::Retired => return Err(GraphError::Retired(to)),
                    };
                    if !self.nodes[idx].1.is_gain() {
                        return Err(GraphError::NotAnInput(to));
                    }
                    if self.reaches(to, from) {
                        return Err(GraphError::Cycle { from, to });
                    }
                }
                Ok(())
            }
            GraphCommand::Disconnect { node } => self.slot(node).map(|_| ()),
            GraphCommand::Start { node } => match self.slot(node)? {
                Slot::Live(idx) => match &self.nodes[idx].1.kind {
                    NodeKind::Oscillator(osc) if osc.state() == OscState::Idle => Ok(()),
                    NodeKind::Oscillator(_) => Err(GraphError::AlreadyStarted(node)),
                    NodeKind::Gain(_) => Err(GraphError::NotAnOscillator(node)),
                },
                Slot::Retired => Err(GraphError::AlreadyStarted(node)),
            },
            GraphCommand::Stop { node } => self.expect_live_kind(node, true),
            GraphCommand::SetFrequency { node, hz } => {
                finite(hz)?;
                self.expect_live_kind(node, true)
            }
            GraphCommand::SetGain { node, value } => {
                finite(value)?;
                self.expect_live_kind(node, false)
            }
        }
    }

    /// Validate and apply a command.
    pub fn apply(&mut self, command: GraphCommand) -> Result<(), GraphError> {
        self.validate(&command)?;

        match command {
            GraphCommand::CreateOscillator { id, waveform } => {
                self.nodes
                    .push((id, Node::new(NodeKind::Oscillator(OscNode::new(waveform)))));
                self.next_id += 1;
            }
            GraphCommand::CreateGain { id } => {
                self.nodes
                    .push((id, Node::new(NodeKind::Gain(GainNode::default()))));
                self.next_id += 1;
            }
            GraphCommand::Connect { from, to } => {
                if let Some(idx) = self.position(from) {
                    self.nodes[idx].1.output = Some(to);
                }
            }
            GraphCommand::Disconnect { node } => {
                if let Some(idx) = self.position(node) {
                    let former = self.nodes[idx].1.output.take();
                    self.collect(node);
                    if let Some(Target::Node(target)) = former {
                        self.collect(target);
                    }
                }
            }
            GraphCommand::Start { node } => {
                if let Some(NodeKind::Oscillator(osc)) = self.kind_mut(node) {
                    osc.start();
                }
            }
            GraphCommand::Stop { node } => {
                if let Some(idx) = self.position(node) {
                    let (_, removed) = self.nodes.swap_remove(idx);
                    if let Some(Target::Node(target)) = removed.output {
                        self.collect(target);
                    }
                }
            }
            GraphCommand::SetFrequency { node, hz } => {
                if let Some(NodeKind::Oscillator(osc)) = self.kind_mut(node) {
                    osc.set_frequency(hz);
                }
            }
            GraphCommand::SetGain { node, value } => {
                if let Some(NodeKind::Gain(gain)) = self.kind_mut(node) {
                    gain.set_gain(value);
                }
            }
        }

        Ok(())
    }

    /// Mix every audible oscillator into `out` (which is overwritten).
    pub fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        out.fill(0.0);
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            for idx in 0..self.nodes.len() {
                let level = match self.audible_level(idx) {
                    Some(level) => level,
                    None => continue,
                };

                let scratch = &mut self.scratch[..chunk.len()];
                if let NodeKind::Oscillator(osc) = &mut self.nodes[idx].1.kind {
                    osc.render(scratch, ctx.sample_rate);
                }
                for (o, s) in chunk.iter_mut().zip(scratch.iter()) {
                    *o += s * level;
                }
            }
        }
    }

    /// Product of gains from a running oscillator to the destination, or
    /// `None` if the oscillator is not running or its chain goes nowhere.
    fn audible_level(&self, idx: usize) -> Option<f32> {
        let (_, node) = &self.nodes[idx];
        if !node.as_oscillator()?.is_running() {
            return None;
        }

        let mut level = 1.0;
        let mut next = node.output;
        // Chains are acyclic, but never walk further than the node count.
        for _ in 0..=self.nodes.len() {
            match next? {
                Target::Destination => return Some(level),
                Target::Node(id) => {
                    let hop = self.node(id)?;
                    level *= hop.as_gain()?.gain();
                    next = hop.output;
                }
            }
        }
        None
    }

    /// True if following outputs from `start` arrives at `target`.
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut current = start;
        for _ in 0..=self.nodes.len() {
            if current == target {
                return true;
            }
            match self.output(current) {
                Some(Target::Node(id)) => current = id,
                _ => return false,
            }
        }
        false
    }

    /// Drop `id` if it is a gain with no output and nothing feeding it.
    fn collect(&mut self, id: NodeId) {
        let Some(idx) = self.position(id) else {
            return;
        };
        let node = &self.nodes[idx].1;
        if !node.is_gain() || node.output.is_some() {
            return;
        }
        let has_inputs = self
            .nodes
            .iter()
            .any(|(_, other)| other.output == Some(Target::Node(id)));
        if !has_inputs {
            self.nodes.swap_remove(idx);
        }
    }

    fn position(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|(node_id, _)| *node_id == id)
    }

    fn slot(&self, id: NodeId) -> Result<Slot, GraphError> {
        match self.position(id) {
            Some(idx) => Ok(Slot::Live(idx)),
            None if id.0 < self.next_id => Ok(Slot::Retired),
            None => Err(GraphError::UnknownNode(id)),
        }
    }

    fn expect_live_kind(&self, id: NodeId, oscillator: bool) -> Result<(), GraphError> {
        match self.slot(id)? {
            Slot::Retired => Ok(()),
            Slot::Live(idx) => {
                let node = &self.nodes[idx].1;
                match (oscillator, node.is_oscillator()) {
                    (true, true) | (false, false) => Ok(()),
                    (true, false) => Err(GraphError::NotAnOscillator(id)),
                    (false, true) => Err(GraphError::NotAGain(id)),
                }
            }
        }
    }

    fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        let idx = self.position(id)?;
        Some(&mut self.nodes[idx].1.kind)
    }
}

fn finite(value: f32) -> Result<(), GraphError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GraphError::NonFinite(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::OscillatorWaveform;

    fn create_osc(graph: &mut SignalGraph) -> NodeId {
        let id = graph.next_id();
        graph
            .apply(GraphCommand::CreateOscillator {
                id,
                waveform: OscillatorWaveform::Sine,
            })
            .unwrap();
        id
    }

    fn create_gain(graph: &mut SignalGraph, value: f32) -> NodeId {
        let id = graph.next_id();
        graph.apply(GraphCommand::CreateGain { id }).unwrap();
        graph.apply(GraphCommand::SetGain { node: id, value }).unwrap();
        id
    }

    /// osc -> gain -> destination, started
    fn voice_chain(graph: &mut SignalGraph, hz: f32, gain: f32) -> (NodeId, NodeId) {
        let osc = create_osc(graph);
        let amp = create_gain(graph, gain);
        graph.apply(GraphCommand::SetFrequency { node: osc, hz }).unwrap();
        graph
            .apply(GraphCommand::Connect {
                from: osc,
                to: Target::Node(amp),
            })
            .unwrap();
        graph
            .apply(GraphCommand::Connect {
                from: amp,
                to: Target::Destination,
            })
            .unwrap();
        graph.apply(GraphCommand::Start { node: osc }).unwrap();
        (osc, amp)
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn renders_scaled_sine() {
        let mut graph = SignalGraph::new(16);
        voice_chain(&mut graph, 1_000.0, 0.5);

        let mut out = vec![0.0f32; 480];
        graph.render_block(&mut out, &RenderCtx::new(48_000.0));
        assert!((peak(&out) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn unconnected_chain_is_silent() {
        let mut graph = SignalGraph::new(16);
        let osc = create_osc(&mut graph);
        let amp = create_gain(&mut graph, 1.0);
        graph
            .apply(GraphCommand::Connect {
                from: osc,
                to: Target::Node(amp),
            })
            .unwrap();
        graph.apply(GraphCommand::Start { node: osc }).unwrap();

        let mut out = vec![1.0f32; 256];
        graph.render_block(&mut out, &RenderCtx::new(48_000.0));
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn renders_blocks_longer_than_scratch() {
        let mut graph = SignalGraph::new(16);
        voice_chain(&mut graph, 440.0, 1.0);

        let mut out = vec![0.0f32; MAX_BLOCK_SIZE * 2 + 17];
        graph.render_block(&mut out, &RenderCtx::new(48_000.0));
        assert!(peak(&out[MAX_BLOCK_SIZE * 2..]) > 0.0);
    }

    #[test]
    fn stop_then_disconnect_retires_everything() {
        let mut graph = SignalGraph::new(16);
        let (osc, amp) = voice_chain(&mut graph, 440.0, 1.0);

        graph.apply(GraphCommand::Stop { node: osc }).unwrap();
        assert!(!graph.contains(osc));
        // Gain still routes to the destination until it is disconnected.
        assert!(graph.contains(amp));

        graph.apply(GraphCommand::Disconnect { node: osc }).unwrap();
        graph.apply(GraphCommand::Disconnect { node: amp }).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn retired_nodes_ignore_late_parameter_changes() {
        let mut graph = SignalGraph::new(16);
        let (osc, _) = voice_chain(&mut graph, 440.0, 1.0);
        graph.apply(GraphCommand::Stop { node: osc }).unwrap();

        assert!(graph
            .apply(GraphCommand::SetFrequency { node: osc, hz: 880.0 })
            .is_ok());
        assert_eq!(
            graph.apply(GraphCommand::Start { node: osc }),
            Err(GraphError::AlreadyStarted(osc))
        );
    }

    #[test]
    fn rejects_unknown_and_mismatched_nodes() {
        let mut graph = SignalGraph::new(16);
        let ghost = NodeId(42);
        assert_eq!(
            graph.apply(GraphCommand::Stop { node: ghost }),
            Err(GraphError::UnknownNode(ghost))
        );

        let osc = create_osc(&mut graph);
        assert_eq!(
            graph.apply(GraphCommand::SetGain {
                node: osc,
                value: 0.5
            }),
            Err(GraphError::NotAGain(osc))
        );
        assert_eq!(
            graph.apply(GraphCommand::CreateGain { id: NodeId(7) }),
            Err(GraphError::IdMismatch {
                expected: NodeId(1),
                actual: NodeId(7)
            })
        );
    }

    #[test]
    fn rejects_non_finite_parameters() {
        let mut graph = SignalGraph::new(16);
        let osc = create_osc(&mut graph);
        let before = graph.frequency(osc);
        assert!(matches!(
            graph.apply(GraphCommand::SetFrequency {
                node: osc,
                hz: f32::NAN
            }),
            Err(GraphError::NonFinite(_))
        ));
        assert_eq!(graph.frequency(osc), before);
    }

    #[test]
    fn rejects_cycles_and_oscillator_inputs() {
        let mut graph = SignalGraph::new(16);
        let a = create_gain(&mut graph, 1.0);
        let b = create_gain(&mut graph, 1.0);
        let osc = create_osc(&mut graph);

        graph
            .apply(GraphCommand::Connect {
                from: a,
                to: Target::Node(b),
            })
            .unwrap();
        assert_eq!(
            graph.apply(GraphCommand::Connect {
                from: b,
                to: Target::Node(a)
            }),
            Err(GraphError::Cycle { from: b, to: a })
        );
        assert_eq!(
            graph.apply(GraphCommand::Connect {
                from: a,
                to: Target::Node(osc)
            }),
            Err(GraphError::NotAnInput(osc))
        );
    }

    #[test]
    fn capacity_is_enforced() {
        let mut graph = SignalGraph::new(2);
        create_osc(&mut graph);
        create_osc(&mut graph);
        let id = graph.next_id();
        assert_eq!(
            graph.apply(GraphCommand::CreateGain { id }),
            Err(GraphError::Full { capacity: 2 })
        );
    }

    #[test]
    fn ids_are_not_reused() {
        let mut graph = SignalGraph::new(4);
        let (osc, amp) = voice_chain(&mut graph, 440.0, 1.0);
        graph.apply(GraphCommand::Stop { node: osc }).unwrap();
        graph.apply(GraphCommand::Disconnect { node: amp }).unwrap();

        let fresh = create_osc(&mut graph);
        assert!(fresh > amp);
    }
}

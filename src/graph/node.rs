use std::fmt;

use super::{gain::GainNode, oscillator::OscNode};

/// Handle to a node inside a `SignalGraph`.
///
/// Ids are handed out in creation order and never reused, so a handle that
/// outlives its node can only ever refer to that (retired) node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node sends its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    /// The engine's output sink.
    Destination,
}

/// Context passed to the graph during rendering
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
}

impl RenderCtx {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Oscillator(OscNode),
    Gain(GainNode),
}

/// A node plus its single outgoing connection.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub output: Option<Target>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, output: None }
    }

    pub fn as_oscillator(&self) -> Option<&OscNode> {
        match &self.kind {
            NodeKind::Oscillator(osc) => Some(osc),
            NodeKind::Gain(_) => None,
        }
    }

    pub fn as_gain(&self) -> Option<&GainNode> {
        match &self.kind {
            NodeKind::Gain(gain) => Some(gain),
            NodeKind::Oscillator(_) => None,
        }
    }

    pub fn is_oscillator(&self) -> bool {
        matches!(self.kind, NodeKind::Oscillator(_))
    }

    pub fn is_gain(&self) -> bool {
        matches!(self.kind, NodeKind::Gain(_))
    }
}

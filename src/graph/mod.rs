//! Node-based signal graph: oscillators feeding gains feeding the output sink.
//!
//! The graph is a plain data structure driven by `GraphCommand`s. The same
//! command stream can be replayed on two copies (one for the control thread,
//! one for the audio thread) and both end up identical, which is how the
//! realtime engine keeps a queryable mirror without sharing memory.

/// Scalar gain node.
pub mod gain;
/// Commands that mutate a graph.
pub mod message;
/// Node handles, routing targets and render context.
pub mod node;
/// Sine (and friends) oscillator node with a start/stop lifecycle.
pub mod oscillator;
/// The graph itself: validation, pruning and block rendering.
pub mod signal_graph;

pub use message::GraphCommand;
pub use node::{Node, NodeId, NodeKind, RenderCtx, Target};
pub use signal_graph::{GraphError, SignalGraph};

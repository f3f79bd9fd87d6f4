//! Audio engines: the process-wide context that owns a signal graph and turns
//! it into sound.
//!
//! `AudioEngine` is the narrow surface the synth talks to. Every mutation is a
//! `GraphCommand`; the provided methods only allocate ids and build commands.
//! `EngineProvider` lets the caller decide which engine gets opened, so the
//! synth never reaches for a global.

pub mod offline;
#[cfg(feature = "rtrb")]
pub mod realtime;

use std::fmt;

use crate::{
    dsp::oscillator::OscillatorWaveform,
    graph::{GraphCommand, GraphError, NodeId, SignalGraph, Target},
};

pub use offline::{OfflineEngine, OfflineProvider};
#[cfg(feature = "rtrb")]
pub use realtime::{RealtimeEngine, RealtimeProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine has been closed and accepts no more commands.
    Closed,
    /// The command ring to the audio thread is full.
    QueueFull,
    Graph(GraphError),
    /// The audio device could not be opened or started.
    Device(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Closed => write!(f, "audio engine is closed"),
            EngineError::QueueFull => write!(f, "audio command queue is full"),
            EngineError::Graph(err) => write!(f, "signal graph error: {err}"),
            EngineError::Device(msg) => write!(f, "audio device error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Graph(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GraphError> for EngineError {
    fn from(err: GraphError) -> Self {
        EngineError::Graph(err)
    }
}

/// The audio processing context a synth drives.
pub trait AudioEngine {
    fn state(&self) -> EngineState;

    /// Engine clock in seconds (frames rendered / sample rate).
    fn current_time(&self) -> f64;

    /// Read-only view of the graph as the control side sees it.
    fn graph(&self) -> &SignalGraph;

    /// Validate and apply one command. On error nothing changes.
    fn apply(&mut self, command: GraphCommand) -> Result<(), EngineError>;

    /// Stop producing sound. Afterwards `state()` is `Closed`.
    fn close(&mut self);

    fn is_closed(&self) -> bool {
        self.state() == EngineState::Closed
    }

    fn create_oscillator(&mut self, waveform: OscillatorWaveform) -> Result<NodeId, EngineError> {
        let id = self.graph().next_id();
        self.apply(GraphCommand::CreateOscillator { id, waveform })?;
        Ok(id)
    }

    fn create_gain(&mut self) -> Result<NodeId, EngineError> {
        let id = self.graph().next_id();
        self.apply(GraphCommand::CreateGain { id })?;
        Ok(id)
    }

    fn connect(&mut self, from: NodeId, to: Target) -> Result<(), EngineError> {
        self.apply(GraphCommand::Connect { from, to })
    }

    fn disconnect(&mut self, node: NodeId) -> Result<(), EngineError> {
        self.apply(GraphCommand::Disconnect { node })
    }

    fn start(&mut self, node: NodeId) -> Result<(), EngineError> {
        self.apply(GraphCommand::Start { node })
    }

    fn stop(&mut self, node: NodeId) -> Result<(), EngineError> {
        self.apply(GraphCommand::Stop { node })
    }

    /// Set an oscillator's frequency, effective immediately.
    fn set_frequency(&mut self, node: NodeId, hz: f32) -> Result<(), EngineError> {
        self.apply(GraphCommand::SetFrequency { node, hz })
    }

    /// Set a gain node's value, effective immediately.
    fn set_gain(&mut self, node: NodeId, value: f32) -> Result<(), EngineError> {
        self.apply(GraphCommand::SetGain { node, value })
    }
}

/// Opens engines on demand.
pub trait EngineProvider {
    type Engine: AudioEngine;

    fn open(&mut self) -> Result<Self::Engine, EngineError>;
}

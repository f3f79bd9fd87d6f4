//! Engine that renders only when asked, into caller-provided buffers.
//!
//! Used for tests, benchmarks and bouncing audio without a device.

use log::debug;

use crate::{
    config::EngineConfig,
    graph::{GraphCommand, RenderCtx, SignalGraph},
};

use super::{AudioEngine, EngineError, EngineProvider, EngineState};

pub struct OfflineEngine {
    graph: SignalGraph,
    sample_rate: f32,
    frames: u64,
    state: EngineState,
}

impl OfflineEngine {
    pub fn new(sample_rate: f32, max_nodes: usize) -> Self {
        Self {
            graph: SignalGraph::new(max_nodes),
            sample_rate,
            frames: 0,
            state: EngineState::Running,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Render the next `out.len()` frames and advance the clock.
    ///
    /// A closed engine renders silence and its clock stands still.
    pub fn render(&mut self, out: &mut [f32]) {
        if self.state == EngineState::Closed {
            out.fill(0.0);
            return;
        }
        let ctx = RenderCtx::new(self.sample_rate);
        self.graph.render_block(out, &ctx);
        self.frames += out.len() as u64;
    }
}

impl AudioEngine for OfflineEngine {
    fn state(&self) -> EngineState {
        self.state
    }

    fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    fn apply(&mut self, command: GraphCommand) -> Result<(), EngineError> {
        if self.state == EngineState::Closed {
            return Err(EngineError::Closed);
        }
        self.graph.apply(command)?;
        Ok(())
    }

    fn close(&mut self) {
        debug!("offline engine closed after {} frames", self.frames);
        self.state = EngineState::Closed;
    }
}

/// Hands out fresh `OfflineEngine`s and counts how many it opened.
#[derive(Debug, Clone)]
pub struct OfflineProvider {
    sample_rate: f32,
    config: EngineConfig,
    opened: usize,
}

impl OfflineProvider {
    pub fn new(sample_rate: f32, config: EngineConfig) -> Self {
        Self {
            sample_rate,
            config,
            opened: 0,
        }
    }

    /// How many engines this provider has opened so far.
    pub fn opened(&self) -> usize {
        self.opened
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self::new(48_000.0, EngineConfig::default())
    }
}

impl EngineProvider for OfflineProvider {
    type Engine = OfflineEngine;

    fn open(&mut self) -> Result<OfflineEngine, EngineError> {
        self.opened += 1;
        debug!("opening offline engine #{} at {} Hz", self.opened, self.sample_rate);
        Ok(OfflineEngine::new(self.sample_rate, self.config.max_nodes))
    }
}

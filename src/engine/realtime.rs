//! Engine that plays through the default cpal output device.
//!
//! The control thread keeps a shadow `SignalGraph` for validation and queries.
//! Every accepted command is pushed over an rtrb ring to the audio thread,
//! which applies it to its own copy of the graph before rendering the next
//! block. Both copies see the same commands in the same order, so they stay in
//! lockstep without locks. Rendered samples travel back over a second ring for
//! the oscilloscope/spectrum display.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};
use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::{
    config::EngineConfig,
    graph::{GraphCommand, RenderCtx, SignalGraph},
    MAX_BLOCK_SIZE,
};

use super::{AudioEngine, EngineError, EngineProvider, EngineState};

pub struct RealtimeEngine {
    shadow: SignalGraph,
    commands: Producer<GraphCommand>,
    scope: Consumer<f32>,
    frames: Arc<AtomicU64>,
    sample_rate: f32,
    channels: usize,
    /// Dropping the stream silences the device.
    stream: Option<cpal::Stream>,
}

impl RealtimeEngine {
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Move every sample rendered since the last call into `out`.
    pub fn drain_scope(&mut self, out: &mut Vec<f32>) {
        while let Ok(sample) = self.scope.pop() {
            out.push(sample);
        }
    }
}

impl AudioEngine for RealtimeEngine {
    fn state(&self) -> EngineState {
        if self.stream.is_some() {
            EngineState::Running
        } else {
            EngineState::Closed
        }
    }

    fn current_time(&self) -> f64 {
        self.frames.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn graph(&self) -> &SignalGraph {
        &self.shadow
    }

    fn apply(&mut self, command: GraphCommand) -> Result<(), EngineError> {
        if self.stream.is_none() {
            return Err(EngineError::Closed);
        }
        self.shadow.validate(&command)?;
        if let Err(PushError::Full(_)) = self.commands.push(command) {
            return Err(EngineError::QueueFull);
        }
        self.shadow.apply(command)?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                error!("failed to pause output stream: {err}");
            }
            info!("audio engine closed at {:.2}s", self.current_time());
        }
    }
}

/// Audio-thread half: owns the rendering copy of the graph.
struct GraphRenderer {
    graph: SignalGraph,
    commands: Consumer<GraphCommand>,
    scope: Producer<f32>,
    frames: Arc<AtomicU64>,
    sample_rate: f32,
    channels: usize,
    render_buf: Vec<f32>,
}

impl GraphRenderer {
    fn process(&mut self, data: &mut [f32]) {
        // Commands were validated against the shadow graph, which is always
        // at the same point in the command stream.
        while let Ok(command) = self.commands.pop() {
            let _ = self.graph.apply(command);
        }

        let total_frames = data.len() / self.channels;
        let mut frames_written = 0;
        while frames_written < total_frames {
            let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
            let ctx = RenderCtx::new(self.sample_rate);

            let block = &mut self.render_buf[..frames_to_render];
            self.graph.render_block(block, &ctx);

            // Duplicate mono to all channels
            let out_off = frames_written * self.channels;
            for (i, &s) in block.iter().enumerate() {
                for ch in 0..self.channels {
                    data[out_off + i * self.channels + ch] = s;
                }
            }

            // Non-blocking; the display can afford to miss samples
            for &s in block.iter() {
                if let Err(PushError::Full(_)) = self.scope.push(s) {
                    break;
                }
            }

            self.frames
                .fetch_add(frames_to_render as u64, Ordering::Relaxed);
            frames_written += frames_to_render;
        }
    }
}

/// Opens a `RealtimeEngine` on the host's default output device.
#[derive(Debug, Clone, Default)]
pub struct RealtimeProvider {
    config: EngineConfig,
}

impl RealtimeProvider {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl EngineProvider for RealtimeProvider {
    type Engine = RealtimeEngine;

    fn open(&mut self) -> Result<RealtimeEngine, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Device("no default output device available".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|err| EngineError::Device(format!("failed to fetch output config: {err}")))?;

        let sample_rate = supported.sample_rate().0 as f32;
        let channels = supported.channels() as usize;
        info!(
            "opening {} at {} Hz, {} channels",
            device.name().unwrap_or_else(|_| "output device".into()),
            sample_rate,
            channels
        );

        let (command_tx, command_rx) =
            RingBuffer::<GraphCommand>::new(self.config.command_ring_capacity());
        let (scope_tx, scope_rx) = RingBuffer::<f32>::new(self.config.scope_capacity);
        let frames = Arc::new(AtomicU64::new(0));

        let mut renderer = GraphRenderer {
            graph: SignalGraph::new(self.config.max_nodes),
            commands: command_rx,
            scope: scope_tx,
            frames: Arc::clone(&frames),
            sample_rate,
            channels,
            render_buf: vec![0.0; MAX_BLOCK_SIZE],
        };

        let stream = device
            .build_output_stream(
                &supported.into(),
                move |data: &mut [f32], _| renderer.process(data),
                |err| error!("audio stream error: {err}"),
                None,
            )
            .map_err(|err| EngineError::Device(format!("failed to build output stream: {err}")))?;
        stream
            .play()
            .map_err(|err| EngineError::Device(format!("failed to start output stream: {err}")))?;

        Ok(RealtimeEngine {
            shadow: SignalGraph::new(self.config.max_nodes),
            commands: command_tx,
            scope: scope_rx,
            frames,
            sample_rate,
            channels,
            stream: Some(stream),
        })
    }
}

use crate::dsp::oscillator::OscillatorWaveform;

use super::node::{NodeId, Target};

/// Mutations of a `SignalGraph`.
///
/// Commands are `Copy` so they can travel over a realtime ring buffer without
/// allocating. Parameter changes take effect from the next rendered block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GraphCommand {
    CreateOscillator {
        id: NodeId,
        waveform: OscillatorWaveform,
    },
    CreateGain {
        id: NodeId,
    },
    Connect {
        from: NodeId,
        to: Target,
    },
    Disconnect {
        node: NodeId,
    },
    Start {
        node: NodeId,
    },
    Stop {
        node: NodeId,
    },
    SetFrequency {
        node: NodeId,
        hz: f32,
    },
    SetGain {
        node: NodeId,
        value: f32,
    },
}

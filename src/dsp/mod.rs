//! Low-level DSP primitives used by the signal graph.
//!
//! These components are allocation-free and realtime-safe, so the audio thread
//! can own them directly. They stay focused on the signal math; wiring and
//! parameter routing live in `graph`.

/// Oscillator waveforms driven by a phase accumulator.
pub mod oscillator;

pub use oscillator::{OscillatorBlock, OscillatorWaveform};

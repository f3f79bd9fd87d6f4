pub mod config;
pub mod dsp;
pub mod engine;
pub mod graph; // Oscillator/gain node graph
pub mod synth; // Voices, commands and spectrum model

pub use config::{EngineConfig, OvertoneGain, SynthConfig};

pub const MAX_BLOCK_SIZE: usize = 2048;

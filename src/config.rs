//! Synth and engine settings.
//!
//! Every field has a default, so a config file only needs the keys it wants
//! to change:
//!
//! ```json
//! { "max_frequency": 4000, "overtone_gain": "scaled" }
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::OscillatorWaveform;

/// How an overtone's gain is computed when its oscillator is first built.
///
/// Live edits always use `base_amplitude * multiplier`. The two variants only
/// differ at creation time (voice start or restart).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OvertoneGain {
    /// The multiplier is used as a raw gain, not scaled by the voice amplitude.
    #[default]
    AsEntered,
    /// Same formula as live edits: `base_amplitude * multiplier`.
    Scaled,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on live nodes per engine (both voices share it).
    pub max_nodes: usize,
    /// Slots in the control -> audio command ring.
    pub command_capacity: usize,
    /// Samples buffered in the audio -> UI scope ring.
    pub scope_capacity: usize,
}

/// Commands a restart queues per oscillator/gain pair: two to release the
/// old pair and seven to build the new one.
const COMMANDS_PER_PAIR: usize = 9;

impl EngineConfig {
    /// Size of the control -> audio command ring.
    ///
    /// Never smaller than what restarting a voice that fills the whole node
    /// table queues in one go, so a teardown is not refused for lack of room.
    pub fn command_ring_capacity(&self) -> usize {
        let restart = COMMANDS_PER_PAIR * self.max_nodes.div_ceil(2) + 16;
        self.command_capacity.max(restart)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nodes: 256,
            command_capacity: 1024,
            scope_capacity: 16 * 1024,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    /// Frequency input and slider never go above this (Hz).
    pub max_frequency: f32,
    /// Amplitude slider range is `0..=max_amplitude`.
    pub max_amplitude: f32,
    pub default_frequency: f32,
    pub default_amplitude: f32,
    /// Ratio a new overtone row starts with.
    pub default_ratio: f32,
    /// Amplitude multiplier a new overtone row starts with.
    pub default_multiplier: f32,
    pub overtone_gain: OvertoneGain,
    /// Waveform used for fundamentals and overtones.
    pub waveform: OscillatorWaveform,
    pub engine: EngineConfig,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            max_frequency: 2000.0,
            max_amplitude: 1.0,
            default_frequency: 440.0,
            default_amplitude: 0.5,
            default_ratio: 1.0,
            default_multiplier: 1.0,
            overtone_gain: OvertoneGain::AsEntered,
            waveform: OscillatorWaveform::Sine,
            engine: EngineConfig::default(),
        }
    }
}

#[cfg(feature = "serde")]
impl SynthConfig {
    /// Parse a JSON config; missing keys fall back to defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

use crate::dsp::oscillator::{OscillatorBlock, OscillatorWaveform};

/*
Oscillator Node
===============

An oscillator is the sound source of every voice. In additive synthesis each
oscillator contributes exactly one partial, so the voice's timbre is decided
by which frequencies are present and how loud each one is, not by the shape
of any single waveform.

What are Overtones?
-------------------
When a fundamental plays at 440 Hz, overtones at integer ratios line up with
the natural harmonic series:
  ratio 1.0: 440 Hz  - the fundamental itself
  ratio 2.0: 880 Hz  - one octave up
  ratio 3.0: 1320 Hz - octave + fifth
  ratio 4.0: 1760 Hz - two octaves up
Non-integer ratios (1.41, 2.76, ...) produce inharmonic, bell-like spectra.

Lifecycle
---------
A node is created Idle, becomes Running on start and Stopped on stop. Once
stopped it never sounds again, which is what lets the graph drop it.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct OscNode {
    osc: OscillatorBlock,
    frequency: f32,
    state: OscState,
}

impl OscNode {
    /// Frequency a freshly created oscillator plays until told otherwise.
    pub const DEFAULT_FREQUENCY: f32 = 440.0;

    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            osc: OscillatorBlock::new(waveform),
            frequency: Self::DEFAULT_FREQUENCY,
            state: OscState::Idle,
        }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorWaveform::Sine)
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.osc.waveform()
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn state(&self) -> OscState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == OscState::Running
    }

    pub fn start(&mut self) {
        if self.state == OscState::Idle {
            self.osc.reset();
            self.state = OscState::Running;
        }
    }

    pub fn stop(&mut self) {
        self.state = OscState::Stopped;
    }

    pub fn render(&mut self, out: &mut [f32], sample_rate: f32) {
        if self.is_running() {
            self.osc.render(out, self.frequency, sample_rate);
        } else {
            out.fill(0.0);
        }
    }
}

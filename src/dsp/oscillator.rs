#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::f32::consts::TAU;

/*
Phase-Accumulator Oscillator
============================

Each oscillator keeps a normalised phase in [0, 1). Every sample the phase
advances by `frequency / sample_rate` and wraps. The waveform is a pure
function of the phase, so changing the frequency mid-block never produces a
discontinuity: the new increment simply applies from the next sample on.

  phase:     0.0 ──────────► 1.0 (wraps to 0.0)
  sine:      sin(TAU * phase)
  saw:       2 * phase - 1
  square:    +1 below 0.5, -1 above
  triangle:  1 - 4 * |phase - 0.5|

Negative frequencies run the phase backwards; `rem_euclid` keeps it in range.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorWaveform {
    #[default]
    Sine,
    Saw,
    Square,
    Triangle,
}

impl OscillatorWaveform {
    /// Evaluate the waveform at a normalised phase.
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            OscillatorWaveform::Sine => (TAU * phase).sin(),
            OscillatorWaveform::Saw => 2.0 * phase - 1.0,
            OscillatorWaveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorWaveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OscillatorBlock {
    waveform: OscillatorWaveform,
    phase: f32,
}

impl OscillatorBlock {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorWaveform::Sine)
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.waveform
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Fill `out` with the waveform at `frequency` Hz, continuing from the
    /// current phase.
    pub fn render(&mut self, out: &mut [f32], frequency: f32, sample_rate: f32) {
        let increment = frequency / sample_rate;
        for sample in out.iter_mut() {
            *sample = self.waveform.sample(self.phase);
            self.phase = (self.phase + increment).rem_euclid(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_matches_closed_form() {
        let sample_rate = 48_000.0;
        let frequency = 440.0;
        let mut osc = OscillatorBlock::sine();
        let mut buffer = vec![0.0f32; 128];
        osc.render(&mut buffer, frequency, sample_rate);

        for n in [0usize, 1, 12, 100] {
            let expected = (TAU * frequency * n as f32 / sample_rate).sin();
            assert!(
                (buffer[n] - expected).abs() < 1e-4,
                "sample {n}: expected {expected}, got {}",
                buffer[n]
            );
        }
    }

    #[test]
    fn phase_continues_across_blocks() {
        let mut split = OscillatorBlock::sine();
        let mut whole = OscillatorBlock::sine();

        let mut a = vec![0.0f32; 64];
        let mut b = vec![0.0f32; 64];
        split.render(&mut a, 1000.0, 48_000.0);
        split.render(&mut b, 1000.0, 48_000.0);

        let mut c = vec![0.0f32; 128];
        whole.render(&mut c, 1000.0, 48_000.0);

        assert!((b[10] - c[74]).abs() < 1e-5);
    }

    #[test]
    fn negative_frequency_stays_in_range() {
        let mut osc = OscillatorBlock::new(OscillatorWaveform::Saw);
        let mut buffer = vec![0.0f32; 256];
        osc.render(&mut buffer, -300.0, 48_000.0);
        assert!(buffer.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn zero_frequency_sine_is_silent() {
        let mut osc = OscillatorBlock::sine();
        let mut buffer = vec![1.0f32; 32];
        osc.render(&mut buffer, 0.0, 48_000.0);
        assert!(buffer.iter().all(|s| s.abs() < 1e-9));
    }
}

//! The data behind the spectrum display: one partial per oscillator a voice
//! would play, computed from its controls whether or not it is sounding.

use crate::config::SynthConfig;

use super::voice::{parse_number, RowId, Voice, VoiceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialKind {
    Fundamental,
    Overtone(RowId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    pub voice: VoiceId,
    pub kind: PartialKind,
    pub frequency: f32,
    /// Effective gain; 0 for muted overtones.
    pub amplitude: f32,
    pub muted: bool,
}

/// Partials for `voice`: the fundamental first, then each overtone row in
/// order.
///
/// The fundamental uses the text input when it holds an acceptable number,
/// otherwise the slider. Rows whose ratio does not evaluate are left out;
/// rows whose multiplier does not evaluate show with zero amplitude.
pub fn partials(voice: &Voice, config: &SynthConfig) -> Vec<Partial> {
    let controls = voice.controls();
    let fundamental = parse_number(&controls.frequency_input)
        .filter(|hz| *hz > 0.0)
        .map(|hz| hz.min(config.max_frequency))
        .unwrap_or(controls.frequency_slider);
    let base = controls.amplitude;

    let mut partials = Vec::with_capacity(controls.rows.len() + 1);
    partials.push(Partial {
        voice: voice.id(),
        kind: PartialKind::Fundamental,
        frequency: fundamental,
        amplitude: base,
        muted: false,
    });

    for row in &controls.rows {
        let Some(frequency) = row.frequency(fundamental) else {
            continue;
        };
        partials.push(Partial {
            voice: voice.id(),
            kind: PartialKind::Overtone(row.id),
            frequency,
            amplitude: row.effective_gain(base).unwrap_or(0.0),
            muted: row.muted,
        });
    }

    partials
}

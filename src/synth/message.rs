use super::voice::{RowId, VoiceId};

/// Every user action on a voice, as a value.
///
/// Text-valued variants carry exactly what the user typed; parsing and
/// validation happen in `SynthState::dispatch`.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthCommand {
    PlayVoice(VoiceId),
    StopVoice(VoiceId),
    SetFrequencyInput { voice: VoiceId, text: String },
    SetFrequencySlider { voice: VoiceId, value: f32 },
    SetAmplitude { voice: VoiceId, value: f32 },
    AddOvertone(VoiceId),
    DeleteOvertone { voice: VoiceId, row: RowId },
    SetOvertoneRatio { voice: VoiceId, row: RowId, text: String },
    SetOvertoneAmplitude { voice: VoiceId, row: RowId, text: String },
    SetOvertoneMute { voice: VoiceId, row: RowId, muted: bool },
}

/// What the caller should do after a command was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    /// The displayed spectrum is stale.
    pub redraw_spectrum: bool,
    /// Set by `AddOvertone`.
    pub created_row: Option<RowId>,
}

impl Outcome {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn redraw() -> Self {
        Self {
            redraw_spectrum: true,
            created_row: None,
        }
    }

    pub fn row_added(row: RowId) -> Self {
        Self {
            redraw_spectrum: true,
            created_row: Some(row),
        }
    }
}

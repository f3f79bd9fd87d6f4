use std::fmt;

use crate::engine::EngineError;

use super::voice::{RowId, VoiceId};

#[derive(Debug, Clone, PartialEq)]
pub enum SynthError {
    /// The voice's frequency input is not a number above zero. Nothing was
    /// started.
    InvalidFrequency { voice: VoiceId },
    UnknownRow { voice: VoiceId, row: RowId },
    Engine(EngineError),
}

impl SynthError {
    /// Errors the user must acknowledge before continuing.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, SynthError::InvalidFrequency { .. })
    }
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::InvalidFrequency { voice } => write!(
                f,
                "Please enter a valid frequency above 0 Hz for Voice {voice}."
            ),
            SynthError::UnknownRow { voice, row } => {
                write!(f, "voice {voice} has no overtone {row}")
            }
            SynthError::Engine(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SynthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SynthError::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EngineError> for SynthError {
    fn from(err: EngineError) -> Self {
        SynthError::Engine(err)
    }
}

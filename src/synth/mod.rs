// Purpose: the two additive voices and everything that keeps them in sync
// with the engine. This layer sits above the signal graph.

mod binder;
pub mod error;
pub mod message;
pub mod spectrum;
pub mod state;
pub mod voice;

pub use error::SynthError;
pub use message::{Outcome, SynthCommand};
pub use spectrum::{partials, Partial, PartialKind};
pub use state::SynthState;
pub use voice::{LiveOvertone, OvertoneRow, RowId, Voice, VoiceControls, VoiceId};

mod participant;
mod session;
mod transcript;

pub use participant::{normalize_name, Participant, ParticipantId};
pub use session::{RoundPhase, SessionSnapshot, SessionStatus};
pub use transcript::{EntryKind, TranscriptEntry, NARRATOR_NAME};

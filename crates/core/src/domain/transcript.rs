use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sender name used for narrator lines.
pub const NARRATOR_NAME: &str = "Host";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Host lines and system events
    Narrator,
    /// Speech or votes from a participant
    Participant,
}

/// One line of the session transcript.
///
/// `sequence_index` is assigned by the transcript on append and is the only
/// ordering authority; `timestamp` is informational.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TranscriptEntry {
    pub sequence_index: u64,
    pub kind: EntryKind,
    pub sender: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_reasoning: Option<String>,
    /// Machine-readable tag for narrator events (e.g. "elimination")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    /// Render the entry the way agents read it: `[Sender] content` on one line.
    ///
    /// Private reasoning is never part of the rendered line.
    pub fn line(&self) -> String {
        let content = self.content.trim().replace('\n', " ");
        format!("[{}] {}", self.sender, content)
    }

    pub fn is_narrator(&self) -> bool {
        self.kind == EntryKind::Narrator
    }
}

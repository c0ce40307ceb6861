//! Wire types for the observer event stream

use arena_core::{EntryKind, TranscriptEntry};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One JSON object sent to an observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObserverMessage {
    /// Narrator line, game event, or connection notice
    System {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event: Option<String>,
        /// Transcript position; absent for notices that are not part of the transcript
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sequence: Option<u64>,
        /// Unix milliseconds
        timestamp: i64,
    },

    /// Something a participant said
    Agent {
        sender: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        private_reasoning: Option<String>,
        sequence: u64,
        timestamp: i64,
    },

    /// Replay of everything recorded before the observer joined
    History { messages: Vec<ObserverMessage> },
}

impl ObserverMessage {
    /// Out-of-transcript notice for a single observer.
    pub fn notice(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
            event: None,
            sequence: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn history(entries: &[TranscriptEntry]) -> Self {
        Self::History {
            messages: entries.iter().map(Self::from).collect(),
        }
    }

    /// Transcript position of this message, if it carries one.
    pub fn sequence(&self) -> Option<u64> {
        match self {
            Self::System { sequence, .. } => *sequence,
            Self::Agent { sequence, .. } => Some(*sequence),
            Self::History { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&TranscriptEntry> for ObserverMessage {
    fn from(entry: &TranscriptEntry) -> Self {
        let timestamp = entry.timestamp.timestamp_millis();
        match entry.kind {
            EntryKind::Narrator => Self::System {
                content: entry.content.clone(),
                event: entry.event.clone(),
                sequence: Some(entry.sequence_index),
                timestamp,
            },
            EntryKind::Participant => Self::Agent {
                sender: entry.sender.clone(),
                content: entry.content.clone(),
                private_reasoning: entry.private_reasoning.clone(),
                sequence: entry.sequence_index,
                timestamp,
            },
        }
    }
}

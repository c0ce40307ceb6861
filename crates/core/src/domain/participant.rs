use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub type ParticipantId = Uuid;

/// A contestant on the roster.
///
/// Identity (`id`, `name`) never changes after setup; `alive` flips to false
/// once when the participant is eliminated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub alive: bool,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            alive: true,
        }
    }

    /// Name in the form used for vote matching: trimmed and lowercased.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Whether a free-text name refers to this participant.
    pub fn matches_name(&self, raw: &str) -> bool {
        self.normalized_name() == normalize_name(raw)
    }

    pub fn eliminate(&mut self) {
        self.alive = false;
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

//! Decision backends for participants.
//!
//! An [`Agent`] reads the rendered transcript and answers with either a
//! speech turn or a vote. Agents never touch the transcript themselves; the
//! game records whatever they return.

mod model;
mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use model::{ModelAgent, ModelAgentConfig};
pub use scripted::ScriptedAgent;

/// A speech turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub text: String,
    /// Kept out of the rendered transcript, shown only to observers.
    #[serde(default)]
    pub private_reasoning: String,
}

impl AgentReply {
    pub fn new(text: impl Into<String>, private_reasoning: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            private_reasoning: private_reasoning.into(),
        }
    }
}

/// A ballot naming another participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentVote {
    /// Free-text name; resolved against the eligible candidates by the game.
    pub target_name: String,
    #[serde(default)]
    pub private_reasoning: String,
}

impl AgentVote {
    pub fn new(target_name: impl Into<String>, private_reasoning: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            private_reasoning: private_reasoning.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Rate limited by model API")]
    RateLimited { retry_after: Option<u64> },

    #[error("Invalid agent response: {0}")]
    InvalidResponse(String),

    #[error("Agent unavailable: {0}")]
    Unavailable(String),
}

/// Capability contract for a participant's decisions.
///
/// `transcript` is the full rendered transcript so far, one `[Sender] text`
/// line per entry.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn respond(&self, transcript: &[String]) -> Result<AgentReply, AgentError>;

    async fn vote(&self, transcript: &[String]) -> Result<AgentVote, AgentError>;
}

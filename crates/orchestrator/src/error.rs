use arena_core::{CoreError, RoundPhase};
use thiserror::Error;
use uuid::Uuid;

use crate::agent::AgentError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Participant not found: {0}")]
    ParticipantNotFound(Uuid),

    #[error("{voter} voted for '{target}', which matches no eligible participant")]
    UnresolvableVoteTarget { voter: String, target: String },

    #[error("{voter} has no eligible vote target")]
    NoLegalTarget { voter: String },

    #[error("Agent for {participant} failed during {phase:?}: {source}")]
    DecisionBackend {
        participant: String,
        phase: RoundPhase,
        #[source]
        source: AgentError,
    },

    #[error("Agent for {participant} timed out after {timeout_secs}s during {phase:?}")]
    AgentTimeout {
        participant: String,
        phase: RoundPhase,
        timeout_secs: u64,
    },

    #[error("No agent registered for participant {0}")]
    MissingAgent(String),

    #[error("At least {required} participants are required, got {got}")]
    NotEnoughParticipants { required: usize, got: usize },

    #[error("Participant name is used more than once: {0}")]
    DuplicateName(String),

    #[error("Participant name must not be empty")]
    EmptyName,

    #[error("Participant name is reserved for the narrator: {0}")]
    ReservedName(String),

    #[error("Game has already started")]
    AlreadyStarted,

    #[error("Game has not started yet")]
    NotStarted,

    #[error("A round is already in progress")]
    RoundInProgress,

    #[error("Game is over")]
    GameOver,

    #[error("Session failed: {0}")]
    SessionFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OrchestratorError {
    pub fn backend(participant: impl Into<String>, phase: RoundPhase, source: AgentError) -> Self {
        Self::DecisionBackend {
            participant: participant.into(),
            phase,
            source,
        }
    }

    /// Whether the error came from an agent call rather than from the request.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::DecisionBackend { .. } | Self::AgentTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

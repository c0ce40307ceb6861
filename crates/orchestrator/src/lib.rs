pub mod agent;
pub mod config;
pub mod error;
pub mod game;
pub mod narrator;
pub mod openrouter;
pub mod prompts;
pub mod recap;
pub mod registry;
pub mod resolution;
pub mod state_machine;
pub mod tally;
pub mod transcript;

pub use agent::{Agent, AgentError, AgentReply, AgentVote, ModelAgent, ModelAgentConfig, ScriptedAgent};
pub use config::{ExitRule, GameConfig};
pub use error::{OrchestratorError, Result};
pub use game::{Game, RoundOutcome, Seat, SharedSnapshot};
pub use narrator::Narrator;
pub use recap::{ModelRecapper, Recapper, TemplateRecapper};
pub use openrouter::{OpenRouterClient, RetryPolicy};
pub use registry::{GameHandle, GameRegistry};
pub use resolution::{resolve_vote_target, ResolvedVote, VoteResolutionPolicy};
pub use state_machine::RoundStateMachine;
pub use tally::{tally, tally_within, TallyResult, VoteMap};
pub use transcript::Transcript;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result};
use crate::resolution::VoteResolutionPolicy;

/// When the game stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ExitRule {
    /// Stop with two co-finalists
    #[default]
    Finalists,
    /// Play on until one participant remains
    SingleWinner,
}

impl ExitRule {
    /// Number of participants left when the game ends.
    pub fn survivors(&self) -> usize {
        match self {
            Self::Finalists => 2,
            Self::SingleWinner => 1,
        }
    }

    pub fn is_met(&self, active: usize) -> bool {
        active <= self.survivors()
    }
}

/// Rules for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct GameConfig {
    /// Defendants sit out the final vote
    pub exclude_defendants_from_final_vote: bool,
    pub vote_resolution: VoteResolutionPolicy,
    pub exit_rule: ExitRule,
    /// Constrained re-votes before a tie is broken at random
    pub max_tie_break_attempts: u32,
    /// Deadline for a single agent call
    pub agent_timeout_secs: u64,
    pub min_participants: usize,
    /// Fixes speaking order, narrator lines and random fallbacks
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            exclude_defendants_from_final_vote: false,
            vote_resolution: VoteResolutionPolicy::Lenient,
            exit_rule: ExitRule::Finalists,
            max_tie_break_attempts: 1,
            agent_timeout_secs: 60,
            min_participants: 3,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent_timeout_secs == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "agent_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.min_participants <= self.exit_rule.survivors() {
            return Err(OrchestratorError::InvalidConfig(format!(
                "min_participants must be greater than {} for the {:?} exit rule",
                self.exit_rule.survivors(),
                self.exit_rule
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GameConfig::default();
        assert!(!config.exclude_defendants_from_final_vote);
        assert_eq!(config.vote_resolution, VoteResolutionPolicy::Lenient);
        assert_eq!(config.exit_rule, ExitRule::Finalists);
        assert_eq!(config.max_tie_break_attempts, 1);
        assert_eq!(config.agent_timeout(), Duration::from_secs(60));
        assert_eq!(config.min_participants, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"exit_rule": "single_winner", "vote_resolution": "strict"}"#)
                .unwrap();
        assert_eq!(config.exit_rule, ExitRule::SingleWinner);
        assert_eq!(config.vote_resolution, VoteResolutionPolicy::Strict);
        assert_eq!(config.agent_timeout_secs, 60);
    }

    #[test]
    fn test_exit_rule() {
        assert!(ExitRule::Finalists.is_met(2));
        assert!(!ExitRule::Finalists.is_met(3));
        assert!(!ExitRule::SingleWinner.is_met(2));
        assert!(ExitRule::SingleWinner.is_met(1));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = GameConfig {
            agent_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GameConfig {
            min_participants: 2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OrchestratorError::InvalidConfig(_))
        ));

        let config = GameConfig {
            min_participants: 2,
            exit_rule: ExitRule::SingleWinner,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}

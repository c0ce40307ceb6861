use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::participant::Participant;
use crate::error::CoreError;

/// Named stage within a round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema, Hash)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Session created, no round has run yet
    #[default]
    Setup,
    /// Opening round: every participant introduces themselves
    Intro,
    Persuasion,
    InitialVote,
    Defense,
    FinalVote,
    Resolution,
    /// Escalation used when the final vote ends in a tie
    TieBreak,
    RoundEnd,
    GameOver,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Intro => "intro",
            Self::Persuasion => "persuasion",
            Self::InitialVote => "initial_vote",
            Self::Defense => "defense",
            Self::FinalVote => "final_vote",
            Self::Resolution => "resolution",
            Self::TieBreak => "tie_break",
            Self::RoundEnd => "round_end",
            Self::GameOver => "game_over",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "setup" => Some(Self::Setup),
            "intro" => Some(Self::Intro),
            "persuasion" => Some(Self::Persuasion),
            "initial_vote" => Some(Self::InitialVote),
            "defense" => Some(Self::Defense),
            "final_vote" => Some(Self::FinalVote),
            "resolution" => Some(Self::Resolution),
            "tie_break" => Some(Self::TieBreak),
            "round_end" => Some(Self::RoundEnd),
            "game_over" => Some(Self::GameOver),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Pending,
    /// A round is executing
    Running,
    /// Between rounds, waiting for the next advance
    Idle,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Idle => "idle",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "idle" => Some(Self::Idle),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl FromStr for RoundPhase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownValue {
            kind: "round phase",
            value: s.to_string(),
        })
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownValue {
            kind: "session status",
            value: s.to_string(),
        })
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a session, as served to the control surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: SessionStatus,
    pub round: u32,
    pub phase: RoundPhase,
    pub participants: Vec<Participant>,
    pub active: Vec<Participant>,
    /// Eliminated participants in elimination order
    pub eliminated: Vec<Participant>,
    /// Set once the game is over: the single winner or the co-finalists
    pub winners: Vec<Participant>,
    pub transcript_len: usize,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

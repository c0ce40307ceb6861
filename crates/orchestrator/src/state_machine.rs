use arena_core::{CoreError, RoundPhase};

use crate::error::Result;

pub struct RoundStateMachine;

impl RoundStateMachine {
    pub fn validate_transition(from: &RoundPhase, to: &RoundPhase) -> Result<()> {
        let allowed = Self::allowed_transitions(from);

        if allowed.contains(to) {
            Ok(())
        } else {
            Err(CoreError::InvalidPhaseTransition {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into())
        }
    }

    fn allowed_transitions(from: &RoundPhase) -> Vec<RoundPhase> {
        match from {
            RoundPhase::Setup => vec![RoundPhase::Intro],
            RoundPhase::Intro => vec![RoundPhase::InitialVote],
            RoundPhase::Persuasion => vec![RoundPhase::InitialVote],
            RoundPhase::InitialVote => vec![RoundPhase::Defense],
            RoundPhase::Defense => vec![RoundPhase::FinalVote],
            RoundPhase::FinalVote => vec![RoundPhase::Resolution],
            RoundPhase::Resolution => vec![RoundPhase::RoundEnd, RoundPhase::TieBreak],
            RoundPhase::TieBreak => vec![RoundPhase::Resolution],
            RoundPhase::RoundEnd => vec![RoundPhase::Persuasion, RoundPhase::GameOver],
            RoundPhase::GameOver => vec![],
        }
    }

    pub fn can_transition(from: &RoundPhase, to: &RoundPhase) -> bool {
        Self::validate_transition(from, to).is_ok()
    }

    /// Phase that opens the next round, if another round may start from `current`.
    pub fn round_entry(current: &RoundPhase) -> Option<RoundPhase> {
        match current {
            RoundPhase::Setup => Some(RoundPhase::Intro),
            RoundPhase::RoundEnd => Some(RoundPhase::Persuasion),
            _ => None,
        }
    }

    pub fn is_terminal(phase: &RoundPhase) -> bool {
        Self::allowed_transitions(phase).is_empty()
    }
}

//! Vote counting.

use std::collections::{BTreeMap, HashMap};

use arena_core::ParticipantId;

/// Ballots for one voting sub-phase: voter → target.
pub type VoteMap = HashMap<ParticipantId, ParticipantId>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TallyResult {
    pub counts: BTreeMap<ParticipantId, usize>,
    pub max: usize,
    /// Every target whose count equals `max`, sorted by id
    pub leaders: Vec<ParticipantId>,
}

impl TallyResult {
    pub fn is_tie(&self) -> bool {
        self.leaders.len() > 1
    }

    /// The sole leader, if there is one.
    pub fn winner(&self) -> Option<ParticipantId> {
        match self.leaders.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn count_for(&self, id: &ParticipantId) -> usize {
        self.counts.get(id).copied().unwrap_or(0)
    }
}

/// Count ballots. The result depends only on the multiset of targets.
pub fn tally(votes: &VoteMap) -> TallyResult {
    count(votes.values())
}

/// Count only ballots whose target is in `allowed`.
pub fn tally_within(votes: &VoteMap, allowed: &[ParticipantId]) -> TallyResult {
    count(votes.values().filter(|target| allowed.contains(target)))
}

fn count<'a>(targets: impl Iterator<Item = &'a ParticipantId>) -> TallyResult {
    let mut counts = BTreeMap::new();
    for target in targets {
        *counts.entry(*target).or_insert(0) += 1;
    }

    let max = counts.values().copied().max().unwrap_or(0);
    let leaders = counts
        .iter()
        .filter(|&(_, &c)| c == max && max > 0)
        .map(|(id, _)| *id)
        .collect();

    TallyResult {
        counts,
        max,
        leaders,
    }
}

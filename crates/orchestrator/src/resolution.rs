//! Mapping a free-text ballot onto an eligible participant.

use arena_core::{normalize_name, Participant};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result};

/// What to do when a ballot names nobody eligible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum VoteResolutionPolicy {
    /// Fail the round with `UnresolvableVoteTarget`
    Strict,
    /// Substitute a uniformly random eligible candidate
    #[default]
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVote {
    pub target: Participant,
    /// True when the ballot did not match and a random candidate was used.
    pub substituted: bool,
}

/// Resolve `raw` against `candidates`.
///
/// Matching is exact after trimming and lowercasing. The voter is never a
/// legal target even if it appears in `candidates`.
pub fn resolve_vote_target<R: Rng + ?Sized>(
    voter: &Participant,
    raw: &str,
    candidates: &[Participant],
    policy: VoteResolutionPolicy,
    rng: &mut R,
) -> Result<ResolvedVote> {
    let eligible: Vec<&Participant> = candidates.iter().filter(|c| c.id != voter.id).collect();
    if eligible.is_empty() {
        return Err(OrchestratorError::NoLegalTarget {
            voter: voter.name.clone(),
        });
    }

    let wanted = normalize_name(raw);
    if let Some(target) = eligible.iter().find(|c| c.normalized_name() == wanted) {
        return Ok(ResolvedVote {
            target: (*target).clone(),
            substituted: false,
        });
    }

    match policy {
        VoteResolutionPolicy::Strict => Err(OrchestratorError::UnresolvableVoteTarget {
            voter: voter.name.clone(),
            target: raw.to_string(),
        }),
        VoteResolutionPolicy::Lenient => {
            let target = eligible
                .choose(rng)
                .map(|p| (*p).clone())
                .ok_or_else(|| OrchestratorError::NoLegalTarget {
                    voter: voter.name.clone(),
                })?;
            tracing::warn!(
                voter = %voter.name,
                ballot = %raw,
                substitute = %target.name,
                "Vote target did not match an eligible participant, substituting"
            );
            Ok(ResolvedVote {
                target,
                substituted: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn roster() -> Vec<Participant> {
        ["Avery", "Blake", "Casey"]
            .into_iter()
            .map(Participant::new)
            .collect()
    }

    #[test]
    fn test_exact_match_ignores_case_and_whitespace() {
        let people = roster();
        let mut rng = StdRng::seed_from_u64(1);

        let resolved = resolve_vote_target(
            &people[0],
            "  bLaKe \n",
            &people,
            VoteResolutionPolicy::Strict,
            &mut rng,
        )
        .unwrap();

        assert_eq!(resolved.target.id, people[1].id);
        assert!(!resolved.substituted);
    }

    #[test]
    fn test_self_vote_never_resolves_to_voter() {
        let people = roster();
        let mut rng = StdRng::seed_from_u64(2);

        for seed in 0..25 {
            let mut rng_i = StdRng::seed_from_u64(seed);
            let resolved = resolve_vote_target(
                &people[0],
                "Avery",
                &people,
                VoteResolutionPolicy::Lenient,
                &mut rng_i,
            )
            .unwrap();
            assert_ne!(resolved.target.id, people[0].id);
            assert!(resolved.substituted);
        }

        let strict = resolve_vote_target(
            &people[0],
            "Avery",
            &people,
            VoteResolutionPolicy::Strict,
            &mut rng,
        );
        assert!(matches!(
            strict,
            Err(OrchestratorError::UnresolvableVoteTarget { .. })
        ));
    }

    #[test]
    fn test_strict_rejects_unknown_name() {
        let people = roster();
        let mut rng = StdRng::seed_from_u64(3);

        let err = resolve_vote_target(
            &people[1],
            "Dakota",
            &people,
            VoteResolutionPolicy::Strict,
            &mut rng,
        )
        .unwrap_err();

        match err {
            OrchestratorError::UnresolvableVoteTarget { voter, target } => {
                assert_eq!(voter, "Blake");
                assert_eq!(target, "Dakota");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lenient_substitutes_eligible_candidate() {
        let people = roster();
        let mut rng = StdRng::seed_from_u64(4);
        let candidates = vec![people[0].clone(), people[2].clone()];

        let resolved = resolve_vote_target(
            &people[1],
            "I vote for nobody",
            &candidates,
            VoteResolutionPolicy::Lenient,
            &mut rng,
        )
        .unwrap();

        assert!(resolved.substituted);
        assert!(candidates.iter().any(|c| c.id == resolved.target.id));
    }

    #[test]
    fn test_no_eligible_candidate_fails_under_both_policies() {
        let people = roster();
        let mut rng = StdRng::seed_from_u64(5);
        let only_self = vec![people[0].clone()];

        for policy in [VoteResolutionPolicy::Strict, VoteResolutionPolicy::Lenient] {
            let err =
                resolve_vote_target(&people[0], "Blake", &only_self, policy, &mut rng).unwrap_err();
            assert!(matches!(err, OrchestratorError::NoLegalTarget { .. }));
        }
    }

    #[test]
    fn test_policy_serialization() {
        assert_eq!(
            serde_json::to_string(&VoteResolutionPolicy::Lenient).unwrap(),
            "\"lenient\""
        );
        assert_eq!(VoteResolutionPolicy::default(), VoteResolutionPolicy::Lenient);
    }
}

//! Round and phase controller for one session.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use arena_core::{
    normalize_name, EntryKind, Participant, ParticipantId, RoundPhase, SessionSnapshot,
    SessionStatus, NARRATOR_NAME,
};
use chrono::{DateTime, Utc};
use events::Broadcaster;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::agent::{Agent, AgentError};
use crate::config::GameConfig;
use crate::error::{OrchestratorError, Result};
use crate::narrator::Narrator;
use crate::resolution::resolve_vote_target;
use crate::state_machine::RoundStateMachine;
use crate::tally::{tally, tally_within, VoteMap};
use crate::transcript::Transcript;

/// Latest session view, readable while a round is running.
pub type SharedSnapshot = Arc<RwLock<SessionSnapshot>>;

/// A roster slot: display name plus the agent that plays it.
#[derive(Clone)]
pub struct Seat {
    pub name: String,
    pub agent: Arc<dyn Agent>,
}

impl Seat {
    pub fn new(name: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        Self {
            name: name.into(),
            agent,
        }
    }
}

/// What a completed round did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round: u32,
    pub eliminated: Participant,
    /// The final vote tied and went to a tie-break
    pub tie_break: bool,
    /// The tie could not be settled by vote and was broken at random
    pub forced: bool,
    pub game_over: bool,
    pub winners: Vec<Participant>,
}

pub struct Game {
    id: Uuid,
    config: GameConfig,
    participants: Vec<Participant>,
    agents: HashMap<ParticipantId, Arc<dyn Agent>>,
    active: Vec<ParticipantId>,
    eliminated: Vec<ParticipantId>,
    winners: Vec<ParticipantId>,
    phase: RoundPhase,
    status: SessionStatus,
    round: u32,
    votes: VoteMap,
    defendants: Vec<ParticipantId>,
    tie_set: Vec<ParticipantId>,
    tie_break_attempts: u32,
    transcript: Transcript,
    broadcaster: Broadcaster,
    narrator: Narrator,
    rng: StdRng,
    error: Option<String>,
    created_at: DateTime<Utc>,
    shared: SharedSnapshot,
}

/// Await one agent call under the configured deadline.
async fn call_agent<T>(
    participant: &str,
    phase: RoundPhase,
    timeout: Duration,
    call: impl Future<Output = std::result::Result<T, AgentError>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(OrchestratorError::backend(participant, phase, source)),
        Err(_) => Err(OrchestratorError::AgentTimeout {
            participant: participant.to_string(),
            phase,
            timeout_secs: timeout.as_secs(),
        }),
    }
}

impl Game {
    pub fn new(
        id: Uuid,
        config: GameConfig,
        seats: Vec<Seat>,
        broadcaster: Broadcaster,
    ) -> Result<Self> {
        config.validate()?;
        if seats.len() < config.min_participants {
            return Err(OrchestratorError::NotEnoughParticipants {
                required: config.min_participants,
                got: seats.len(),
            });
        }

        let narrator = normalize_name(NARRATOR_NAME);
        let mut seen = HashSet::new();
        let mut participants = Vec::with_capacity(seats.len());
        let mut agents = HashMap::with_capacity(seats.len());
        for seat in seats {
            let normalized = normalize_name(&seat.name);
            if normalized.is_empty() {
                return Err(OrchestratorError::EmptyName);
            }
            if normalized == narrator {
                return Err(OrchestratorError::ReservedName(seat.name.trim().to_string()));
            }
            if !seen.insert(normalized) {
                return Err(OrchestratorError::DuplicateName(seat.name.trim().to_string()));
            }
            let participant = Participant::new(seat.name.trim());
            agents.insert(participant.id, seat.agent);
            participants.push(participant);
        }

        let (rng, narrator) = match config.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                Narrator::seeded(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_entropy(), Narrator::new()),
        };

        let game = Self {
            id,
            active: participants.iter().map(|p| p.id).collect(),
            participants,
            agents,
            config,
            eliminated: Vec::new(),
            winners: Vec::new(),
            phase: RoundPhase::Setup,
            status: SessionStatus::Pending,
            round: 0,
            votes: VoteMap::new(),
            defendants: Vec::new(),
            tie_set: Vec::new(),
            tie_break_attempts: 0,
            transcript: Transcript::new(),
            broadcaster,
            narrator,
            rng,
            error: None,
            created_at: Utc::now(),
            shared: SharedSnapshot::default(),
        };
        game.publish_state();
        info!(
            session_id = %id,
            participants = game.participants.len(),
            "Session created"
        );
        Ok(game)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn active(&self) -> Vec<Participant> {
        self.collect(&self.active)
    }

    /// Eliminated participants, first out first.
    pub fn eliminated(&self) -> Vec<Participant> {
        self.collect(&self.eliminated)
    }

    pub fn winners(&self) -> Vec<Participant> {
        self.collect(&self.winners)
    }

    /// Read handle on the session transcript.
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    pub fn shared_snapshot(&self) -> SharedSnapshot {
        Arc::clone(&self.shared)
    }

    pub fn is_over(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            status: self.status,
            round: self.round,
            phase: self.phase,
            participants: self.participants.clone(),
            active: self.active(),
            eliminated: self.eliminated(),
            winners: self.winners(),
            transcript_len: self.transcript.len(),
            error: self.error.clone(),
            created_at: self.created_at,
        }
    }

    pub fn ensure_can_start(&self) -> Result<()> {
        match self.status {
            SessionStatus::Pending => Ok(()),
            SessionStatus::Failed => Err(self.failed_error()),
            SessionStatus::Running => Err(OrchestratorError::RoundInProgress),
            SessionStatus::Idle | SessionStatus::Completed => Err(OrchestratorError::AlreadyStarted),
        }
    }

    pub fn ensure_can_advance(&self) -> Result<()> {
        match self.status {
            SessionStatus::Idle => Ok(()),
            SessionStatus::Pending => Err(OrchestratorError::NotStarted),
            SessionStatus::Running => Err(OrchestratorError::RoundInProgress),
            SessionStatus::Completed => Err(OrchestratorError::GameOver),
            SessionStatus::Failed => Err(self.failed_error()),
        }
    }

    /// Run the opening round: introductions, then the first vote.
    pub async fn start(&mut self) -> Result<RoundOutcome> {
        self.ensure_can_start()?;
        self.begin_round();
        let result = self.play_intro_round().await;
        self.finish_round(result)
    }

    /// Run one persuasion round through to its elimination.
    pub async fn advance_round(&mut self) -> Result<RoundOutcome> {
        self.ensure_can_advance()?;
        self.begin_round();
        let result = self.play_persuasion_round().await;
        self.finish_round(result)
    }

    /// Start if needed, then keep advancing until the game is over.
    pub async fn play_out(&mut self, round_delay: Duration) -> Result<Vec<RoundOutcome>> {
        let mut outcomes = Vec::new();
        if self.status == SessionStatus::Pending {
            outcomes.push(self.start().await?);
        } else {
            self.ensure_can_advance()?;
        }

        while self.status == SessionStatus::Idle {
            if !round_delay.is_zero() {
                tokio::time::sleep(round_delay).await;
            }
            outcomes.push(self.advance_round().await?);
        }
        Ok(outcomes)
    }

    fn failed_error(&self) -> OrchestratorError {
        OrchestratorError::SessionFailed(self.error.clone().unwrap_or_default())
    }

    fn begin_round(&mut self) {
        self.round += 1;
        self.status = SessionStatus::Running;
        self.votes.clear();
        self.defendants.clear();
        self.tie_set.clear();
        self.tie_break_attempts = 0;
        info!(session_id = %self.id, round = self.round, active = self.active.len(), "Round started");
        self.publish_state();
    }

    fn finish_round(&mut self, result: Result<RoundOutcome>) -> Result<RoundOutcome> {
        match result {
            Ok(outcome) => {
                info!(
                    session_id = %self.id,
                    round = outcome.round,
                    eliminated = %outcome.eliminated.name,
                    tie_break = outcome.tie_break,
                    game_over = outcome.game_over,
                    "Round complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(
                    session_id = %self.id,
                    round = self.round,
                    phase = self.phase.as_str(),
                    error = %e,
                    "Round failed"
                );
                self.status = SessionStatus::Failed;
                self.error = Some(e.to_string());
                let line = self.narrator.round_failed(&e.to_string());
                self.narrate(line, "round_failed");
                self.publish_state();
                Err(e)
            }
        }
    }

    async fn play_intro_round(&mut self) -> Result<RoundOutcome> {
        self.transition(RoundPhase::Intro)?;
        let background = self.narrator.background();
        self.narrate(background, "background");
        let opening = self.narrator.opening();
        self.narrate(opening, "opening");

        let order = self.speaking_order();
        for (i, id) in order.into_iter().enumerate() {
            let name = self.name_of(id)?;
            let cue = self.narrator.intro_cue(&name, i == 0);
            self.narrate(cue, "speaker_cue");
            self.speak(id).await?;
        }

        let transition = self.narrator.intro_transition();
        self.narrate(transition, "transition");
        self.play_voting().await
    }

    async fn play_persuasion_round(&mut self) -> Result<RoundOutcome> {
        self.transition(RoundPhase::Persuasion)?;
        let announcement = self.narrator.persuasion_open();
        self.narrate(announcement, "persuasion");

        for id in self.speaking_order() {
            let name = self.name_of(id)?;
            let cue = self.narrator.speaker_cue(&name);
            self.narrate(cue, "speaker_cue");
            self.speak(id).await?;
        }

        self.play_voting().await
    }

    async fn play_voting(&mut self) -> Result<RoundOutcome> {
        self.initial_vote().await?;
        self.defense().await?;
        self.final_vote().await?;
        let (eliminated, tie_break, forced) = self.resolve().await?;
        self.end_round(eliminated, tie_break, forced)
    }

    async fn initial_vote(&mut self) -> Result<()> {
        self.transition(RoundPhase::InitialVote)?;
        let intro = self.narrator.voting_intro();
        self.narrate(intro, "voting");

        let voters = self.active.clone();
        self.collect_votes(&voters, None).await?;

        let result = tally(&self.votes);
        self.defendants = self.in_active_order(&result.leaders);
        let names = self.names(&self.defendants)?;
        debug!(session_id = %self.id, leaders = ?names, max = result.max, "Initial vote tallied");
        let line = self.narrator.leaders(&names);
        self.narrate(line, "vote_result");
        Ok(())
    }

    async fn defense(&mut self) -> Result<()> {
        self.transition(RoundPhase::Defense)?;

        for id in self.defendants.clone() {
            let name = self.name_of(id)?;
            let accusers: Vec<ParticipantId> = self
                .active
                .iter()
                .filter(|voter| self.votes.get(*voter) == Some(&id))
                .copied()
                .collect();
            let accusers = self.names(&accusers)?;
            let prompt = self.narrator.defense_prompt(&name, &accusers);
            self.narrate(prompt, "defense");
            self.speak(id).await?;
        }
        Ok(())
    }

    async fn final_vote(&mut self) -> Result<()> {
        self.transition(RoundPhase::FinalVote)?;
        let line = self.narrator.final_vote();
        self.narrate(line, "final_vote");

        let mut voters: Vec<ParticipantId> = if self.config.exclude_defendants_from_final_vote {
            self.active
                .iter()
                .filter(|id| !self.defendants.contains(id))
                .copied()
                .collect()
        } else {
            self.active.clone()
        };
        if voters.is_empty() {
            warn!(session_id = %self.id, "Every participant is a defendant, all of them vote");
            voters = self.active.clone();
        }

        self.collect_votes(&voters, None).await
    }

    /// Settle the final vote. Returns the eliminated id and whether a
    /// tie-break (and a forced pick) was needed.
    async fn resolve(&mut self) -> Result<(ParticipantId, bool, bool)> {
        self.transition(RoundPhase::Resolution)?;
        let result = tally(&self.votes);

        if let Some(loser) = result.winner() {
            self.eliminate(loser, false).await?;
            return Ok((loser, false, false));
        }

        self.tie_set = self.in_active_order(&result.leaders);
        if self.tie_set.is_empty() {
            self.tie_set = self.active.clone();
        }
        let names = self.names(&self.tie_set)?;
        let line = self.narrator.tie(&names);
        self.narrate(line, "tie");

        self.transition(RoundPhase::TieBreak)?;
        let (loser, forced) = self.break_tie().await?;

        self.transition(RoundPhase::Resolution)?;
        self.eliminate(loser, forced).await?;
        Ok((loser, true, forced))
    }

    async fn break_tie(&mut self) -> Result<(ParticipantId, bool)> {
        loop {
            let voters: Vec<ParticipantId> = self
                .active
                .iter()
                .filter(|id| !self.tie_set.contains(id))
                .copied()
                .collect();
            if voters.is_empty() {
                info!(session_id = %self.id, "No participant outside the tie can vote");
                break;
            }
            if self.tie_break_attempts >= self.config.max_tie_break_attempts {
                break;
            }
            self.tie_break_attempts += 1;

            let tied = self.tie_set.clone();
            let tied_names = self.names(&tied)?;
            let line = self.narrator.tie_break_open(&tied_names);
            self.narrate(line, "tie_break");
            for id in tied.iter().copied() {
                let name = self.name_of(id)?;
                let cue = self.narrator.tie_break_speaker_cue(&name);
                self.narrate(cue, "speaker_cue");
                self.speak(id).await?;
            }

            self.collect_votes(&voters, Some(&tied)).await?;
            let result = tally_within(&self.votes, &tied);
            if let Some(loser) = result.winner() {
                return Ok((loser, false));
            }
            if !result.leaders.is_empty() {
                self.tie_set = self.in_active_order(&result.leaders);
            }
            let names = self.names(&self.tie_set)?;
            let line = self.narrator.tie(&names);
            self.narrate(line, "tie");
        }

        let loser = self
            .tie_set
            .choose(&mut self.rng)
            .copied()
            .ok_or_else(|| OrchestratorError::InvalidConfig("tie set is empty".to_string()))?;
        let name = self.name_of(loser)?;
        info!(session_id = %self.id, eliminated = %name, "Tie broken at random");
        let line = self.narrator.forced_elimination(&name);
        self.narrate(line, "forced_elimination");
        Ok((loser, true))
    }

    async fn eliminate(&mut self, id: ParticipantId, forced: bool) -> Result<()> {
        if !self.active.contains(&id) {
            return Err(OrchestratorError::ParticipantNotFound(id));
        }
        self.active.retain(|p| *p != id);
        if let Some(p) = self.participants.iter_mut().find(|p| p.id == id) {
            p.eliminate();
        }
        self.eliminated.push(id);
        self.tie_set.clear();
        self.publish_state();

        let name = self.name_of(id)?;
        if !forced {
            let line = self.narrator.elimination(&name);
            self.narrate(line, "elimination");
        }
        let farewell = self.narrator.farewell(&name);
        self.narrate(farewell, "farewell");
        self.speak(id).await
    }

    fn end_round(
        &mut self,
        eliminated: ParticipantId,
        tie_break: bool,
        forced: bool,
    ) -> Result<RoundOutcome> {
        self.transition(RoundPhase::RoundEnd)?;

        let game_over = self.config.exit_rule.is_met(self.active.len());
        if game_over {
            self.finish_game()?;
        } else {
            self.status = SessionStatus::Idle;
            self.publish_state();
        }

        Ok(RoundOutcome {
            round: self.round,
            eliminated: self.participant(eliminated)?.clone(),
            tie_break,
            forced,
            game_over,
            winners: self.winners(),
        })
    }

    fn finish_game(&mut self) -> Result<()> {
        self.transition(RoundPhase::GameOver)?;
        self.winners = self.active.clone();

        let names = self.names(&self.winners)?;
        let announcement = match names.as_slice() {
            [first, second] => self.narrator.finalists(first, second),
            [only] => self.narrator.single_winner(only),
            _ => self.narrator.leaders(&names),
        };
        self.narrate(announcement, "winner");
        let closing = self.narrator.closing();
        self.narrate(closing, "closing");

        self.status = SessionStatus::Completed;
        self.publish_state();
        info!(session_id = %self.id, winners = ?names, "Game over");
        Ok(())
    }

    /// Collect one ballot per voter into a fresh vote map.
    ///
    /// `restrict` limits the legal targets (tie-break); otherwise every
    /// active participant other than the voter is eligible.
    async fn collect_votes(
        &mut self,
        voters: &[ParticipantId],
        restrict: Option<&[ParticipantId]>,
    ) -> Result<()> {
        self.votes.clear();
        let restricted_names = match restrict {
            Some(ids) => Some(self.names(ids)?),
            None => None,
        };

        for &voter_id in voters {
            let voter = self.participant(voter_id)?.clone();
            let cue = match &restricted_names {
                Some(names) => self.narrator.tie_break_vote_cue(&voter.name, names),
                None => self.narrator.vote_cue(&voter.name),
            };
            self.narrate(cue, "vote_cue");

            let agent = self.agent(voter_id)?;
            let lines = self.transcript.lines();
            let ballot = call_agent(
                &voter.name,
                self.phase,
                self.config.agent_timeout(),
                agent.vote(&lines),
            )
            .await?;

            let candidates = self.collect(restrict.unwrap_or(self.active.as_slice()));
            let resolved = resolve_vote_target(
                &voter,
                &ballot.target_name,
                &candidates,
                self.config.vote_resolution,
                &mut self.rng,
            )?;

            self.votes.insert(voter_id, resolved.target.id);
            self.say(
                &voter,
                format!("I vote for {}.", resolved.target.name),
                ballot.private_reasoning,
            );
        }
        Ok(())
    }

    async fn speak(&mut self, id: ParticipantId) -> Result<()> {
        let speaker = self.participant(id)?.clone();
        let agent = self.agent(id)?;
        let lines = self.transcript.lines();
        let reply = call_agent(
            &speaker.name,
            self.phase,
            self.config.agent_timeout(),
            agent.respond(&lines),
        )
        .await?;

        self.say(&speaker, reply.text, reply.private_reasoning);
        Ok(())
    }

    fn narrate(&self, content: String, event: &str) {
        let entry = self.transcript.narrate(content, event);
        self.deliver(&entry);
    }

    fn say(&self, speaker: &Participant, content: String, private_reasoning: String) {
        let entry = self.transcript.append(
            EntryKind::Participant,
            &speaker.name,
            content,
            Some(private_reasoning),
            None,
        );
        self.deliver(&entry);
    }

    fn deliver(&self, entry: &arena_core::TranscriptEntry) {
        self.broadcaster.publish(self.id, entry);
        let mut shared = self
            .shared
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        shared.transcript_len = entry.sequence_index as usize + 1;
    }

    fn transition(&mut self, to: RoundPhase) -> Result<()> {
        RoundStateMachine::validate_transition(&self.phase, &to)?;
        debug!(
            session_id = %self.id,
            round = self.round,
            from = self.phase.as_str(),
            to = to.as_str(),
            "Phase transition"
        );
        self.phase = to;
        self.publish_state();
        Ok(())
    }

    fn publish_state(&self) {
        let snapshot = self.snapshot();
        *self
            .shared
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;
    }

    fn speaking_order(&mut self) -> Vec<ParticipantId> {
        let mut order = self.active.clone();
        order.shuffle(&mut self.rng);
        order
    }

    fn in_active_order(&self, ids: &[ParticipantId]) -> Vec<ParticipantId> {
        self.active
            .iter()
            .filter(|id| ids.contains(id))
            .copied()
            .collect()
    }

    fn collect(&self, ids: &[ParticipantId]) -> Vec<Participant> {
        ids.iter()
            .filter_map(|id| self.participants.iter().find(|p| p.id == *id))
            .cloned()
            .collect()
    }

    fn participant(&self, id: ParticipantId) -> Result<&Participant> {
        self.participants
            .iter()
            .find(|p| p.id == id)
            .ok_or(OrchestratorError::ParticipantNotFound(id))
    }

    fn name_of(&self, id: ParticipantId) -> Result<String> {
        self.participant(id).map(|p| p.name.clone())
    }

    fn names(&self, ids: &[ParticipantId]) -> Result<Vec<String>> {
        ids.iter().map(|id| self.name_of(*id)).collect()
    }

    fn agent(&self, id: ParticipantId) -> Result<Arc<dyn Agent>> {
        self.agents
            .get(&id)
            .cloned()
            .ok_or_else(|| OrchestratorError::MissingAgent(id.to_string()))
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("round", &self.round)
            .field("phase", &self.phase)
            .field("active", &self.active.len())
            .finish()
    }
}

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{Agent, AgentError, AgentReply, AgentVote};

const FALLBACK_REPLIES: &[&str] = &[
    "I'm still here, and I'm not planning on leaving.",
    "Say what you want. I know exactly who the real threat is.",
    "I've listened to all of you. Some of you should be worried.",
    "Keep talking. It only makes my decision easier.",
    "I came to win, not to make friends.",
];

/// Agent that plays back queued lines and ballots.
///
/// Once a queue runs dry it falls back to stock replies and a random vote
/// for someone on its roster. Used for offline runs and tests.
pub struct ScriptedAgent {
    name: String,
    replies: Mutex<VecDeque<String>>,
    votes: Mutex<VecDeque<String>>,
    roster: Vec<String>,
    failure: Option<String>,
    delay: Option<Duration>,
    rng: Mutex<StdRng>,
    respond_calls: AtomicUsize,
    vote_calls: AtomicUsize,
    last_transcript: Mutex<Vec<String>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(VecDeque::new()),
            votes: Mutex::new(VecDeque::new()),
            roster: Vec::new(),
            failure: None,
            delay: None,
            rng: Mutex::new(StdRng::from_entropy()),
            respond_calls: AtomicUsize::new(0),
            vote_calls: AtomicUsize::new(0),
            last_transcript: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        guard(&self.replies).extend(replies.into_iter().map(Into::into));
        self
    }

    /// Queue ballots, one name per vote call.
    pub fn with_votes<I, S>(self, votes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        guard(&self.votes).extend(votes.into_iter().map(Into::into));
        self
    }

    /// Names this agent may pick from once its vote queue is empty.
    pub fn with_roster<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let own = self.name.trim().to_lowercase();
        self.roster = names
            .into_iter()
            .map(Into::into)
            .filter(|n: &String| n.trim().to_lowercase() != own)
            .collect();
        self
    }

    /// Every call fails with [`AgentError::Unavailable`].
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        *guard(&self.rng) = StdRng::seed_from_u64(seed);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn respond_calls(&self) -> usize {
        self.respond_calls.load(Ordering::SeqCst)
    }

    pub fn vote_calls(&self) -> usize {
        self.vote_calls.load(Ordering::SeqCst)
    }

    /// Transcript passed to the most recent call.
    pub fn last_transcript(&self) -> Vec<String> {
        guard(&self.last_transcript).clone()
    }

    async fn before_call(&self, transcript: &[String]) -> Result<(), AgentError> {
        *guard(&self.last_transcript) = transcript.to_vec();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(AgentError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }

    fn fallback_reply(&self) -> String {
        let mut rng = guard(&self.rng);
        FALLBACK_REPLIES
            .choose(&mut *rng)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    fn fallback_vote(&self) -> String {
        let mut rng = guard(&self.rng);
        self.roster.choose(&mut *rng).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn respond(&self, transcript: &[String]) -> Result<AgentReply, AgentError> {
        self.respond_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call(transcript).await?;

        let queued = guard(&self.replies).pop_front();
        let text = queued.unwrap_or_else(|| self.fallback_reply());
        Ok(AgentReply::new(text, format!("{} is sticking to the script.", self.name)))
    }

    async fn vote(&self, transcript: &[String]) -> Result<AgentVote, AgentError> {
        self.vote_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call(transcript).await?;

        let queued = guard(&self.votes).pop_front();
        let target = queued.unwrap_or_else(|| self.fallback_vote());
        Ok(AgentVote::new(
            target.clone(),
            format!("{} looks like the easiest target.", target),
        ))
    }
}

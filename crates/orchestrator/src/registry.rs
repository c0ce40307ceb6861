//! Live sessions keyed by id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use arena_core::{Participant, SessionSnapshot, SessionStatus};
use events::Broadcaster;
use tokio::sync::{Mutex as AsyncMutex, OnceCell, OwnedMutexGuard};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::error::{OrchestratorError, Result};
use crate::game::{Game, RoundOutcome, Seat, SharedSnapshot};
use crate::recap::Recapper;
use crate::transcript::Transcript;

/// One session plus its worker.
///
/// Rounds run while holding the game lock; state and transcript reads go
/// through shared handles and never wait on a running round.
pub struct GameHandle {
    id: Uuid,
    game: Arc<AsyncMutex<Game>>,
    snapshot: SharedSnapshot,
    transcript: Transcript,
    worker: Mutex<Option<AbortHandle>>,
    takeaway: OnceCell<String>,
}

impl GameHandle {
    pub fn new(game: Game) -> Self {
        Self {
            id: game.id(),
            snapshot: game.shared_snapshot(),
            transcript: game.transcript(),
            game: Arc::new(AsyncMutex::new(game)),
            worker: Mutex::new(None),
            takeaway: OnceCell::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn winners(&self) -> Vec<Participant> {
        self.snapshot().winners
    }

    /// Host takeaway on the winners, written once after game over.
    ///
    /// `None` while the game is still going or when the recap fails; a
    /// failed recap is retried on the next call.
    pub async fn takeaway(&self, recapper: &dyn Recapper) -> Option<String> {
        let snapshot = self.snapshot();
        if snapshot.status != SessionStatus::Completed {
            return None;
        }

        let result = self
            .takeaway
            .get_or_try_init(|| async {
                let winners: Vec<String> =
                    snapshot.winners.iter().map(|p| p.name.clone()).collect();
                recapper
                    .takeaway(&self.transcript.lines(), &winners)
                    .await
            })
            .await;

        match result {
            Ok(takeaway) => Some(takeaway.clone()),
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Failed to write winner takeaway");
                None
            }
        }
    }

    fn try_lock(&self) -> Result<OwnedMutexGuard<Game>> {
        Arc::clone(&self.game)
            .try_lock_owned()
            .map_err(|_| OrchestratorError::RoundInProgress)
    }

    pub async fn start(&self) -> Result<RoundOutcome> {
        let mut game = self.try_lock()?;
        game.start().await
    }

    pub async fn advance(&self) -> Result<RoundOutcome> {
        let mut game = self.try_lock()?;
        game.advance_round().await
    }

    /// Validate and begin the opening round on a background task.
    pub fn spawn_start(&self) -> Result<JoinHandle<Result<RoundOutcome>>> {
        let mut game = self.try_lock()?;
        game.ensure_can_start()?;
        Ok(self.track(tokio::spawn(async move { game.start().await })))
    }

    /// Validate and begin the next round on a background task.
    pub fn spawn_advance(&self) -> Result<JoinHandle<Result<RoundOutcome>>> {
        let mut game = self.try_lock()?;
        game.ensure_can_advance()?;
        Ok(self.track(tokio::spawn(async move { game.advance_round().await })))
    }

    /// Drive the session to game over on a background task.
    pub fn spawn_play_out(
        &self,
        round_delay: Duration,
    ) -> Result<JoinHandle<Result<Vec<RoundOutcome>>>> {
        let mut game = self.try_lock()?;
        if game.status() != SessionStatus::Pending {
            game.ensure_can_advance()?;
        }
        Ok(self.track(tokio::spawn(async move { game.play_out(round_delay).await })))
    }

    fn track<T>(&self, task: JoinHandle<T>) -> JoinHandle<T> {
        let mut worker = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *worker = Some(task.abort_handle());
        task
    }

    /// Stop the background round, if one is running.
    pub fn abort(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = worker {
            handle.abort();
        }
    }
}

#[derive(Clone)]
pub struct GameRegistry {
    games: Arc<RwLock<HashMap<Uuid, Arc<GameHandle>>>>,
    broadcaster: Broadcaster,
}

impl GameRegistry {
    pub fn new(broadcaster: Broadcaster) -> Self {
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            broadcaster,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Arc<GameHandle>>> {
        self.games
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Arc<GameHandle>>> {
        self.games
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn create(&self, config: GameConfig, seats: Vec<Seat>) -> Result<Arc<GameHandle>> {
        let id = Uuid::new_v4();
        let game = Game::new(id, config, seats, self.broadcaster.clone())?;
        let handle = Arc::new(GameHandle::new(game));
        self.write().insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    pub fn get(&self, id: Uuid) -> Result<Arc<GameHandle>> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or(OrchestratorError::SessionNotFound(id))
    }

    /// Snapshots of every session, oldest first.
    pub fn list(&self) -> Vec<SessionSnapshot> {
        let mut sessions: Vec<SessionSnapshot> =
            self.read().values().map(|handle| handle.snapshot()).collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    /// Drop a session, stop its worker and disconnect its observers.
    pub fn remove(&self, id: Uuid) -> Result<Arc<GameHandle>> {
        let handle = self
            .write()
            .remove(&id)
            .ok_or(OrchestratorError::SessionNotFound(id))?;
        handle.abort();
        let observers = self.broadcaster.close_session(id);
        info!(session_id = %id, observers, "Session removed");
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

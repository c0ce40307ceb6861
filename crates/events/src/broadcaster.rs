//! Per-session observer registry with replay and best-effort fan-out

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use arena_core::TranscriptEntry;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::ObserverMessage;

/// Capacity of each observer's outbound queue
const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

pub type ObserverId = Uuid;

/// Read access to the authoritative transcript of a session.
///
/// Used to reseed the replay buffer when an observer joins a session whose
/// buffer was released (or never filled because nobody was watching).
pub trait TranscriptSource {
    /// Entries with `sequence_index >= start`, in order.
    fn entries_from(&self, start: u64) -> Vec<TranscriptEntry>;
}

/// A joined observer: its id and the queue its messages arrive on.
#[derive(Debug)]
pub struct Subscription {
    pub session_id: Uuid,
    pub observer_id: ObserverId,
    pub receiver: mpsc::Receiver<ObserverMessage>,
}

struct Observer {
    tx: mpsc::Sender<ObserverMessage>,
    /// First sequence index this observer has not received yet
    next_sequence: u64,
}

#[derive(Default)]
struct SessionChannels {
    /// Invariant: `replay[i].sequence_index == i`
    replay: Vec<TranscriptEntry>,
    observers: HashMap<ObserverId, Observer>,
}

/// Fans transcript entries out to the observers of each session.
///
/// Joining and publishing take the same lock, so an observer receives every
/// entry exactly once: either inside its history batch or as a live event.
#[derive(Clone)]
pub struct Broadcaster {
    sessions: Arc<Mutex<HashMap<Uuid, SessionChannels>>>,
    channel_capacity: usize,
    /// Number of messages handed to observer queues (for monitoring)
    delivered: Arc<AtomicUsize>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a broadcaster whose observer queues hold `capacity` messages.
    ///
    /// An observer whose queue is full when an entry is published is dropped.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            channel_capacity: capacity.max(2),
            delivered: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, SessionChannels>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Join an observer to a session.
    ///
    /// The full transcript so far is queued to the new observer as one
    /// `history` batch before it is added to the live set.
    pub fn connect(&self, session_id: Uuid, source: &dyn TranscriptSource) -> Subscription {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let observer_id = Uuid::new_v4();

        let mut sessions = self.lock();
        let channels = sessions.entry(session_id).or_default();

        let missing = source.entries_from(channels.replay.len() as u64);
        for entry in missing {
            if entry.sequence_index == channels.replay.len() as u64 {
                channels.replay.push(entry);
            }
        }

        // Fresh channel with capacity >= 2: this cannot fail.
        let _ = tx.try_send(ObserverMessage::history(&channels.replay));
        channels.observers.insert(
            observer_id,
            Observer {
                tx,
                next_sequence: channels.replay.len() as u64,
            },
        );

        debug!(
            session_id = %session_id,
            observer_id = %observer_id,
            replayed = channels.replay.len(),
            observers = channels.observers.len(),
            "Observer connected"
        );

        Subscription {
            session_id,
            observer_id,
            receiver: rx,
        }
    }

    /// Deliver a freshly appended transcript entry to every observer that
    /// has not already received it in its history batch.
    ///
    /// Returns the number of observers that accepted the entry. Observers
    /// whose queue is closed or full are removed; the others are unaffected.
    pub fn publish(&self, session_id: Uuid, entry: &TranscriptEntry) -> usize {
        let mut sessions = self.lock();
        let Some(channels) = sessions.get_mut(&session_id) else {
            return 0;
        };

        let expected = channels.replay.len() as u64;
        if entry.sequence_index == expected {
            channels.replay.push(entry.clone());
        } else if entry.sequence_index > expected {
            warn!(
                session_id = %session_id,
                expected,
                got = entry.sequence_index,
                "Replay buffer out of step with transcript"
            );
        }

        let msg = ObserverMessage::from(entry);
        let mut failed = Vec::new();
        let mut sent = 0;

        for (observer_id, observer) in channels.observers.iter_mut() {
            if observer.next_sequence > entry.sequence_index {
                // Already part of the history batch sent on join.
                continue;
            }
            match observer.tx.try_send(msg.clone()) {
                Ok(()) => {
                    observer.next_sequence = entry.sequence_index + 1;
                    sent += 1;
                }
                Err(e) => {
                    warn!(
                        session_id = %session_id,
                        observer_id = %observer_id,
                        error = %e,
                        "Dropping observer after failed delivery"
                    );
                    failed.push(*observer_id);
                }
            }
        }

        for observer_id in failed {
            channels.observers.remove(&observer_id);
        }
        if channels.observers.is_empty() {
            sessions.remove(&session_id);
            debug!(session_id = %session_id, "Last observer gone, released session buffers");
        }

        self.delivered.fetch_add(sent, Ordering::Relaxed);
        sent
    }

    /// Remove an observer. Returns false if it was not connected.
    pub fn disconnect(&self, session_id: Uuid, observer_id: ObserverId) -> bool {
        let mut sessions = self.lock();
        let Some(channels) = sessions.get_mut(&session_id) else {
            return false;
        };

        let removed = channels.observers.remove(&observer_id).is_some();
        if channels.observers.is_empty() {
            sessions.remove(&session_id);
            debug!(session_id = %session_id, "Last observer gone, released session buffers");
        }
        removed
    }

    /// Drop every observer of a session and release its buffers.
    pub fn close_session(&self, session_id: Uuid) -> usize {
        self.lock()
            .remove(&session_id)
            .map(|c| c.observers.len())
            .unwrap_or(0)
    }

    pub fn observer_count(&self, session_id: Uuid) -> usize {
        self.lock()
            .get(&session_id)
            .map(|c| c.observers.len())
            .unwrap_or(0)
    }

    pub fn has_observers(&self, session_id: Uuid) -> bool {
        self.observer_count(session_id) > 0
    }

    /// Number of sessions currently holding buffers
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    pub fn replay_len(&self, session_id: Uuid) -> usize {
        self.lock()
            .get(&session_id)
            .map(|c| c.replay.len())
            .unwrap_or(0)
    }

    /// Total number of messages handed to observer queues
    pub fn delivered_count(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("session_count", &self.session_count())
            .field("delivered_count", &self.delivered_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::{EntryKind, NARRATOR_NAME};
    use chrono::Utc;
    use std::sync::RwLock;

    #[derive(Default)]
    struct FakeTranscript {
        entries: RwLock<Vec<TranscriptEntry>>,
    }

    impl FakeTranscript {
        fn append(&self, content: &str) -> TranscriptEntry {
            let mut entries = self.entries.write().unwrap();
            let entry = TranscriptEntry {
                sequence_index: entries.len() as u64,
                kind: EntryKind::Narrator,
                sender: NARRATOR_NAME.to_string(),
                content: content.to_string(),
                private_reasoning: None,
                event: None,
                timestamp: Utc::now(),
            };
            entries.push(entry.clone());
            entry
        }
    }

    impl TranscriptSource for FakeTranscript {
        fn entries_from(&self, start: u64) -> Vec<TranscriptEntry> {
            self.entries
                .read()
                .unwrap()
                .iter()
                .skip(start as usize)
                .cloned()
                .collect()
        }
    }

    fn history_len(msg: ObserverMessage) -> usize {
        match msg {
            ObserverMessage::History { messages } => messages.len(),
            other => panic!("Expected history, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_receives_empty_history() {
        let bus = Broadcaster::new();
        let transcript = FakeTranscript::default();
        let mut sub = bus.connect(Uuid::new_v4(), &transcript);

        assert_eq!(history_len(sub.receiver.recv().await.unwrap()), 0);
        assert_eq!(bus.observer_count(sub.session_id), 1);
    }

    #[tokio::test]
    async fn test_publish_reaches_all_observers() {
        let bus = Broadcaster::new();
        let session = Uuid::new_v4();
        let transcript = FakeTranscript::default();

        let mut a = bus.connect(session, &transcript);
        let mut b = bus.connect(session, &transcript);
        a.receiver.recv().await.unwrap();
        b.receiver.recv().await.unwrap();

        let entry = transcript.append("Welcome");
        assert_eq!(bus.publish(session, &entry), 2);

        assert_eq!(a.receiver.recv().await.unwrap().sequence(), Some(0));
        assert_eq!(b.receiver.recv().await.unwrap().sequence(), Some(0));
        assert_eq!(bus.delivered_count(), 2);
    }

    #[tokio::test]
    async fn test_publish_without_observers_is_dropped() {
        let bus = Broadcaster::new();
        let transcript = FakeTranscript::default();
        let entry = transcript.append("Nobody here");

        assert_eq!(bus.publish(Uuid::new_v4(), &entry), 0);
        assert_eq!(bus.session_count(), 0);
    }

    #[tokio::test]
    async fn test_late_joiner_gets_history_then_live() {
        let bus = Broadcaster::new();
        let session = Uuid::new_v4();
        let transcript = FakeTranscript::default();

        let mut early = bus.connect(session, &transcript);
        early.receiver.recv().await.unwrap();
        for line in ["one", "two", "three"] {
            let e = transcript.append(line);
            bus.publish(session, &e);
        }

        let mut late = bus.connect(session, &transcript);
        let e = transcript.append("four");
        bus.publish(session, &e);

        assert_eq!(history_len(late.receiver.recv().await.unwrap()), 3);
        assert_eq!(late.receiver.recv().await.unwrap().sequence(), Some(3));

        let mut early_seqs = Vec::new();
        while let Ok(msg) = early.receiver.try_recv() {
            early_seqs.push(msg.sequence().unwrap());
        }
        assert_eq!(early_seqs, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_join_between_append_and_publish_has_no_duplicate() {
        let bus = Broadcaster::new();
        let session = Uuid::new_v4();
        let transcript = FakeTranscript::default();

        let entry = transcript.append("raced");
        let mut sub = bus.connect(session, &transcript);
        assert_eq!(bus.publish(session, &entry), 0);

        assert_eq!(history_len(sub.receiver.recv().await.unwrap()), 1);
        assert!(sub.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_join_between_append_and_publish_still_reaches_connected_observers() {
        let bus = Broadcaster::new();
        let session = Uuid::new_v4();
        let transcript = FakeTranscript::default();

        let mut early = bus.connect(session, &transcript);
        early.receiver.recv().await.unwrap();
        let first = transcript.append("first");
        assert_eq!(bus.publish(session, &first), 1);

        let second = transcript.append("second");
        let mut late = bus.connect(session, &transcript);
        assert_eq!(bus.publish(session, &second), 1);

        let third = transcript.append("third");
        assert_eq!(bus.publish(session, &third), 2);

        let mut early_seqs = Vec::new();
        while let Ok(msg) = early.receiver.try_recv() {
            early_seqs.push(msg.sequence().unwrap());
        }
        assert_eq!(early_seqs, vec![0, 1, 2]);

        assert_eq!(history_len(late.receiver.recv().await.unwrap()), 2);
        assert_eq!(late.receiver.recv().await.unwrap().sequence(), Some(2));
        assert!(late.receiver.try_recv().is_err());
        assert_eq!(bus.replay_len(session), 3);
    }

    #[tokio::test]
    async fn test_failed_observer_is_pruned_others_unaffected() {
        let bus = Broadcaster::new();
        let session = Uuid::new_v4();
        let transcript = FakeTranscript::default();

        let mut healthy = bus.connect(session, &transcript);
        let dead = bus.connect(session, &transcript);
        drop(dead.receiver);
        healthy.receiver.recv().await.unwrap();

        let entry = transcript.append("still here");
        assert_eq!(bus.publish(session, &entry), 1);
        assert_eq!(bus.observer_count(session), 1);
        assert_eq!(healthy.receiver.recv().await.unwrap().sequence(), Some(0));
    }

    #[tokio::test]
    async fn test_full_queue_counts_as_failure() {
        let bus = Broadcaster::with_capacity(2);
        let session = Uuid::new_v4();
        let transcript = FakeTranscript::default();

        let _slow = bus.connect(session, &transcript);
        let first = transcript.append("fills the queue");
        assert_eq!(bus.publish(session, &first), 1);

        let second = transcript.append("overflows");
        assert_eq!(bus.publish(session, &second), 0);
        assert_eq!(bus.observer_count(session), 0);
    }

    #[tokio::test]
    async fn test_last_disconnect_releases_buffers() {
        let bus = Broadcaster::new();
        let session = Uuid::new_v4();
        let transcript = FakeTranscript::default();
        transcript.append("a");

        let sub = bus.connect(session, &transcript);
        assert_eq!(bus.replay_len(session), 1);

        assert!(bus.disconnect(session, sub.observer_id));
        assert_eq!(bus.session_count(), 0);
        assert!(!bus.disconnect(session, sub.observer_id));
    }

    #[tokio::test]
    async fn test_rejoin_after_release_reseeds_from_transcript() {
        let bus = Broadcaster::new();
        let session = Uuid::new_v4();
        let transcript = FakeTranscript::default();

        let sub = bus.connect(session, &transcript);
        bus.disconnect(session, sub.observer_id);

        transcript.append("said while nobody watched");
        transcript.append("and this");

        let mut again = bus.connect(session, &transcript);
        assert_eq!(history_len(again.receiver.recv().await.unwrap()), 2);
    }

    #[tokio::test]
    async fn test_close_session() {
        let bus = Broadcaster::new();
        let session = Uuid::new_v4();
        let transcript = FakeTranscript::default();
        let _a = bus.connect(session, &transcript);
        let _b = bus.connect(session, &transcript);

        assert_eq!(bus.close_session(session), 2);
        assert!(!bus.has_observers(session));
    }

    #[test]
    fn test_clone_shares_registry() {
        let bus1 = Broadcaster::new();
        let bus2 = bus1.clone();
        let transcript = FakeTranscript::default();

        let sub = bus2.connect(Uuid::new_v4(), &transcript);
        assert_eq!(bus1.observer_count(sub.session_id), 1);
    }
}

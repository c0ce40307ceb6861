use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arena_core::{EntryKind, TranscriptEntry, NARRATOR_NAME};
use chrono::Utc;
use events::TranscriptSource;

/// Append-only log of one session.
///
/// Clones share the same log. Only the owning game appends; every other
/// holder reads.
#[derive(Clone, Default)]
pub struct Transcript {
    entries: Arc<RwLock<Vec<TranscriptEntry>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<TranscriptEntry>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TranscriptEntry>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an entry, assigning the next sequence index.
    pub(crate) fn append(
        &self,
        kind: EntryKind,
        sender: &str,
        content: impl Into<String>,
        private_reasoning: Option<String>,
        event: Option<&str>,
    ) -> TranscriptEntry {
        let mut entries = self.write();
        let entry = TranscriptEntry {
            sequence_index: entries.len() as u64,
            kind,
            sender: sender.to_string(),
            content: content.into(),
            private_reasoning: private_reasoning.filter(|r| !r.trim().is_empty()),
            event: event.map(str::to_string),
            timestamp: Utc::now(),
        };
        entries.push(entry.clone());
        entry
    }

    pub(crate) fn narrate(&self, content: impl Into<String>, event: &str) -> TranscriptEntry {
        self.append(EntryKind::Narrator, NARRATOR_NAME, content, None, Some(event))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.read().clone()
    }

    /// The transcript as agents see it, one rendered line per entry.
    pub fn lines(&self) -> Vec<String> {
        self.read().iter().map(TranscriptEntry::line).collect()
    }

    pub fn last(&self) -> Option<TranscriptEntry> {
        self.read().last().cloned()
    }
}

impl TranscriptSource for Transcript {
    fn entries_from(&self, start: u64) -> Vec<TranscriptEntry> {
        let entries = self.read();
        let start = (start as usize).min(entries.len());
        entries[start..].to_vec()
    }
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript").field("len", &self.len()).finish()
    }
}

//! Append-only, deduplicated record of finished analyses and follow-ups

use chrono::{DateTime, Utc};
use parley_core::{FinalResult, FollowUpMessage, HistoryEntry, Role};
use parley_telemetry::{append_jsonl, read_jsonl, TelemetryError};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// History for the lifetime of one UI surface.
///
/// Entries are kept in arrival order. A `message_id`, when present, appears
/// at most once.
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
    message_ids: HashSet<String>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry unless its `message_id` is already recorded
    pub fn append(&mut self, entry: HistoryEntry) -> bool {
        if let Some(id) = &entry.message_id {
            if !self.message_ids.insert(id.clone()) {
                debug!(message_id = %id, "duplicate history entry skipped");
                return false;
            }
        }
        self.entries.push(entry);
        true
    }

    /// Archive a finalized analysis together with its follow-up thread.
    ///
    /// Returns false when the analysis itself was already archived. Follow-up
    /// exchanges are still added if their replies are new, so a thread that
    /// grew after a manual save is not lost.
    pub fn archive(
        &mut self,
        result: &FinalResult,
        follow_ups: &[FollowUpMessage],
        now: DateTime<Utc>,
    ) -> bool {
        let archived = self.append(HistoryEntry::from_result(result, now));

        let mut questions = Vec::new();
        for message in follow_ups {
            match message.role {
                Role::User => questions.push(message),
                Role::Assistant => {
                    let is_new = message
                        .message_id
                        .as_ref()
                        .map_or(true, |id| !self.contains_message(id));
                    if is_new {
                        for question in questions.drain(..) {
                            self.append(HistoryEntry::from_follow_up(question));
                        }
                        self.append(HistoryEntry::from_follow_up(message));
                    }
                    questions.clear();
                }
            }
        }
        archived
    }

    pub fn contains_message(&self, message_id: &str) -> bool {
        self.message_ids.contains(message_id)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything; only done when the owning surface resets
    pub fn clear(&mut self) {
        self.entries.clear();
        self.message_ids.clear();
    }

    /// Append entries not yet in the file at `path`; returns how many were written
    pub fn save_to(&self, path: &Path) -> Result<usize, TelemetryError> {
        let existing: Vec<HistoryEntry> = read_jsonl(path)?;
        let saved: HashSet<&str> = existing
            .iter()
            .filter_map(|e| e.message_id.as_deref())
            .collect();

        let fresh: Vec<&HistoryEntry> = self
            .entries
            .iter()
            .filter(|entry| match entry.message_id.as_deref() {
                Some(id) => !saved.contains(id),
                None => !existing.contains(*entry),
            })
            .collect();

        append_jsonl(path, fresh)
    }

    /// Rebuild a ledger from a saved file, applying the same dedup rule
    pub fn load_from(path: &Path) -> Result<Self, TelemetryError> {
        let mut ledger = Self::new();
        for entry in read_jsonl::<HistoryEntry>(path)? {
            ledger.append(entry);
        }
        Ok(ledger)
    }
}

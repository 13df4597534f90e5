//! In-memory event store with snapshot-merge and realtime-upsert paths.
//!
//! The store is the single funnel for every write: the initial snapshot
//! load, later reconciliation fetches, and realtime pushes all land here.
//! Merging is **last-writer-wins by id** against the server snapshot, with
//! one protection: a locally known id absent from the snapshot is retained,
//! because realtime delivery can outrun the server's snapshot catch-up.
//!
//! No event is ever removed while a project is open. The only revisable
//! fields on a known id are `is_active` and `reverted_at`, and only through
//! [`EventStore::deactivate`] / [`EventStore::reactivate`] (driven by head
//! operations and confirmed realtime records) or a fresh snapshot record
//! for the same id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::event::Event;

// ---------------------------------------------------------------------------
// MergeStats
// ---------------------------------------------------------------------------

/// Counters describing what a snapshot merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Events in the store after the merge.
    pub total: usize,
    /// Snapshot ids that were not previously known.
    pub added: usize,
    /// Locally known ids absent from the snapshot and kept anyway.
    pub retained: usize,
    /// Duplicate ids inside the snapshot itself (last writer won).
    pub duplicates: usize,
}

// ---------------------------------------------------------------------------
// EventStore
// ---------------------------------------------------------------------------

/// Deduplicated, ordered collection of [`Event`] records for one project.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: HashMap<String, Event>,
}

impl EventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known set with a server snapshot.
    ///
    /// Snapshot records win over local copies of the same id (this is how
    /// server-confirmed `is_active`/`reverted_at` revisions arrive). Local
    /// ids missing from the snapshot are retained: a realtime push may be
    /// known here before the server's snapshot includes it.
    pub fn merge(&mut self, snapshot: Vec<Event>) -> MergeStats {
        let mut stats = MergeStats::default();
        let mut next: HashMap<String, Event> = HashMap::with_capacity(snapshot.len());

        for event in snapshot {
            if !self.events.contains_key(&event.id) {
                // Count each incoming id once, not per duplicate line.
                if !next.contains_key(&event.id) {
                    stats.added += 1;
                }
            }
            if next.insert(event.id.clone(), event).is_some() {
                stats.duplicates += 1;
            }
        }

        for (id, event) in self.events.drain() {
            if !next.contains_key(&id) {
                tracing::debug!(event_id = %id, "retaining local event absent from snapshot");
                next.insert(id, event);
                stats.retained += 1;
            }
        }

        self.events = next;
        stats.total = self.events.len();
        stats
    }

    /// Add a realtime event if its id is new. Returns whether it was new.
    ///
    /// Known ids are left untouched: activity revisions ride the snapshot
    /// merge or the explicit deactivate/reactivate paths, never a realtime
    /// re-insert.
    pub fn upsert_realtime(&mut self, event: Event) -> bool {
        if self.events.contains_key(&event.id) {
            return false;
        }
        self.events.insert(event.id.clone(), event);
        true
    }

    /// Mark a known event inactive.
    ///
    /// `reverted_at` is `Some` only when the deactivation is an explicit
    /// revert; a restore that supersedes a deletion passes `None` so the
    /// event reads as superseded, not reverted. Returns whether the id was
    /// known.
    pub fn deactivate(&mut self, id: &str, reverted_at: Option<DateTime<Utc>>) -> bool {
        match self.events.get_mut(id) {
            Some(event) => {
                event.is_active = false;
                if reverted_at.is_some() {
                    event.reverted_at = reverted_at;
                }
                true
            }
            None => false,
        }
    }

    /// Mark a known event active again, clearing any revert stamp.
    /// Returns whether the id was known.
    pub fn reactivate(&mut self, id: &str) -> bool {
        match self.events.get_mut(id) {
            Some(event) => {
                event.is_active = true;
                event.reverted_at = None;
                true
            }
            None => false,
        }
    }

    /// Look up an event by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.events.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in canonical journal order: descending `created_at`,
    /// ties broken by descending id.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        let mut out: Vec<Event> = self.events.values().cloned().collect();
        out.sort_by(Event::cmp_journal);
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

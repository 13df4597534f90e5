//! Partitioning of the event store into per-target histories.
//!
//! Each target gets one [`EventGroup`]: the event that currently represents
//! the target's live state plus the stack of states it superseded. The
//! representative is the newest **active** event; when a revert has
//! deactivated everything in the bucket, the newest event overall stands in
//! so a group is never without a representative.

use std::collections::HashMap;

use crate::event::Event;
use crate::resolve::{EventLookup, Target, resolve};

// ---------------------------------------------------------------------------
// EventGroup
// ---------------------------------------------------------------------------

/// The current plus historical events sharing one target.
#[derive(Debug, Clone, PartialEq)]
pub struct EventGroup {
    /// The logical thing these events are about.
    pub target: Target,
    /// The representative event for the target's live state.
    pub current: Event,
    /// Superseded and reverted states, newest first.
    pub previous: Vec<Event>,
}

impl EventGroup {
    /// Every event in the group, current first.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        std::iter::once(&self.current).chain(self.previous.iter())
    }

    /// Number of events in the group. Never zero: a group always has a
    /// representative.
    #[must_use]
    pub fn event_count(&self) -> usize {
        1 + self.previous.len()
    }
}

// ---------------------------------------------------------------------------
// JournalSummary
// ---------------------------------------------------------------------------

/// Counts surfaced alongside the grouped view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JournalSummary {
    /// Total events across all groups.
    pub total: usize,
    /// Events still contributing to live state.
    pub active: usize,
    /// Events explicitly deactivated by a revert.
    pub reverted: usize,
    /// Groups holding more than one event.
    pub stacks: usize,
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Partition `events` into per-target groups.
///
/// Buckets are keyed by the resolved target key; each bucket is ordered
/// newest first (ties by id), `current` is the first active entry or the
/// first entry outright, and the output is ordered by `current.created_at`
/// descending. O(n log n) in the event count, with each resolution bounded
/// by the visited-id set.
#[must_use]
pub fn group(events: &[Event], lookup: &dyn EventLookup) -> Vec<EventGroup> {
    let mut buckets: HashMap<String, (Target, Vec<Event>)> = HashMap::new();

    for event in events {
        let target = resolve(event, lookup);
        buckets
            .entry(target.key.clone())
            .or_insert_with(|| (target, Vec::new()))
            .1
            .push(event.clone());
    }

    let mut groups: Vec<EventGroup> = buckets
        .into_values()
        .map(|(target, mut bucket)| {
            bucket.sort_by(Event::cmp_journal);
            let current_idx = bucket.iter().position(|e| e.is_active).unwrap_or(0);
            let current = bucket.remove(current_idx);
            EventGroup {
                target,
                current,
                previous: bucket,
            }
        })
        .collect();

    groups.sort_by(|a, b| a.current.cmp_journal(&b.current));
    groups
}

/// Derive summary counts from a grouped view.
#[must_use]
pub fn summarize(groups: &[EventGroup]) -> JournalSummary {
    let mut summary = JournalSummary::default();
    for group in groups {
        summary.total += group.event_count();
        summary.active += group.events().filter(|e| e.is_active).count();
        summary.reverted += group.events().filter(|e| e.reverted_at.is_some()).count();
        if !group.previous.is_empty() {
            summary.stacks += 1;
        }
    }
    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

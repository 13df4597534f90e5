//! Resolution of events to the logical target they are "about".
//!
//! Most events name their target directly in the payload (an entity id, a
//! fragment path, a git branch). History-mutation events do not: a head
//! move or a revert is *about* whatever the referenced event was about, so
//! resolution follows reference ids through the store — by direct id, by an
//! embedded event snapshot, or by the first resolvable id of a referenced
//! array.
//!
//! # Cycle protection
//!
//! Reference chains form a graph over event ids, and nothing stops the
//! server (or a buggy client) from producing a cycle. Resolution threads an
//! explicit visited-id set through the recursion and bails to the fallback
//! target the instant it would revisit an id, bounding the walk to the
//! number of distinct ids involved.

use std::collections::{HashMap, HashSet};

use crate::event::{Event, EventType};
use crate::store::EventStore;

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// The derived identity an event resolves to.
///
/// Targets are not persisted; they exist so that events with different ids
/// can be grouped under one logical thing. Equality of `key` is the basis
/// of grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    /// Stable composite key, e.g. `entity:character:ent-9`.
    pub key: String,
    /// Human-facing name for the target.
    pub label: String,
    /// Optional longer description, when the payload carries one.
    pub description: Option<String>,
}

impl Target {
    fn new(key: String, label: String, description: Option<String>) -> Self {
        Self {
            key,
            label,
            description,
        }
    }
}

// ---------------------------------------------------------------------------
// EventLookup
// ---------------------------------------------------------------------------

/// Lookup seam for reference-following.
///
/// The resolver never assumes a concrete store: grouping hands it whatever
/// collection it is working over, and tests hand it plain maps.
pub trait EventLookup {
    /// Find a known event by id.
    fn event(&self, id: &str) -> Option<&Event>;
}

impl EventLookup for EventStore {
    fn event(&self, id: &str) -> Option<&Event> {
        self.get(id)
    }
}

impl EventLookup for HashMap<String, Event> {
    fn event(&self, id: &str) -> Option<&Event> {
        self.get(id)
    }
}

impl EventLookup for [Event] {
    fn event(&self, id: &str) -> Option<&Event> {
        self.iter().find(|e| e.id == id)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve an event to its target.
///
/// Reference-following is bounded: the visited set is seeded with the
/// event's own id, and any revisit short-circuits to the timeline fallback.
#[must_use]
pub fn resolve(event: &Event, lookup: &dyn EventLookup) -> Target {
    let mut seen = HashSet::new();
    seen.insert(event.id.clone());
    resolve_with_seen(event, lookup, &mut seen)
}

fn resolve_with_seen(event: &Event, lookup: &dyn EventLookup, seen: &mut HashSet<String>) -> Target {
    match &event.event_type {
        EventType::EntityCreated | EventType::EntityDeleted | EventType::EntityRestored => {
            entity_target(event)
        }
        EventType::FragmentCreated
        | EventType::FragmentUpdated
        | EventType::FragmentDeleted
        | EventType::FragmentRevisionCreated => fragment_target(event),
        EventType::ValidationStarted
        | EventType::ValidationCompleted
        | EventType::ValidationFailed => validation_target(event),
        EventType::VersionFrozen => version_target(event),
        EventType::GitPushProcessed => git_push_target(event),
        EventType::GitMergeProcessed => git_merge_target(event),
        EventType::EventHeadUpdated | EventType::EventsReverted | EventType::EventsReapplied => {
            resolve_reference(event, lookup, seen)
        }
        EventType::Other(_) => generic_target(event),
    }
}

// ---------------------------------------------------------------------------
// Direct targets
// ---------------------------------------------------------------------------

fn entity_target(event: &Event) -> Target {
    let Some(ident) = event.data.first_str(&["entity_id", "name"]) else {
        // An entity event without any identity cannot be grouped with its
        // siblings; fall through to the per-type bucket.
        return generic_target(event);
    };
    let entity_type = event
        .data
        .first_str(&["entity_type", "artifact_type"])
        .unwrap_or("entity");
    let label = event
        .data
        .str_field("name")
        .unwrap_or(ident)
        .to_string();
    Target::new(
        format!("entity:{entity_type}:{ident}"),
        label,
        event.data.str_field("description").map(str::to_string),
    )
}

fn fragment_target(event: &Event) -> Target {
    let ident = event
        .data
        .first_str(&["fragment_id", "fragment_path"])
        .unwrap_or(event.event_type.as_str());
    let label = event
        .data
        .first_str(&["fragment_path", "fragment_id"])
        .map_or_else(|| event.event_type.humanized(), str::to_string);
    Target::new(format!("fragment:{ident}"), label, None)
}

fn validation_target(event: &Event) -> Target {
    let id = event
        .data
        .first_str(&["validation_id", "run_id"])
        .unwrap_or(&event.id);
    Target::new(
        format!("validation:{id}"),
        format!("Validation {id}"),
        event.data.str_field("summary").map(str::to_string),
    )
}

fn version_target(event: &Event) -> Target {
    let id = event
        .data
        .first_str(&["version_id", "version"])
        .unwrap_or(&event.id);
    Target::new(
        format!("version:{id}"),
        format!("Version {id}"),
        event.data.str_field("label").map(str::to_string),
    )
}

fn git_push_target(event: &Event) -> Target {
    let repo = event
        .data
        .first_str(&["repo", "repository"])
        .unwrap_or("unknown");
    let branch = event.data.first_str(&["branch", "ref"]).unwrap_or("unknown");
    Target::new(
        format!("git-push:{repo}:{branch}"),
        format!("Push to {repo}/{branch}"),
        None,
    )
}

fn git_merge_target(event: &Event) -> Target {
    let repo = event
        .data
        .first_str(&["repo", "repository"])
        .unwrap_or("unknown");
    let target_branch = event
        .data
        .first_str(&["target_branch", "into"])
        .unwrap_or("unknown");
    Target::new(
        format!("git-merge:{repo}:{target_branch}"),
        format!("Merge into {repo}/{target_branch}"),
        None,
    )
}

fn generic_target(event: &Event) -> Target {
    Target::new(
        format!("event-type:{}", event.event_type),
        event.event_type.humanized(),
        None,
    )
}

// ---------------------------------------------------------------------------
// Reference-following for history-mutation events
// ---------------------------------------------------------------------------

/// Payload field names a history-mutation event may reference other events
/// through, checked in order: direct id, embedded snapshot, id array.
struct ReferenceFields {
    direct: &'static [&'static str],
    embedded: &'static [&'static str],
    arrays: &'static [&'static str],
}

const HEAD_FIELDS: ReferenceFields = ReferenceFields {
    direct: &["head_event_id", "event_id"],
    embedded: &["head_event", "event"],
    arrays: &["event_ids"],
};

const REVERT_FIELDS: ReferenceFields = ReferenceFields {
    direct: &["event_id"],
    embedded: &["event"],
    arrays: &["event_ids", "reverted_event_ids", "events"],
};

const REAPPLY_FIELDS: ReferenceFields = ReferenceFields {
    direct: &["event_id"],
    embedded: &["event"],
    arrays: &["event_ids", "reapplied_event_ids", "events"],
};

fn resolve_reference(
    event: &Event,
    lookup: &dyn EventLookup,
    seen: &mut HashSet<String>,
) -> Target {
    let fields = match event.event_type {
        EventType::EventHeadUpdated => &HEAD_FIELDS,
        EventType::EventsReverted => &REVERT_FIELDS,
        _ => &REAPPLY_FIELDS,
    };

    for key in fields.direct {
        if let Some(id) = event.data.str_field(key) {
            if seen.contains(id) {
                return timeline_fallback(event);
            }
            if let Some(referenced) = lookup.event(id) {
                seen.insert(id.to_string());
                return resolve_with_seen(referenced, lookup, seen);
            }
        }
    }

    for key in fields.embedded {
        if let Some(snapshot) = event.data.object_field::<Event>(key) {
            if seen.contains(&snapshot.id) {
                return timeline_fallback(event);
            }
            seen.insert(snapshot.id.clone());
            return resolve_with_seen(&snapshot, lookup, seen);
        }
    }

    for key in fields.arrays {
        for id in event.data.id_list(key) {
            if seen.contains(id) {
                return timeline_fallback(event);
            }
            if let Some(referenced) = lookup.event(id) {
                seen.insert(id.to_string());
                return resolve_with_seen(referenced, lookup, seen);
            }
        }
    }

    timeline_fallback(event)
}

/// Generic target for a history mutation whose references resolve nowhere.
fn timeline_fallback(event: &Event) -> Target {
    Target::new(
        format!("timeline:{}", event.event_type),
        "Timeline update".to_string(),
        Some(event.event_type.humanized()),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

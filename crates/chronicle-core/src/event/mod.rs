//! Event data model for the project journal.
//!
//! An [`Event`] is one line of the append-only audit log: something that
//! happened in a project, stamped with a server-issued id and creation
//! time. Events are immutable once recorded except for the activity pair
//! (`is_active`, `reverted_at`), which only revert/restore operations and
//! server-confirmed snapshots may revise.

pub mod payload;
pub mod types;

pub use payload::Payload;
pub use types::EventType;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single recorded event.
///
/// # Activity
///
/// `is_active` distinguishes events that still contribute to the live
/// state from events rolled back by a revert. `reverted_at` is set **iff**
/// the event was explicitly deactivated by a revert; an event merely
/// superseded by a newer active event in its group keeps `reverted_at:
/// None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Server-issued id, globally unique within a project.
    pub id: String,

    /// The project this event belongs to.
    #[serde(default)]
    pub project_id: String,

    /// What happened. Open set; see [`EventType`].
    pub event_type: EventType,

    /// Opaque payload owned by the server.
    #[serde(default)]
    pub data: Payload,

    /// Whether this event still contributes to the live state.
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// When the event was explicitly deactivated by a revert, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverted_at: Option<DateTime<Utc>>,

    /// Server-side creation time.
    pub created_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

impl Event {
    /// Canonical journal ordering: newest first, ties broken by id string
    /// comparison so that replicas agree on the order of same-instant
    /// events.
    #[must_use]
    pub fn cmp_journal(&self, other: &Self) -> Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| other.id.cmp(&self.id))
    }

    /// Whether this event carries everything a restore needs: an
    /// `entity_deleted` record with both a `snapshot` payload and an
    /// `artifact_id`.
    #[must_use]
    pub fn is_restorable(&self) -> bool {
        self.event_type == EventType::EntityDeleted
            && self.data.contains_key("snapshot")
            && self.data.str_field("artifact_id").is_some()
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.created_at.to_rfc3339(),
            self.id,
            self.event_type,
            if self.is_active { "active" } else { "inactive" },
        )
    }
}

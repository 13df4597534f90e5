//! Event type catalog for the project journal.
//!
//! The wire enumeration is an **open set**: the server is free to introduce
//! new event types at any time, and the journal must carry them through
//! grouping and display rather than reject them. Unknown strings are
//! preserved verbatim in the [`EventType::Other`] variant.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// The kind of thing an event records.
///
/// Known values map 1:1 to the server's wire strings. Anything the server
/// sends that is not in the catalog round-trips through [`Self::Other`]
/// unchanged and takes the generic grouping path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A content fragment was created.
    FragmentCreated,
    /// A content fragment was edited.
    FragmentUpdated,
    /// A content fragment was deleted.
    FragmentDeleted,
    /// A revision checkpoint of a fragment was recorded.
    FragmentRevisionCreated,
    /// A validation run started.
    ValidationStarted,
    /// A validation run finished successfully.
    ValidationCompleted,
    /// A validation run finished with failures.
    ValidationFailed,
    /// A project version was frozen.
    VersionFrozen,
    /// A git push was processed by the integration.
    GitPushProcessed,
    /// A git merge was processed by the integration.
    GitMergeProcessed,
    /// The journal head pointer moved.
    EventHeadUpdated,
    /// One or more events were deactivated.
    EventsReverted,
    /// Previously reverted events were reactivated.
    EventsReapplied,
    /// A project entity was created.
    EntityCreated,
    /// A project entity was deleted.
    EntityDeleted,
    /// A deleted entity was restored from a snapshot.
    EntityRestored,
    /// Any event type not in the catalog, carried verbatim.
    Other(String),
}

impl EventType {
    /// All catalogued event types, in wire order.
    pub const KNOWN: [Self; 16] = [
        Self::FragmentCreated,
        Self::FragmentUpdated,
        Self::FragmentDeleted,
        Self::FragmentRevisionCreated,
        Self::ValidationStarted,
        Self::ValidationCompleted,
        Self::ValidationFailed,
        Self::VersionFrozen,
        Self::GitPushProcessed,
        Self::GitMergeProcessed,
        Self::EventHeadUpdated,
        Self::EventsReverted,
        Self::EventsReapplied,
        Self::EntityCreated,
        Self::EntityDeleted,
        Self::EntityRestored,
    ];

    /// Return the wire string for this event type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::FragmentCreated => "fragment_created",
            Self::FragmentUpdated => "fragment_updated",
            Self::FragmentDeleted => "fragment_deleted",
            Self::FragmentRevisionCreated => "fragment_revision_created",
            Self::ValidationStarted => "validation_started",
            Self::ValidationCompleted => "validation_completed",
            Self::ValidationFailed => "validation_failed",
            Self::VersionFrozen => "version_frozen",
            Self::GitPushProcessed => "git_push_processed",
            Self::GitMergeProcessed => "git_merge_processed",
            Self::EventHeadUpdated => "event_head_updated",
            Self::EventsReverted => "events_reverted",
            Self::EventsReapplied => "events_reapplied",
            Self::EntityCreated => "entity_created",
            Self::EntityDeleted => "entity_deleted",
            Self::EntityRestored => "entity_restored",
            Self::Other(raw) => raw,
        }
    }

    /// Whether this event mutates the history itself (head moves, reverts,
    /// reapplies) rather than a project entity.
    ///
    /// History-mutation events never define a grouping target of their own;
    /// they resolve to the target of the event(s) they reference.
    #[must_use]
    pub const fn is_history_mutation(&self) -> bool {
        matches!(
            self,
            Self::EventHeadUpdated | Self::EventsReverted | Self::EventsReapplied
        )
    }

    /// Whether this event is part of an entity's lifecycle.
    #[must_use]
    pub const fn is_entity_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::EntityCreated | Self::EntityDeleted | Self::EntityRestored
        )
    }

    /// Whether this event touches a content fragment.
    #[must_use]
    pub const fn is_fragment(&self) -> bool {
        matches!(
            self,
            Self::FragmentCreated
                | Self::FragmentUpdated
                | Self::FragmentDeleted
                | Self::FragmentRevisionCreated
        )
    }

    /// Human-facing label derived from the wire string, e.g.
    /// `entity_created` → `Entity created`.
    #[must_use]
    pub fn humanized(&self) -> String {
        let raw = self.as_str();
        let mut out = String::with_capacity(raw.len());
        for (i, part) in raw.split('_').enumerate() {
            if i > 0 {
                out.push(' ');
            }
            if i == 0 {
                let mut chars = part.chars();
                if let Some(first) = chars.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                }
            } else {
                out.push_str(part);
            }
        }
        out
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventType {
    /// Conversion never fails: unrecognised strings become [`Self::Other`].
    fn from(s: &str) -> Self {
        match s {
            "fragment_created" => Self::FragmentCreated,
            "fragment_updated" => Self::FragmentUpdated,
            "fragment_deleted" => Self::FragmentDeleted,
            "fragment_revision_created" => Self::FragmentRevisionCreated,
            "validation_started" => Self::ValidationStarted,
            "validation_completed" => Self::ValidationCompleted,
            "validation_failed" => Self::ValidationFailed,
            "version_frozen" => Self::VersionFrozen,
            "git_push_processed" => Self::GitPushProcessed,
            "git_merge_processed" => Self::GitMergeProcessed,
            "event_head_updated" => Self::EventHeadUpdated,
            "events_reverted" => Self::EventsReverted,
            "events_reapplied" => Self::EventsReapplied,
            "entity_created" => Self::EntityCreated,
            "entity_deleted" => Self::EntityDeleted,
            "entity_restored" => Self::EntityRestored,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for EventType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

// Custom serde: the wire representation is the plain string.
impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

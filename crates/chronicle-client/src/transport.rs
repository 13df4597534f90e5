//! Transport seam between the journal and the server.
//!
//! The journal never owns HTTP plumbing; it talks through this trait. The
//! production implementation lives with the application's API client, and
//! tests script an in-memory one.

use async_trait::async_trait;
use chronicle_core::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// The server's authoritative journal snapshot for a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventsSnapshot {
    /// All events the server knows for the project.
    #[serde(default)]
    pub events: Vec<Event>,

    /// The head pointer; `None` means every event is treated as active.
    #[serde(default)]
    pub head_event_id: Option<String>,

    /// The head event itself, when the server includes it.
    #[serde(default)]
    pub head_event: Option<Event>,
}

/// Body of an entity-restore call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreRequest {
    /// The entity state captured when the entity was deleted.
    pub snapshot: Value,
    /// The deletion event being restored from.
    pub event_id: String,
}

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Failure of a transport call.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The call never completed (connection, timeout, 5xx).
    #[error("network failure during {operation}: {message}")]
    Network {
        operation: &'static str,
        message: String,
    },

    /// The server understood the call and said no (4xx, domain conflict).
    #[error("server rejected {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// JournalTransport
// ---------------------------------------------------------------------------

/// Server operations the journal depends on.
///
/// All calls are awaited; none of them may mutate local journal state —
/// the journal applies effects only after a call returns successfully.
#[async_trait]
pub trait JournalTransport: Send + Sync {
    /// Fetch the authoritative snapshot for a project.
    async fn fetch_events(&self, project_id: &str) -> Result<EventsSnapshot, TransportError>;

    /// Persist the head pointer. `None` clears it.
    async fn set_head(
        &self,
        project_id: &str,
        head_event_id: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Deactivate the named events, all-or-nothing.
    async fn revert_events(
        &self,
        project_id: &str,
        event_ids: &[String],
    ) -> Result<(), TransportError>;

    /// Recreate an entity from a deletion snapshot.
    async fn restore_entity(
        &self,
        project_id: &str,
        artifact_id: &str,
        request: &RestoreRequest,
    ) -> Result<(), TransportError>;
}

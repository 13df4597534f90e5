//! Normalization of realtime push messages into canonical events.
//!
//! Realtime payloads are heterogeneous: field names drift (`created_at` vs
//! `timestamp`), optional fields go missing, and delivery is neither
//! ordered nor complete. Normalization is deliberately forgiving — the only
//! hard requirements are a usable id and event type; everything else has a
//! default. Messages that fail those requirements are dropped and logged,
//! never surfaced: they are frequent and non-fatal.

use chrono::{DateTime, Utc};
use chronicle_core::event::{Event, EventType, Payload};
use chronicle_core::store::EventStore;
use serde::Deserialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// RealtimeMessage
// ---------------------------------------------------------------------------

/// A push notification as delivered by the realtime channel.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeMessage {
    /// The channel's message type; doubles as the event type when the
    /// event body does not carry one.
    #[serde(rename = "type")]
    pub kind: String,

    /// The project the message belongs to.
    #[serde(rename = "projectId", alias = "project_id")]
    pub project_id: String,

    /// The raw event body.
    #[serde(default)]
    pub event: Value,
}

// ---------------------------------------------------------------------------
// NormalizeError
// ---------------------------------------------------------------------------

/// Why a realtime message was not turned into an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The message belongs to a different project; ignored by scoping.
    #[error("message for project {got} ignored; journal is scoped to {expected}")]
    ProjectMismatch { expected: String, got: String },

    /// No usable event id.
    #[error("message dropped: no usable event id")]
    MissingId,

    /// No usable event type.
    #[error("message dropped: no usable event type")]
    MissingEventType,
}

// ---------------------------------------------------------------------------
// RealtimeIngestor
// ---------------------------------------------------------------------------

/// Converts push payloads into [`Event`]s and applies them to a store.
#[derive(Debug, Clone)]
pub struct RealtimeIngestor {
    project_id: String,
}

impl RealtimeIngestor {
    /// Ingestor scoped to one project. Messages for any other project are
    /// rejected before normalization.
    #[must_use]
    pub const fn new(project_id: String) -> Self {
        Self { project_id }
    }

    /// Normalize a raw message into a canonical event.
    ///
    /// `received_at` stands in for a missing or unparseable creation time;
    /// late-arriving events still land somewhere deterministic in the
    /// order.
    ///
    /// # Errors
    ///
    /// [`NormalizeError`] when the message is out of scope or lacks a
    /// usable id or event type.
    pub fn normalize(
        &self,
        message: &RealtimeMessage,
        received_at: DateTime<Utc>,
    ) -> Result<Event, NormalizeError> {
        if message.project_id != self.project_id {
            return Err(NormalizeError::ProjectMismatch {
                expected: self.project_id.clone(),
                got: message.project_id.clone(),
            });
        }

        let body = message.event.as_object();

        let id = body
            .and_then(|b| b.get("id"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(NormalizeError::MissingId)?;

        let type_str = body
            .and_then(|b| b.get("event_type").or_else(|| b.get("type")))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(&message.kind);
        if type_str.is_empty() {
            return Err(NormalizeError::MissingEventType);
        }

        let created_at = body
            .and_then(|b| b.get("created_at").or_else(|| b.get("timestamp")))
            .and_then(parse_timestamp)
            .unwrap_or(received_at);

        let reverted_at = body
            .and_then(|b| b.get("reverted_at"))
            .and_then(parse_timestamp);

        let is_active = body
            .and_then(|b| b.get("is_active"))
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let data = body
            .and_then(|b| b.get("data"))
            .cloned()
            .map(Payload::from_value)
            .unwrap_or_default();

        Ok(Event {
            id: id.to_string(),
            project_id: self.project_id.clone(),
            event_type: EventType::from(type_str),
            data,
            is_active,
            reverted_at,
            created_at,
        })
    }

    /// Normalize and apply a message to the store.
    ///
    /// On an `entity_restored` event referencing a known deletion, the
    /// referenced event is flipped inactive first so the target never has
    /// two competing current states. Returns whether the event's id was
    /// new to the store.
    ///
    /// # Errors
    ///
    /// Propagates [`NormalizeError`] from [`Self::normalize`]; the store
    /// is untouched in that case.
    pub fn apply(
        &self,
        store: &mut EventStore,
        message: &RealtimeMessage,
        received_at: DateTime<Utc>,
    ) -> Result<bool, NormalizeError> {
        let event = self.normalize(message, received_at)?;

        if event.event_type == EventType::EntityRestored {
            if let Some(source_id) = event.data.str_field("restored_from_event_id") {
                if store.deactivate(source_id, None) {
                    tracing::debug!(
                        event_id = %event.id,
                        source_id = %source_id,
                        "restore superseded the referenced deletion"
                    );
                }
            }
        }

        let fresh = store.upsert_realtime(event);
        Ok(fresh)
    }
}

/// Parse the timestamp shapes the channel actually produces: RFC 3339
/// strings, or nothing.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

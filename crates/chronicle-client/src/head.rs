//! Head-pointer control: set-head, revert, restore.
//!
//! The head pointer is server-owned; this controller mirrors it and issues
//! the mutations that move history backward and forward. Nothing here is
//! optimistic: `is_active`/`reverted_at` change locally only after the
//! server confirms, and every failure path leaves the store exactly as it
//! was.
//!
//! Concurrency: an in-flight marker keyed by event id blocks a second
//! revert/restore for the *same* event while the first is still on the
//! wire; requests for different ids proceed independently.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use chronicle_core::event::Event;
use chronicle_core::store::{EventStore, MergeStats};
use parking_lot::Mutex;

use crate::error::JournalError;
use crate::transport::{JournalTransport, RestoreRequest, TransportError};

// ---------------------------------------------------------------------------
// HeadState
// ---------------------------------------------------------------------------

/// Mirror of the server's head pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadState {
    /// No head set; every event is treated as active.
    NoHead,
    /// History is viewed as of the named event.
    AtHead(String),
}

impl HeadState {
    /// The head event id, if one is set.
    #[must_use]
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::NoHead => None,
            Self::AtHead(id) => Some(id),
        }
    }

    fn from_pointer(pointer: Option<String>) -> Self {
        pointer.map_or(Self::NoHead, Self::AtHead)
    }
}

// ---------------------------------------------------------------------------
// HeadController
// ---------------------------------------------------------------------------

/// Issues history mutations and keeps the store reconciled with the
/// server's answer.
pub struct HeadController {
    project_id: String,
    transport: Arc<dyn JournalTransport>,
    store: Arc<Mutex<EventStore>>,
    head: Mutex<HeadState>,
    in_flight: Mutex<HashSet<String>>,
}

impl HeadController {
    #[must_use]
    pub fn new(
        project_id: String,
        transport: Arc<dyn JournalTransport>,
        store: Arc<Mutex<EventStore>>,
    ) -> Self {
        Self {
            project_id,
            transport,
            store,
            head: Mutex::new(HeadState::NoHead),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Current mirror of the server head pointer.
    #[must_use]
    pub fn state(&self) -> HeadState {
        self.head.lock().clone()
    }

    /// Adopt a server-confirmed head pointer without any network call.
    pub fn adopt(&self, pointer: Option<String>) {
        *self.head.lock() = HeadState::from_pointer(pointer);
    }

    /// Fetch the authoritative snapshot, merge it, and adopt its head
    /// pointer.
    ///
    /// # Errors
    ///
    /// [`JournalError::Transport`] if the fetch fails; the store is left
    /// unchanged.
    pub async fn reconcile(&self) -> Result<MergeStats, JournalError> {
        let snapshot = self
            .transport
            .fetch_events(&self.project_id)
            .await
            .map_err(transport_error)?;

        let stats = self.store.lock().merge(snapshot.events);
        self.adopt(snapshot.head_event_id);
        tracing::debug!(
            project_id = %self.project_id,
            total = stats.total,
            added = stats.added,
            retained = stats.retained,
            "journal reconciled"
        );
        Ok(stats)
    }

    /// Persist a new head pointer, then refetch the authoritative journal.
    ///
    /// Idempotent; never itself mutates any event's activity. Activity
    /// revisions implied by the move arrive with the refetched snapshot.
    ///
    /// # Errors
    ///
    /// [`JournalError::Transport`] if the persist or the refetch fails.
    pub async fn set_head(&self, head_event_id: Option<&str>) -> Result<(), JournalError> {
        self.transport
            .set_head(&self.project_id, head_event_id)
            .await
            .map_err(transport_error)?;

        self.reconcile().await?;
        tracing::info!(
            project_id = %self.project_id,
            head = head_event_id.unwrap_or("none"),
            "head pointer moved"
        );
        Ok(())
    }

    /// Deactivate events, all-or-nothing, then refetch the journal.
    ///
    /// Reverted events remain in history and render nested under whatever
    /// event now supersedes them.
    ///
    /// # Errors
    ///
    /// - [`JournalError::RequestInFlight`] if any named id already has a
    ///   pending revert/restore.
    /// - [`JournalError::RevertConflict`] if the server rejects the call.
    /// - [`JournalError::Transport`] on network failure or a failed
    ///   refetch.
    pub async fn revert(&self, event_ids: &[String]) -> Result<(), JournalError> {
        if event_ids.is_empty() {
            return Ok(());
        }
        let _guard = InFlightGuard::acquire(&self.in_flight, event_ids)?;

        self.transport
            .revert_events(&self.project_id, event_ids)
            .await
            .map_err(|e| match e {
                TransportError::Rejected { message, .. } => JournalError::RevertConflict {
                    event_ids: event_ids.to_vec(),
                    message,
                },
                other @ TransportError::Network { .. } => transport_error(other),
            })?;

        // Server confirmed: stamp locally, then reconcile against the
        // authoritative snapshot.
        let reverted_at = Utc::now();
        {
            let mut store = self.store.lock();
            for id in event_ids {
                store.deactivate(id, Some(reverted_at));
            }
        }
        tracing::info!(
            project_id = %self.project_id,
            count = event_ids.len(),
            "events reverted"
        );

        self.reconcile().await?;
        Ok(())
    }

    /// Recreate the entity a deletion event captured, then mark that event
    /// inactive locally.
    ///
    /// Valid only for `entity_deleted` events carrying a `snapshot`
    /// payload and an `artifact_id`; anything else is reported
    /// synchronously with no network call. Conflicts with entities created
    /// after the deletion are owned by the persistence API.
    ///
    /// # Errors
    ///
    /// - [`JournalError::RestoreRequirement`] when the event cannot
    ///   satisfy a restore.
    /// - [`JournalError::RequestInFlight`] if this event already has a
    ///   pending request.
    /// - [`JournalError::Transport`] if the persistence call fails.
    pub async fn restore(&self, event: &Event) -> Result<(), JournalError> {
        use chronicle_core::event::EventType;

        if event.event_type != EventType::EntityDeleted {
            return Err(JournalError::RestoreRequirement {
                event_id: event.id.clone(),
                requirement: "an entity_deleted event",
            });
        }
        let Some(snapshot) = event.data.get("snapshot").cloned() else {
            return Err(JournalError::RestoreRequirement {
                event_id: event.id.clone(),
                requirement: "a snapshot payload",
            });
        };
        let Some(artifact_id) = event.data.str_field("artifact_id") else {
            return Err(JournalError::RestoreRequirement {
                event_id: event.id.clone(),
                requirement: "an artifact id",
            });
        };

        let ids = [event.id.clone()];
        let _guard = InFlightGuard::acquire(&self.in_flight, &ids)?;

        let request = RestoreRequest {
            snapshot,
            event_id: event.id.clone(),
        };
        self.transport
            .restore_entity(&self.project_id, artifact_id, &request)
            .await
            .map_err(transport_error)?;

        // The deletion is superseded by the recreated entity, not
        // reverted: no revert stamp.
        self.store.lock().deactivate(&event.id, None);
        tracing::info!(
            project_id = %self.project_id,
            event_id = %event.id,
            artifact_id = %artifact_id,
            "entity restored from deletion snapshot"
        );
        Ok(())
    }

    /// Whether a revert/restore for this event id is currently on the
    /// wire.
    #[must_use]
    pub fn is_in_flight(&self, event_id: &str) -> bool {
        self.in_flight.lock().contains(event_id)
    }
}

fn transport_error(error: TransportError) -> JournalError {
    match error {
        TransportError::Network { operation, message }
        | TransportError::Rejected { operation, message } => {
            JournalError::Transport { operation, message }
        }
    }
}

// ---------------------------------------------------------------------------
// InFlightGuard
// ---------------------------------------------------------------------------

/// RAII marker for ids with a pending mutation; releases on drop even when
/// the transport call fails.
#[derive(Debug)]
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    ids: Vec<String>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, ids: &[String]) -> Result<Self, JournalError> {
        let mut guard = set.lock();
        if let Some(contended) = ids.iter().find(|id| guard.contains(*id)) {
            return Err(JournalError::RequestInFlight {
                event_id: contended.clone(),
            });
        }
        for id in ids {
            guard.insert(id.clone());
        }
        Ok(Self {
            set,
            ids: ids.to_vec(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut guard = self.set.lock();
        for id in &self.ids {
            guard.remove(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use chronicle_core::event::{EventType, Payload};
    use chronicle_core::store::EventStore;
    use serde_json::{Value, json};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn make_event(id: &str, event_type: &str, secs: i64, data: Value) -> Event {
        Event {
            id: id.to_string(),
            project_id: "proj-1".to_string(),
            event_type: EventType::from(event_type),
            data: Payload::from_value(data),
            is_active: true,
            reverted_at: None,
            created_at: at(secs),
        }
    }

    /// Transport double that mimics a compliant server: reverts mutate the
    /// snapshot it serves back.
    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        events: Vec<Event>,
        head_event_id: Option<String>,
        reject_revert: bool,
        fail_network: bool,
        restore_calls: Vec<(String, RestoreRequest)>,
        set_head_calls: usize,
        fetch_calls: usize,
    }

    impl ScriptedTransport {
        fn with_events(events: Vec<Event>) -> Self {
            let transport = Self::default();
            transport.state.lock().events = events;
            transport
        }
    }

    #[async_trait]
    impl JournalTransport for ScriptedTransport {
        async fn fetch_events(
            &self,
            _project_id: &str,
        ) -> Result<crate::transport::EventsSnapshot, TransportError> {
            let mut state = self.state.lock();
            if state.fail_network {
                return Err(TransportError::Network {
                    operation: "fetch_events",
                    message: "offline".into(),
                });
            }
            state.fetch_calls += 1;
            Ok(crate::transport::EventsSnapshot {
                events: state.events.clone(),
                head_event_id: state.head_event_id.clone(),
                head_event: None,
            })
        }

        async fn set_head(
            &self,
            _project_id: &str,
            head_event_id: Option<&str>,
        ) -> Result<(), TransportError> {
            let mut state = self.state.lock();
            if state.fail_network {
                return Err(TransportError::Network {
                    operation: "set_head",
                    message: "offline".into(),
                });
            }
            state.head_event_id = head_event_id.map(str::to_string);
            state.set_head_calls += 1;
            Ok(())
        }

        async fn revert_events(
            &self,
            _project_id: &str,
            event_ids: &[String],
        ) -> Result<(), TransportError> {
            let mut state = self.state.lock();
            if state.fail_network {
                return Err(TransportError::Network {
                    operation: "revert_events",
                    message: "offline".into(),
                });
            }
            if state.reject_revert {
                return Err(TransportError::Rejected {
                    operation: "revert_events",
                    message: "already reverted".into(),
                });
            }
            let now = Utc
                .timestamp_opt(9_000, 0)
                .single()
                .expect("valid timestamp");
            for event in &mut state.events {
                if event_ids.contains(&event.id) {
                    event.is_active = false;
                    event.reverted_at = Some(now);
                }
            }
            Ok(())
        }

        async fn restore_entity(
            &self,
            _project_id: &str,
            artifact_id: &str,
            request: &RestoreRequest,
        ) -> Result<(), TransportError> {
            let mut state = self.state.lock();
            if state.fail_network {
                return Err(TransportError::Network {
                    operation: "restore_entity",
                    message: "offline".into(),
                });
            }
            state
                .restore_calls
                .push((artifact_id.to_string(), request.clone()));
            Ok(())
        }
    }

    fn controller_with(
        transport: Arc<ScriptedTransport>,
        events: Vec<Event>,
    ) -> (HeadController, Arc<Mutex<EventStore>>) {
        let store = Arc::new(Mutex::new(EventStore::new()));
        store.lock().merge(events);
        let controller =
            HeadController::new("proj-1".to_string(), transport, Arc::clone(&store));
        (controller, store)
    }

    #[tokio::test]
    async fn set_head_persists_and_adopts_pointer() {
        let events = vec![make_event("e1", "entity_created", 100, json!({"entity_id": "x"}))];
        let transport = Arc::new(ScriptedTransport::with_events(events.clone()));
        let (controller, _store) = controller_with(Arc::clone(&transport), events);

        controller.set_head(Some("e1")).await.expect("set head");
        assert_eq!(controller.state(), HeadState::AtHead("e1".to_string()));
        assert_eq!(transport.state.lock().set_head_calls, 1);
        // Refetched after the persist.
        assert_eq!(transport.state.lock().fetch_calls, 1);
    }

    #[tokio::test]
    async fn set_head_to_none_clears_pointer() {
        let transport = Arc::new(ScriptedTransport::default());
        let (controller, _store) = controller_with(Arc::clone(&transport), vec![]);
        controller.adopt(Some("e1".to_string()));

        controller.set_head(None).await.expect("clear head");
        assert_eq!(controller.state(), HeadState::NoHead);
    }

    #[tokio::test]
    async fn revert_stamps_locally_and_reconciles() {
        let events = vec![
            make_event("e1", "entity_created", 100, json!({"entity_id": "x"})),
            make_event("e2", "entity_deleted", 200, json!({"entity_id": "x"})),
        ];
        let transport = Arc::new(ScriptedTransport::with_events(events.clone()));
        let (controller, store) = controller_with(Arc::clone(&transport), events);

        controller
            .revert(&["e2".to_string()])
            .await
            .expect("revert");

        let store = store.lock();
        let event = store.get("e2").expect("known id");
        assert!(!event.is_active);
        assert!(event.reverted_at.is_some());
        assert!(store.get("e1").expect("known id").is_active);
    }

    #[tokio::test]
    async fn rejected_revert_leaves_store_unchanged() {
        let events = vec![make_event("e1", "entity_created", 100, json!({"entity_id": "x"}))];
        let transport = Arc::new(ScriptedTransport::with_events(events.clone()));
        transport.state.lock().reject_revert = true;
        let (controller, store) = controller_with(Arc::clone(&transport), events);

        let err = controller
            .revert(&["e1".to_string()])
            .await
            .expect_err("rejected");
        assert!(matches!(err, JournalError::RevertConflict { .. }));
        assert!(store.lock().get("e1").expect("known id").is_active);
        // Marker released after the failure.
        assert!(!controller.is_in_flight("e1"));
    }

    #[tokio::test]
    async fn network_failure_maps_to_transport_error() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.state.lock().fail_network = true;
        let (controller, _store) = controller_with(Arc::clone(&transport), vec![]);

        let err = controller
            .revert(&["e1".to_string()])
            .await
            .expect_err("offline");
        assert!(matches!(err, JournalError::Transport { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn revert_of_nothing_is_a_noop() {
        let transport = Arc::new(ScriptedTransport::default());
        let (controller, _store) = controller_with(Arc::clone(&transport), vec![]);
        controller.revert(&[]).await.expect("noop");
        assert_eq!(transport.state.lock().fetch_calls, 0);
    }

    #[tokio::test]
    async fn restore_round_trip() {
        let deletion = make_event(
            "del-1",
            "entity_deleted",
            200,
            json!({
                "entity_id": "x",
                "artifact_id": "art-7",
                "snapshot": {"name": "Mira", "role": "captain"},
            }),
        );
        let transport = Arc::new(ScriptedTransport::default());
        let (controller, store) = controller_with(Arc::clone(&transport), vec![deletion.clone()]);

        controller.restore(&deletion).await.expect("restore");

        {
            let state = transport.state.lock();
            assert_eq!(state.restore_calls.len(), 1);
            assert_eq!(state.restore_calls[0].0, "art-7");
            assert_eq!(state.restore_calls[0].1.snapshot["name"], "Mira");
            assert_eq!(state.restore_calls[0].1.event_id, "del-1");
        }

        let store = store.lock();
        let event = store.get("del-1").expect("known id");
        assert!(!event.is_active);
        assert!(event.reverted_at.is_none());
    }

    #[tokio::test]
    async fn restore_requires_entity_deleted() {
        let event = make_event("e1", "entity_created", 100, json!({"entity_id": "x"}));
        let transport = Arc::new(ScriptedTransport::default());
        let (controller, _store) = controller_with(Arc::clone(&transport), vec![event.clone()]);

        let err = controller.restore(&event).await.expect_err("wrong type");
        assert!(matches!(err, JournalError::RestoreRequirement { .. }));
        assert!(transport.state.lock().restore_calls.is_empty());
    }

    #[tokio::test]
    async fn restore_requires_snapshot_and_artifact() {
        let transport = Arc::new(ScriptedTransport::default());
        let (controller, _store) = controller_with(Arc::clone(&transport), vec![]);

        let no_snapshot = make_event(
            "d1",
            "entity_deleted",
            100,
            json!({"artifact_id": "art-1"}),
        );
        let err = controller
            .restore(&no_snapshot)
            .await
            .expect_err("no snapshot");
        assert!(err.to_string().contains("snapshot"));

        let no_artifact = make_event(
            "d2",
            "entity_deleted",
            100,
            json!({"snapshot": {"name": "x"}}),
        );
        let err = controller
            .restore(&no_artifact)
            .await
            .expect_err("no artifact");
        assert!(err.to_string().contains("artifact"));
        assert!(transport.state.lock().restore_calls.is_empty());
    }

    #[test]
    fn in_flight_guard_blocks_same_id_and_releases() {
        let set = Mutex::new(HashSet::new());
        let ids = ["e1".to_string(), "e2".to_string()];
        let guard = InFlightGuard::acquire(&set, &ids).expect("first acquire");

        let err = InFlightGuard::acquire(&set, &["e2".to_string()]).expect_err("contended");
        assert!(matches!(err, JournalError::RequestInFlight { .. }));

        // A different id is independent.
        let other =
            InFlightGuard::acquire(&set, &["e3".to_string()]).expect("independent acquire");
        drop(other);
        drop(guard);
        assert!(set.lock().is_empty());
    }

    #[test]
    fn head_state_event_id() {
        assert_eq!(HeadState::NoHead.event_id(), None);
        assert_eq!(
            HeadState::AtHead("e1".to_string()).event_id(),
            Some("e1")
        );
    }
}

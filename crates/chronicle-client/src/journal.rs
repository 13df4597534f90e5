//! The journal facade consumed by the application.
//!
//! One [`ProjectJournal`] per open project, with the project id threaded in
//! explicitly at construction — nothing here reads ambient "current
//! project" state. The facade wires the store, the realtime ingestor, and
//! the head controller together and exposes the grouped view plus the
//! mutation requests the presentation layer needs.
//!
//! # Write serialization
//!
//! Snapshot merges and realtime upserts race; both funnel through the one
//! store mutex, so writes serialize and readers always clone a coherent
//! snapshot before grouping.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use chronicle_core::group::{EventGroup, JournalSummary, group, summarize};
use chronicle_core::store::{EventStore, MergeStats};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::config::JournalConfig;
use crate::error::{JournalError, JournalErrorCode};
use crate::head::{HeadController, HeadState};
use crate::ingest::{NormalizeError, RealtimeIngestor, RealtimeMessage};
use crate::transport::JournalTransport;

/// Live journal for a single project.
pub struct ProjectJournal {
    project_id: String,
    config: JournalConfig,
    store: Arc<Mutex<EventStore>>,
    head: Arc<HeadController>,
    ingestor: RealtimeIngestor,
    expanded: Mutex<HashSet<String>>,
    detached: Arc<AtomicBool>,
    reconcile_task: Mutex<Option<JoinHandle<()>>>,
}

impl ProjectJournal {
    /// Journal scoped to `project_id`, talking through `transport`.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        transport: Arc<dyn JournalTransport>,
        config: JournalConfig,
    ) -> Self {
        let project_id = project_id.into();
        let store = Arc::new(Mutex::new(EventStore::new()));
        let head = Arc::new(HeadController::new(
            project_id.clone(),
            transport,
            Arc::clone(&store),
        ));
        Self {
            ingestor: RealtimeIngestor::new(project_id.clone()),
            project_id,
            config,
            store,
            head,
            expanded: Mutex::new(HashSet::new()),
            detached: Arc::new(AtomicBool::new(false)),
            reconcile_task: Mutex::new(None),
        }
    }

    /// The project this journal is scoped to.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Fetch and merge the authoritative snapshot, adopting its head
    /// pointer.
    ///
    /// # Errors
    ///
    /// [`JournalError::Transport`]; the store is left unchanged.
    pub async fn refresh(&self) -> Result<MergeStats, JournalError> {
        self.head.reconcile().await
    }

    /// Current mirror of the server head pointer.
    #[must_use]
    pub fn head_state(&self) -> HeadState {
        self.head.state()
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    /// The grouped, replayable view over a coherent store snapshot.
    #[must_use]
    pub fn groups(&self) -> Vec<EventGroup> {
        let snapshot = self.store.lock().clone();
        let events = snapshot.events();
        group(&events, &snapshot)
    }

    /// Summary counts over the grouped view.
    #[must_use]
    pub fn summary(&self) -> JournalSummary {
        summarize(&self.groups())
    }

    /// Flip a group's expansion state; returns the new state.
    pub fn toggle_group_expansion(&self, target_key: &str) -> bool {
        let mut expanded = self.expanded.lock();
        if expanded.remove(target_key) {
            false
        } else {
            expanded.insert(target_key.to_string());
            true
        }
    }

    #[must_use]
    pub fn is_group_expanded(&self, target_key: &str) -> bool {
        self.expanded.lock().contains(target_key)
    }

    // -----------------------------------------------------------------------
    // Realtime side
    // -----------------------------------------------------------------------

    /// Apply a realtime push message.
    ///
    /// Returns whether the message normalized into an event for this
    /// project. Malformed and out-of-scope messages are dropped and
    /// logged, never surfaced. Each applied message (re-)schedules the
    /// debounced reconciliation fetch: realtime delivery is neither
    /// ordered nor complete, so the authoritative snapshot has the last
    /// word.
    pub fn apply_realtime(&self, message: &RealtimeMessage) -> bool {
        if self.detached.load(Ordering::SeqCst) {
            tracing::trace!(project_id = %self.project_id, "journal detached; realtime ignored");
            return false;
        }

        let received_at = Utc::now();
        let applied = {
            let mut store = self.store.lock();
            self.ingestor.apply(&mut store, message, received_at)
        };

        match applied {
            Ok(fresh) => {
                tracing::debug!(
                    project_id = %self.project_id,
                    kind = %message.kind,
                    fresh,
                    "realtime event applied"
                );
                self.schedule_reconcile();
                true
            }
            Err(NormalizeError::ProjectMismatch { expected, got }) => {
                tracing::trace!(expected = %expected, got = %got, "realtime message out of scope");
                false
            }
            Err(reason) => {
                tracing::debug!(
                    code = %JournalErrorCode::MalformedMessage,
                    kind = %message.kind,
                    %reason,
                    "realtime message dropped"
                );
                false
            }
        }
    }

    /// Schedule (or push back) the debounced reconciliation fetch.
    ///
    /// Without a tokio runtime on the calling thread this is a no-op; the
    /// next explicit [`Self::refresh`] covers reconciliation.
    fn schedule_reconcile(&self) {
        if !self.config.auto_reconcile {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no async runtime; skipping scheduled reconciliation");
            return;
        };

        let head = Arc::clone(&self.head);
        let detached = Arc::clone(&self.detached);
        let debounce = Duration::from_millis(self.config.reconcile_debounce_ms);
        let task = handle.spawn(async move {
            tokio::time::sleep(debounce).await;
            if detached.load(Ordering::SeqCst) {
                return;
            }
            if let Err(error) = head.reconcile().await {
                tracing::warn!(%error, "debounced reconciliation failed");
            }
        });

        if let Some(previous) = self.reconcile_task.lock().replace(task) {
            previous.abort();
        }
    }

    // -----------------------------------------------------------------------
    // Mutation requests
    // -----------------------------------------------------------------------

    /// Revert events; see [`HeadController::revert`].
    ///
    /// # Errors
    ///
    /// Propagates the controller's [`JournalError`]s.
    pub async fn request_revert(&self, event_ids: &[String]) -> Result<(), JournalError> {
        self.head.revert(event_ids).await
    }

    /// Restore an entity from a deletion event; see
    /// [`HeadController::restore`].
    ///
    /// # Errors
    ///
    /// Propagates the controller's [`JournalError`]s.
    pub async fn request_restore(
        &self,
        event: &chronicle_core::Event,
    ) -> Result<(), JournalError> {
        self.head.restore(event).await
    }

    /// Move or clear the head pointer; see [`HeadController::set_head`].
    ///
    /// # Errors
    ///
    /// Propagates the controller's [`JournalError`]s.
    pub async fn request_set_head(&self, head_event_id: Option<&str>) -> Result<(), JournalError> {
        self.head.set_head(head_event_id).await
    }

    /// Whether a revert/restore for this event id is currently on the
    /// wire.
    #[must_use]
    pub fn is_in_flight(&self, event_id: &str) -> bool {
        self.head.is_in_flight(event_id)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Stop applying realtime messages for this project.
    ///
    /// Pending debounced reconciliation is cancelled; mutation calls
    /// already in flight are **not** aborted — their outcome reconciles on
    /// the next snapshot fetch.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
        if let Some(task) = self.reconcile_task.lock().take() {
            task.abort();
        }
        tracing::debug!(project_id = %self.project_id, "journal detached");
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }
}

impl Drop for ProjectJournal {
    fn drop(&mut self) {
        if let Some(task) = self.reconcile_task.lock().take() {
            task.abort();
        }
    }
}

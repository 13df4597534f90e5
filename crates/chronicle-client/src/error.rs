//! Journal error surface.
//!
//! Nothing here is fatal to the application. The worst case is a stale or
//! incomplete view, never a corrupted one: activity flags are only ever
//! applied after server confirmation, and every failure leaves the store
//! untouched.

use std::fmt;

// ---------------------------------------------------------------------------
// JournalError
// ---------------------------------------------------------------------------

/// Errors surfaced by journal operations.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// The snapshot fetch or a mutation call failed at the network layer.
    /// Recovered via retry; the store is left unchanged.
    #[error("transport failure during {operation}: {message}")]
    Transport {
        /// The operation that failed (`fetch_events`, `set_head`, ...).
        operation: &'static str,
        /// Transport-level detail.
        message: String,
    },

    /// A restore was requested for an event that cannot satisfy it.
    /// Reported synchronously; no network call is made.
    #[error("cannot restore from event {event_id}: missing {requirement}")]
    RestoreRequirement {
        /// The event the restore was requested for.
        event_id: String,
        /// What the event lacked.
        requirement: &'static str,
    },

    /// The server rejected a revert (e.g. already reverted). Local state is
    /// unchanged and reconciles on the next fetch.
    #[error("server rejected revert of [{}]: {message}", event_ids.join(", "))]
    RevertConflict {
        /// The ids the rejected call named.
        event_ids: Vec<String>,
        /// Server-side detail.
        message: String,
    },

    /// A revert or restore for this event id is still in flight.
    #[error("a request for event {event_id} is already in flight")]
    RequestInFlight {
        /// The contended event id.
        event_id: String,
    },
}

impl JournalError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> JournalErrorCode {
        match self {
            Self::Transport { .. } => JournalErrorCode::Transport,
            Self::RestoreRequirement { .. } => JournalErrorCode::RestoreRequirement,
            Self::RevertConflict { .. } => JournalErrorCode::RevertConflict,
            Self::RequestInFlight { .. } => JournalErrorCode::RequestInFlight,
        }
    }

    /// Whether retrying the same call can succeed without other action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RequestInFlight { .. })
    }
}

// ---------------------------------------------------------------------------
// JournalErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable error codes for operator tooling and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JournalErrorCode {
    Transport,
    MalformedMessage,
    RestoreRequirement,
    RevertConflict,
    RequestInFlight,
}

impl JournalErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Transport => "E1001",
            Self::MalformedMessage => "E2001",
            Self::RestoreRequirement => "E3001",
            Self::RevertConflict => "E3002",
            Self::RequestInFlight => "E3003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Transport => "Network call failed",
            Self::MalformedMessage => "Malformed realtime message",
            Self::RestoreRequirement => "Restore requirements not met",
            Self::RevertConflict => "Server rejected revert",
            Self::RequestInFlight => "Request already in flight",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::Transport => Some("Retry once the network recovers; local state is unchanged."),
            Self::MalformedMessage => None,
            Self::RestoreRequirement => {
                Some("Only entity deletions carrying a snapshot and an artifact id can be restored.")
            }
            Self::RevertConflict => {
                Some("Refresh the journal; the server's view of these events has moved on.")
            }
            Self::RequestInFlight => Some("Wait for the pending request on this event to settle."),
        }
    }
}

impl fmt::Display for JournalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

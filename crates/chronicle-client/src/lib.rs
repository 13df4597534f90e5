//! chronicle-client: everything between the core journal and the server.
//!
//! This crate owns the async surface of the journal: the transport seam
//! the application implements against its API client, the realtime
//! ingestor that normalizes push payloads, the head controller that issues
//! revert/restore/set-head mutations, and the [`ProjectJournal`] facade
//! the presentation layer consumes.
//!
//! The core invariant carried throughout: activity flags are never applied
//! optimistically. A failed call leaves the store untouched; the worst
//! case is a stale view, reconciled by the next snapshot fetch.

pub mod config;
pub mod error;
pub mod head;
pub mod ingest;
pub mod journal;
pub mod transport;

pub use config::JournalConfig;
pub use error::{JournalError, JournalErrorCode};
pub use head::{HeadController, HeadState};
pub use ingest::{NormalizeError, RealtimeIngestor, RealtimeMessage};
pub use journal::ProjectJournal;
pub use transport::{EventsSnapshot, JournalTransport, RestoreRequest, TransportError};

//! chronicle-core: event model, store, target resolution, and grouping.
//!
//! This crate is the deterministic heart of the journal. It knows nothing
//! about transports or runtimes: callers feed it server snapshots and
//! normalized realtime events, and read back a grouped, replayable view.
//!
//! - [`event`] — the [`Event`](event::Event) record, the open
//!   [`EventType`](event::EventType) catalog, and opaque payloads.
//! - [`store`] — the deduplicated, ordered [`EventStore`](store::EventStore)
//!   every write funnels through.
//! - [`resolve`] — resolution of events to the logical
//!   [`Target`](resolve::Target) they are about, with bounded
//!   reference-following.
//! - [`group`] — partitioning of the store into per-target
//!   [`EventGroup`](group::EventGroup)s plus summary counts.

pub mod event;
pub mod group;
pub mod resolve;
pub mod store;

pub use event::{Event, EventType, Payload};
pub use group::{EventGroup, JournalSummary, group, summarize};
pub use resolve::{EventLookup, Target, resolve};
pub use store::{EventStore, MergeStats};

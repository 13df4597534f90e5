//! End-to-end grouping scenarios over the store + resolver + grouping
//! pipeline, mirroring how the client layer drives the core.

use chrono::{DateTime, TimeZone, Utc};
use chronicle_core::event::{Event, EventType, Payload};
use chronicle_core::group::{group, summarize};
use chronicle_core::resolve::resolve;
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

#[test]
fn lone_creation_is_current_with_no_history() {
    let mut store = EventStore::new();
    store.merge(vec![make_event(
        "e1",
        "entity_created",
        100,
        json!({"entity_id": "x"}),
    )]);

    let events = store.events();
    let groups = group(&events, &store);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].current.id, "e1");
    assert!(groups[0].previous.is_empty());
}

#[test]
fn deletion_supersedes_creation_of_same_entity() {
    let mut store = EventStore::new();
    store.merge(vec![make_event(
        "e1",
        "entity_created",
        100,
        json!({"entity_id": "x"}),
    )]);
    assert!(store.upsert_realtime(make_event(
        "e2",
        "entity_deleted",
        200,
        json!({"entity_id": "x"}),
    )));

    let events = store.events();
    let groups = group(&events, &store);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].current.id, "e2");
    assert_eq!(groups[0].previous.len(), 1);
    assert_eq!(groups[0].previous[0].id, "e1");
}

#[test]
fn reverting_the_deletion_restores_the_creation_as_current() {
    let mut store = EventStore::new();
    store.merge(vec![
        make_event("e1", "entity_created", 100, json!({"entity_id": "x"})),
        make_event("e2", "entity_deleted", 200, json!({"entity_id": "x"})),
    ]);

    // Server-confirmed revert of the deletion.
    assert!(store.deactivate("e2", Some(at(300))));

    let events = store.events();
    let groups = group(&events, &store);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].current.id, "e1");
    assert_eq!(groups[0].previous[0].id, "e2");
    assert!(!groups[0].previous[0].is_active);
    assert_eq!(groups[0].previous[0].reverted_at, Some(at(300)));
}

#[test]
fn head_update_resolves_to_referenced_events_target() {
    let mut store = EventStore::new();
    store.merge(vec![
        make_event("e1", "entity_created", 100, json!({"entity_id": "x"})),
        make_event("h1", "event_head_updated", 200, json!({"head_event_id": "e1"})),
    ]);

    let head = store.get("h1").expect("known id");
    let target = resolve(head, &store);
    assert_eq!(target.key, "entity:entity:x");
    assert_ne!(target.label, "Timeline update");
}

#[test]
fn mixed_timeline_summary() {
    let mut store = EventStore::new();
    store.merge(vec![
        make_event("e1", "entity_created", 100, json!({"entity_id": "x"})),
        make_event("e2", "entity_deleted", 200, json!({"entity_id": "x"})),
        make_event("f1", "fragment_updated", 150, json!({"fragment_id": "f"})),
        make_event("v1", "validation_started", 300, json!({"validation_id": "run-1"})),
        make_event("v2", "validation_completed", 350, json!({"validation_id": "run-1"})),
    ]);
    store.deactivate("e2", Some(at(400)));

    let events = store.events();
    let groups = group(&events, &store);
    let summary = summarize(&groups);

    assert_eq!(groups.len(), 3);
    assert_eq!(summary.total, 5);
    assert_eq!(summary.active, 4);
    assert_eq!(summary.reverted, 1);
    assert_eq!(summary.stacks, 2);
}

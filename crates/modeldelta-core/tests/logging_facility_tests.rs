#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{build_app, node, record};
use modeldelta_core::errors::{DeltaError, MdErrorKind};
use modeldelta_core::logging_facility::test_capture::init_test_capture;
use modeldelta_core::modeldelta_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_ERR_CODE, FIELD_ERR_KIND, FIELD_SESSION_ID,
};
use modeldelta_core::{log_op_end, log_op_error, log_op_start, reconcile, ReconcileOptions};
use serde_json::json;
use tracing::Level;

#[test]
fn test_log_op_start_and_end_carry_fields() {
    let capture = init_test_capture();
    let op_name = "test_log_op_pair_unique_1";

    log_op_start!(op_name, entry_count = 3);
    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[0].field("entry_count"), Some("3"));
    assert_eq!(events[1].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[1].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_2";

    let err = DeltaError::unresolved("ghost");
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.level, Level::ERROR);
    assert_eq!(event.event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(
        event.field(FIELD_ERR_KIND),
        Some(format!("{:?}", MdErrorKind::UnresolvedElement).as_str())
    );
    assert_eq!(event.field(FIELD_ERR_CODE), Some("ERR_UNRESOLVED_ELEMENT"));
}

#[test]
fn test_reconcile_emits_pipeline_events() {
    let capture = init_test_capture();

    // GIVEN a document with one readable and one foreign entry
    let mut doc = record(|g| {
        let window = node(g, "main");
        g.set_attribute(window, "label", "logged").unwrap();
    });
    doc.entries.push(json!({
        "op": "set", "element": "main", "kind": "Window", "feature": "sparkle",
        "value": {"type": "bool", "value": true}
    }));

    // WHEN reconciling
    let mut target = build_app();
    reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN every stage logged its start and end
    for op in ["reconcile", "decode", "construct_deltas", "apply"] {
        capture.assert_event_exists(op, EVENT_START);
        capture.assert_event_exists(op, EVENT_END);
    }
    // AND the dropped entry was warned about
    let warnings = capture.count_events(|e| {
        e.level == Level::WARN
            && e.field("message")
                .is_some_and(|m| m.contains("dropping undecodable delta entry"))
    });
    assert!(warnings >= 1);
}

#[test]
fn test_reconcile_events_correlated_by_session() {
    let capture = init_test_capture();

    // GIVEN a recorded document
    let doc = record(|g| {
        let window = node(g, "main");
        g.set_attribute(window, "label", "correlated").unwrap();
    });
    let session = doc.session_id.to_string();

    // WHEN reconciling it
    let mut target = build_app();
    reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN the start event of each stage names the recording session
    for op in ["reconcile", "decode", "construct_deltas"] {
        let tagged = capture.count_events(|e| {
            e.op.as_deref() == Some(op)
                && e.event.as_deref() == Some(EVENT_START)
                && e.field(FIELD_SESSION_ID) == Some(session.as_str())
        });
        assert_eq!(tagged, 1, "no start event for {} tagged with the session", op);
    }
}

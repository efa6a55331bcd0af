#![allow(clippy::unwrap_used, clippy::expect_used)]

/// Scenario 9: Replaying nothing, and replaying twice
mod common;

use common::{build_app, ids, node, record};
use modeldelta_core::rules::validate_graph;
use modeldelta_core::{begin_recording, construct_deltas, reconcile, ElementKind, ReconcileOptions};

#[test]
fn test_scenario_09_empty_recording_is_a_no_op() {
    // GIVEN a session with no mutations
    let doc = record(|_| {});
    assert!(doc.is_empty());

    // WHEN reconciling
    let mut target = build_app();
    let status = reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN the target is unchanged
    assert!(status.is_ok());
    assert_eq!(target, build_app());
}

#[test]
fn test_scenario_09_second_replay_changes_nothing() {
    // GIVEN a recording with a rename, an insertion and a removal
    let doc = record(|g| {
        let window = node(g, "main");
        g.set_attribute(window, "label", "newName").unwrap();
        let stack = node(g, "stack");
        let d = g.create_with_id(ElementKind::Part, "D");
        g.insert(stack, "children", 2, d).unwrap();
        let a = node(g, "A");
        g.remove(stack, "children", a).unwrap();
    });

    // WHEN it is reconciled twice
    let mut target = build_app();
    reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();
    let once = target.clone();
    let status = reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN the second pass leaves the graph as the first one did
    assert!(status.is_ok(), "unexpected failures: {:?}", status.failures());
    assert_eq!(target, once);
    let stack = node(&target, "stack");
    assert_eq!(ids(&target, stack, "children"), ["B", "D", "C"]);
    assert!(validate_graph(&target).is_ok());
}

#[test]
fn test_scenario_09_recording_graph_already_matches() {
    // GIVEN a session whose graph already reflects its own changes
    let mut graph = build_app();
    let mut session = begin_recording(&graph);
    let window = node(&graph, "main");
    graph.set_attribute(window, "label", "newName").unwrap();
    let changes = session.changes(&graph);

    // WHEN constructing and applying its deltas against that same graph
    let plan = construct_deltas(&graph, &changes);
    let before = graph.clone();
    let status = plan.apply(&mut graph, &[]);

    // THEN nothing changes
    assert!(status.is_ok());
    assert_eq!(graph, before);
}

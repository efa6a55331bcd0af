#![allow(clippy::unwrap_used, clippy::expect_used)]

/// Scenario 2: Single-valued references
mod common;

use common::{build_app, node, record};
use modeldelta_core::errors::DeltaError;
use modeldelta_core::{reconcile, ElementKind, ReconcileOptions};

#[test]
fn test_scenario_02_happy_reference_retargeted() {
    // GIVEN a recording that points the save item at the open command
    let doc = record(|g| {
        let item = node(g, "saveItem");
        let open = node(g, "open");
        g.set_reference(item, "command", Some(open)).unwrap();
    });

    // WHEN reconciling onto a fresh model
    let mut target = build_app();
    let status = reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN the reference resolves to the target's own open command
    assert!(status.is_ok());
    assert_eq!(
        target.reference(node(&target, "saveItem"), "command"),
        Some(node(&target, "open"))
    );
}

#[test]
fn test_scenario_02_happy_reference_cleared() {
    // GIVEN a recording that clears the window selection
    let doc = record(|g| {
        let window = node(g, "main");
        g.set_reference(window, "selected_element", None).unwrap();
    });

    // WHEN reconciling
    let mut target = build_app();
    reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN the target selection is cleared
    assert_eq!(target.reference(node(&target, "main"), "selected_element"), None);
}

#[test]
fn test_scenario_02_reference_to_element_created_in_same_batch() {
    // GIVEN a recording that adds part D and selects it
    let doc = record(|g| {
        let stack = node(g, "stack");
        let d = g.create_with_id(ElementKind::Part, "D");
        g.append(stack, "children", d).unwrap();
        g.set_reference(stack, "selected_element", Some(d)).unwrap();
    });

    // WHEN reconciling
    let mut target = build_app();
    let status = reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN the selection points at the newly created part
    assert!(status.is_ok(), "unexpected failures: {:?}", status.failures());
    assert_eq!(
        target.reference(node(&target, "stack"), "selected_element"),
        Some(node(&target, "D"))
    );
}

#[test]
fn test_scenario_02_error_operand_missing_on_target() {
    // GIVEN a recording that points the save item at the open command
    let doc = record(|g| {
        let item = node(g, "saveItem");
        let open = node(g, "open");
        g.set_reference(item, "command", Some(open)).unwrap();
    });

    // AND a target that no longer contains the open command
    let mut target = build_app();
    let root = target.root();
    let open = node(&target, "open");
    target.remove(root, "commands", open).unwrap();

    // WHEN reconciling
    let status = reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN the set fails, and the reference is left as it was
    assert_eq!(status.failures().len(), 1);
    assert!(matches!(
        &status.failures()[0].error,
        DeltaError::UnresolvedElement { element_id } if element_id == "open"
    ));
    assert_eq!(
        target.reference(node(&target, "saveItem"), "command"),
        Some(node(&target, "save"))
    );
}

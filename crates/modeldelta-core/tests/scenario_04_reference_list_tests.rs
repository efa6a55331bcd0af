#![allow(clippy::unwrap_used, clippy::expect_used)]

/// Scenario 4: Reference lists
mod common;

use common::{build_app, ids, node, record, scratch_stack};
use modeldelta_core::ElementKind;
use modeldelta_core::{reconcile, ReconcileOptions};

#[test]
fn test_scenario_04_happy_append_and_remove() {
    // GIVEN activation order [A, B]; the user activates C and drops A
    let doc = record(|g| {
        let stack = node(g, "stack");
        let a = node(g, "A");
        let c = node(g, "C");
        g.append(stack, "activation_order", c).unwrap();
        g.remove(stack, "activation_order", a).unwrap();
    });

    // WHEN reconciling
    let mut target = build_app();
    let status = reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN the order is [B, C] and no part was detached
    assert!(status.is_ok(), "unexpected failures: {:?}", status.failures());
    let stack = node(&target, "stack");
    assert_eq!(ids(&target, stack, "activation_order"), ["B", "C"]);
    assert_eq!(ids(&target, stack, "children"), ["A", "B", "C"]);
}

#[test]
fn test_scenario_04_reference_list_holds_each_member_once() {
    // GIVEN a recording that appends C to the activation order
    let doc = record(|g| {
        let stack = node(g, "stack");
        let c = node(g, "C");
        g.append(stack, "activation_order", c).unwrap();
    });

    // AND a target where the application already appended C
    let mut target = build_app();
    let stack = node(&target, "stack");
    let c = node(&target, "C");
    target.append(stack, "activation_order", c).unwrap();

    // WHEN reconciling
    reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN C appears exactly once
    assert_eq!(ids(&target, stack, "activation_order"), ["A", "B", "C"]);
}

#[test]
fn test_scenario_04_activate_part_created_in_later_container() {
    // GIVEN a recording that creates part N in the anonymous stack, which
    // follows "stack" in the tree, and activates N in "stack"
    let doc = record(|g| {
        let stack = node(g, "stack");
        let scratch = scratch_stack(g);
        let part = g.create_with_id(ElementKind::Part, "N");
        g.append(scratch, "children", part).unwrap();
        g.append(stack, "activation_order", part).unwrap();
    });

    // WHEN reconciling onto the unchanged model
    let mut target = build_app();
    let status = reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN N is created and activated
    assert!(status.is_ok(), "unexpected failures: {:?}", status.failures());
    let stack = node(&target, "stack");
    assert_eq!(ids(&target, stack, "activation_order"), ["A", "B", "N"]);
    assert_eq!(ids(&target, scratch_stack(&target), "children"), ["?", "N"]);
}

#![allow(clippy::unwrap_used, clippy::expect_used)]

/// Scenario 7: Elements without application-assigned ids
///
/// Anonymous baseline elements are re-found positionally unless the caller
/// asks for explicit-only matching.
mod common;

use common::{build_app, label, record, scratch_part};
use modeldelta_core::construct::FailureStage;
use modeldelta_core::errors::DeltaError;
use modeldelta_core::{reconcile, ElementKind, MatchingMode, ReconcileOptions};

fn rename_scratch() -> modeldelta_core::Document {
    record(|g| {
        let part = scratch_part(g);
        g.set_attribute(part, "label", "renamed").unwrap();
    })
}

#[test]
fn test_scenario_07_happy_positional_match() {
    // GIVEN a recorded change to the anonymous scratch part
    let doc = rename_scratch();
    assert!(!doc.origins.is_empty());

    // WHEN reconciling with the default matching
    let mut target = build_app();
    let status = reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN the counterpart in the target is updated
    assert!(status.is_ok(), "unexpected failures: {:?}", status.failures());
    assert_eq!(label(&target, scratch_part(&target)).as_deref(), Some("renamed"));
}

#[test]
fn test_scenario_07_explicit_only_reports_unmatched() {
    // GIVEN the same recording
    let doc = rename_scratch();

    // WHEN reconciling with explicit-only matching
    let mut target = build_app();
    let options = ReconcileOptions::default().with_matching(MatchingMode::ExplicitOnly);
    let status = reconcile(&mut target, &doc, &options).unwrap();

    // THEN the change is reported as unresolved and nothing is touched
    assert_eq!(status.failures().len(), 1);
    let failure = &status.failures()[0];
    assert_eq!(failure.stage, FailureStage::Construct);
    assert!(matches!(failure.error, DeltaError::UnresolvedElement { .. }));
    assert_eq!(label(&target, scratch_part(&target)).as_deref(), Some("scratch"));
}

#[test]
fn test_scenario_07_positional_match_checks_kind() {
    // GIVEN a recorded change to the anonymous scratch part
    let doc = rename_scratch();

    // AND a target whose scratch stack holds no part at that position
    let mut target = build_app();
    let stack = common::scratch_stack(&target);
    let part = scratch_part(&target);
    target.remove(stack, "children", part).unwrap();
    let placeholder = target.create(ElementKind::Placeholder);
    target.append(stack, "children", placeholder).unwrap();

    // WHEN reconciling
    let status = reconcile(&mut target, &doc, &ReconcileOptions::default()).unwrap();

    // THEN the entry is unresolved
    assert_eq!(status.failures().len(), 1);
    assert!(matches!(
        status.failures()[0].error,
        DeltaError::UnresolvedElement { .. }
    ));
}

#[test]
fn test_scenario_07_new_anonymous_elements_get_session_local_ids() {
    // GIVEN a recording that creates an anonymous part
    let doc = record(|g| {
        let stack = common::node(g, "stack");
        let part = g.create(ElementKind::Part);
        g.append(stack, "children", part).unwrap();
    });

    // THEN the document names it with a session-local id
    let entry = &doc.entries[0];
    let id = entry["item"]["new"]["id"].as_str().unwrap();
    assert!(id.starts_with('+'), "unexpected id {}", id);
}

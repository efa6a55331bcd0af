//! Reconciliation Demonstration
//!
//! Records a user's edits to an application model and replays them onto a
//! freshly built copy whose application defaults changed in the meantime.
#![allow(clippy::unwrap_used, clippy::expect_used)]
//!
//! Key concepts illustrated:
//! 1. Recording against a baseline snapshot
//! 2. Portable delta documents
//! 3. User-wins versus application-wins per feature
//! 4. Feature filters

use modeldelta_core::delta::{decode, render_change_summary, Document};
use modeldelta_core::logging_facility::{init, Profile};
use modeldelta_core::{begin_recording, reconcile, ElementKind, Graph, ReconcileOptions};

fn build_model() -> Result<Graph, Box<dyn std::error::Error>> {
    let mut graph = Graph::new(ElementKind::Application);
    let root = graph.root();

    let window = graph.create_with_id(ElementKind::Window, "main");
    graph.set_attribute(window, "label", "windowName")?;
    graph.append(root, "children", window)?;

    let stack = graph.create_with_id(ElementKind::PartStack, "stack");
    graph.append(window, "children", stack)?;
    for id in ["A", "B", "C"] {
        let part = graph.create_with_id(ElementKind::Part, id);
        graph.set_attribute(part, "label", id)?;
        graph.append(stack, "children", part)?;
    }
    Ok(graph)
}

fn describe(graph: &Graph) -> String {
    let window = graph.find_by_stable_id("main").unwrap();
    let stack = graph.find_by_stable_id("stack").unwrap();
    let parts: Vec<&str> = graph
        .list(stack, "children")
        .iter()
        .filter_map(|n| graph.stable_id(*n))
        .collect();
    format!(
        "label={} tooltip={} parts={:?}",
        graph.attribute(window, "label").map_or("-".into(), |v| v.to_string()),
        graph.attribute(window, "tooltip").map_or("-".into(), |v| v.to_string()),
        parts
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init(Profile::Development);
    println!("=== ModelDelta Reconcile Demo ===\n");

    // ===== Part 1: Record a user session =====
    println!("## Part 1: Recording\n");

    let mut user_model = build_model()?;
    let mut session = begin_recording(&user_model);

    let window = user_model.find_by_stable_id("main").unwrap();
    let stack = user_model.find_by_stable_id("stack").unwrap();
    user_model.set_attribute(window, "label", "newName")?;
    let d = user_model.create_with_id(ElementKind::Part, "D");
    user_model.set_attribute(d, "label", "D")?;
    user_model.insert(stack, "children", 2, d)?;
    println!("User model: {}", describe(&user_model));

    let document = session.serialize(&user_model)?;
    let bytes = document.to_bytes()?;
    println!("✓ Serialized {} entries ({} bytes)\n", document.entries.len(), bytes.len());

    let decoded = decode(&Document::from_bytes(&bytes)?)?;
    println!("{}", render_change_summary(&decoded.change_set));

    // ===== Part 2: Replay onto a diverged application model =====
    println!("## Part 2: Reconciling\n");

    let mut target = build_model()?;
    let window = target.find_by_stable_id("main").unwrap();
    target.set_attribute(window, "label", "appName")?;
    target.set_attribute(window, "tooltip", "Main window")?;
    println!("Target before: {}", describe(&target));

    let status = reconcile(&mut target, &document, &ReconcileOptions::default())?;
    println!("Target after:  {}", describe(&target));
    println!("Status ok: {}\n", status.is_ok());

    // ===== Part 3: Keep the label under application control =====
    println!("## Part 3: Filters\n");

    let mut filtered = build_model()?;
    let options = ReconcileOptions::default().with_filters(["label"]);
    reconcile(&mut filtered, &document, &options)?;
    println!("Filtered:      {}", describe(&filtered));

    Ok(())
}

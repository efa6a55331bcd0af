#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use modeldelta_core::delta::Document;
use modeldelta_core::{begin_recording, ElementKind, Graph, NodeId};

/// Build the sample application model
///
/// ```text
/// Application
///   children:
///     Window "main" (label "windowName", selected_element -> "stack")
///       children:
///         PartStack "stack" (activation_order [A, B])
///           children: Part "A", Part "B", Part "C"
///         PartStack (anonymous)
///           children: Part (anonymous, label "scratch")
///       menus:
///         Menu "mainMenu"
///           children: MenuItem "saveItem" (command -> "save")
///   commands: Command "save", Command "open"
///   binding_tables:
///     BindingTable "global"
///       bindings: KeyBinding "kb.save" (key "M1+S", command -> "save")
/// ```
///
/// Construction is deterministic, so two calls produce equal graphs.
pub fn build_app() -> Graph {
    let mut graph = Graph::new(ElementKind::Application);
    let root = graph.root();

    let save = graph.create_with_id(ElementKind::Command, "save");
    graph.set_attribute(save, "command_name", "Save").unwrap();
    graph.append(root, "commands", save).unwrap();
    let open = graph.create_with_id(ElementKind::Command, "open");
    graph.set_attribute(open, "command_name", "Open").unwrap();
    graph.append(root, "commands", open).unwrap();

    let window = graph.create_with_id(ElementKind::Window, "main");
    graph.set_attribute(window, "label", "windowName").unwrap();
    graph.append(root, "children", window).unwrap();

    let stack = graph.create_with_id(ElementKind::PartStack, "stack");
    graph.append(window, "children", stack).unwrap();
    for id in ["A", "B", "C"] {
        let part = graph.create_with_id(ElementKind::Part, id);
        graph.set_attribute(part, "label", id).unwrap();
        graph.append(stack, "children", part).unwrap();
    }
    for id in ["A", "B"] {
        let part = node(&graph, id);
        graph.append(stack, "activation_order", part).unwrap();
    }
    graph
        .set_reference(window, "selected_element", Some(stack))
        .unwrap();

    let scratch_stack = graph.create(ElementKind::PartStack);
    graph.append(window, "children", scratch_stack).unwrap();
    let scratch = graph.create(ElementKind::Part);
    graph.set_attribute(scratch, "label", "scratch").unwrap();
    graph.append(scratch_stack, "children", scratch).unwrap();

    let menu = graph.create_with_id(ElementKind::Menu, "mainMenu");
    graph.append(window, "menus", menu).unwrap();
    let item = graph.create_with_id(ElementKind::MenuItem, "saveItem");
    graph.set_reference(item, "command", Some(save)).unwrap();
    graph.append(menu, "children", item).unwrap();

    let table = graph.create_with_id(ElementKind::BindingTable, "global");
    graph.append(root, "binding_tables", table).unwrap();
    let binding = graph.create_with_id(ElementKind::KeyBinding, "kb.save");
    graph.set_attribute(binding, "key_sequence", "M1+S").unwrap();
    graph.set_reference(binding, "command", Some(save)).unwrap();
    graph.append(table, "bindings", binding).unwrap();

    graph
}

/// Record `mutate` against a fresh model and serialize the result
pub fn record<F>(mutate: F) -> Document
where
    F: FnOnce(&mut Graph),
{
    let mut graph = build_app();
    let mut session = begin_recording(&graph);
    mutate(&mut graph);
    session.serialize(&graph).unwrap()
}

/// Reachable element carrying `id`
pub fn node(graph: &Graph, id: &str) -> NodeId {
    graph
        .find_by_stable_id(id)
        .unwrap_or_else(|| panic!("no element with id {}", id))
}

/// The anonymous second part stack of the main window
pub fn scratch_stack(graph: &Graph) -> NodeId {
    let window = node(graph, "main");
    graph.list(window, "children")[1]
}

/// The anonymous part inside the scratch stack
pub fn scratch_part(graph: &Graph) -> NodeId {
    let stack = scratch_stack(graph);
    graph.list(stack, "children")[0]
}

/// Stable ids of a list's members (`?` for anonymous members)
pub fn ids(graph: &Graph, owner: NodeId, feature: &str) -> Vec<String> {
    graph
        .list(owner, feature)
        .iter()
        .map(|n| graph.stable_id(*n).unwrap_or("?").to_string())
        .collect()
}

/// Effective string value of an attribute
pub fn label(graph: &Graph, node: NodeId) -> Option<String> {
    graph
        .attribute(node, "label")
        .and_then(|v| v.as_str().map(str::to_string))
}

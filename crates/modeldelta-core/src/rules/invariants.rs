use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Graph, NodeId};
use crate::schema::FeatureType;

/// Find elements whose recorded container does not list them
///
/// Returns list of (node, parent, feature) tuples
pub fn find_parent_mismatches(graph: &Graph) -> Vec<(NodeId, NodeId, String)> {
    let mut mismatches = Vec::new();

    for element in graph.elements() {
        if let Some(containment) = element.parent() {
            let listed = graph
                .list(containment.parent, &containment.feature)
                .contains(&element.id());
            if !listed {
                mismatches.push((element.id(), containment.parent, containment.feature.clone()));
            }
        }
    }

    mismatches
}

/// Find containment list members that do not record the listing element
/// as their container
///
/// Returns list of (node, owner, feature) tuples
pub fn find_unowned_members(graph: &Graph) -> Vec<(NodeId, NodeId, String)> {
    let mut unowned = Vec::new();

    for element in graph.elements() {
        for def in element.kind().features() {
            if def.feature_type != FeatureType::ContainmentList {
                continue;
            }
            for child in graph.list(element.id(), def.name) {
                let Some(member) = graph.get(*child) else {
                    continue;
                };
                let owned = member
                    .parent()
                    .is_some_and(|c| c.parent == element.id() && c.feature == def.name);
                if !owned {
                    unowned.push((*child, element.id(), def.name.to_string()));
                }
            }
        }
    }

    unowned
}

/// Find list members and references naming nodes absent from the arena
///
/// Returns list of (owner, feature, missing node) tuples
pub fn find_missing_members(graph: &Graph) -> Vec<(NodeId, String, NodeId)> {
    let mut missing = Vec::new();

    for element in graph.elements() {
        for (feature, members) in element.lists() {
            for member in members {
                if graph.get(*member).is_none() {
                    missing.push((element.id(), feature.to_string(), *member));
                }
            }
        }
        for (feature, referenced) in element.references() {
            if graph.get(referenced).is_none() {
                missing.push((element.id(), feature.to_string(), referenced));
            }
        }
    }

    missing
}

/// Find elements listed by more than one containment slot (or twice in one)
///
/// Returns list of (node, occurrence count) tuples
pub fn find_multiply_contained(graph: &Graph) -> Vec<(NodeId, usize)> {
    let mut counts: BTreeMap<NodeId, usize> = BTreeMap::new();

    for element in graph.elements() {
        for def in element.kind().features() {
            if def.feature_type != FeatureType::ContainmentList {
                continue;
            }
            for child in graph.list(element.id(), def.name) {
                *counts.entry(*child).or_insert(0) += 1;
            }
        }
    }

    counts.into_iter().filter(|(_, count)| *count > 1).collect()
}

/// Find stable ids carried by more than one reachable element
///
/// Returns list of (stable_id, nodes) tuples
pub fn find_duplicate_stable_ids(graph: &Graph) -> Vec<(String, Vec<NodeId>)> {
    let mut by_id: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();

    for node in graph.reachable() {
        if let Some(id) = graph.stable_id(node) {
            by_id.entry(id).or_default().push(node);
        }
    }

    by_id
        .into_iter()
        .filter(|(_, nodes)| nodes.len() > 1)
        .map(|(id, nodes)| (id.to_string(), nodes))
        .collect()
}

/// Find references (single or list) from reachable elements to elements
/// that are not reachable
///
/// Dangling references are legal after a removal; callers decide whether
/// to care. Returns list of (node, feature, referenced) tuples
pub fn find_dangling_references(graph: &Graph) -> Vec<(NodeId, String, NodeId)> {
    let reachable: BTreeSet<NodeId> = graph.reachable().into_iter().collect();
    let mut dangling = Vec::new();

    for node in &reachable {
        let Some(element) = graph.get(*node) else {
            continue;
        };
        for (feature, referenced) in element.references() {
            if !reachable.contains(&referenced) {
                dangling.push((*node, feature.to_string(), referenced));
            }
        }
        for def in element.kind().features() {
            if def.feature_type != FeatureType::ReferenceList {
                continue;
            }
            for referenced in graph.list(*node, def.name) {
                if !reachable.contains(referenced) {
                    dangling.push((*node, def.name.to_string(), *referenced));
                }
            }
        }
    }

    dangling
}

/// Check if an element's container chain loops back on itself
pub fn has_containment_cycle(graph: &Graph, node: NodeId) -> bool {
    let mut visited = BTreeSet::new();
    let mut current = Some(node);

    while let Some(id) = current {
        if !visited.insert(id) {
            return true;
        }
        current = graph.parent(id).map(|(parent, _)| parent);
    }

    false
}

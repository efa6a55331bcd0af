use crate::errors::{DeltaError, Result};
use crate::model::Graph;

use super::invariants;

/// Validate the structure of a graph
///
/// Checks, in order:
///
/// 1. Containment chains are acyclic
/// 2. Lists and references only name nodes of the graph
/// 3. Every element's recorded container lists it
/// 4. Every containment list member records the listing element as container
/// 5. No element is contained more than once
/// 6. No two reachable elements share a stable id
///
/// Dangling references are not structural violations; use
/// [`invariants::find_dangling_references`] to inspect them.
///
/// # Errors
/// Returns the first violation encountered. For exhaustive reporting, call
/// the individual invariant functions directly.
pub fn validate_graph(graph: &Graph) -> Result<()> {
    for element in graph.elements() {
        if invariants::has_containment_cycle(graph, element.id()) {
            return Err(DeltaError::CycleDetected {
                node: element.id().to_string(),
            });
        }
    }

    let missing = invariants::find_missing_members(graph);
    if let Some((owner, feature, node)) = missing.first() {
        return Err(DeltaError::MissingMember {
            owner: owner.to_string(),
            feature: feature.clone(),
            node: node.to_string(),
        });
    }

    let mismatches = invariants::find_parent_mismatches(graph);
    if let Some((node, parent, feature)) = mismatches.first() {
        return Err(DeltaError::ParentMismatch {
            node: node.to_string(),
            parent: parent.to_string(),
            feature: feature.clone(),
        });
    }

    let unowned = invariants::find_unowned_members(graph);
    if let Some((node, owner, feature)) = unowned.first() {
        return Err(DeltaError::ContainerMismatch {
            node: node.to_string(),
            owner: owner.to_string(),
            feature: feature.clone(),
        });
    }

    let multiply = invariants::find_multiply_contained(graph);
    if let Some((node, count)) = multiply.first() {
        return Err(DeltaError::MultipleContainers {
            node: node.to_string(),
            count: *count,
        });
    }

    let duplicates = invariants::find_duplicate_stable_ids(graph);
    if let Some((stable_id, _)) = duplicates.first() {
        return Err(DeltaError::DuplicateStableId {
            stable_id: stable_id.clone(),
        });
    }

    Ok(())
}

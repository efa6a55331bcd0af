//! Matching strategies: how a stable id recorded against one graph instance
//! is located in another.

use super::{Origin, Origins, StableId};
use crate::model::{Graph, NodeId};

/// Strategy for finding the counterpart of a recorded element
///
/// Injected into delta construction so the positional heuristic can be
/// swapped without touching the rest of the engine.
pub trait MatchStrategy {
    /// Locate `id` in `target`, using `origins` for synthesized ids
    ///
    /// # Returns
    /// * `Some(node)` - reachable counterpart in `target`
    /// * `None` - element is unmatched
    fn resolve(&self, target: &Graph, id: &StableId, origins: &Origins) -> Option<NodeId>;
}

/// Explicit id lookup, then positional re-finding through origins
///
/// A positional id resolves its parent (recursively), then takes the
/// `ordinal`-th element of the recorded kind in the recorded feature.
///
/// # Example
/// ```
/// use modeldelta_core::identity::{MatchStrategy, Origins, PositionalMatch, StableId};
/// use modeldelta_core::model::Graph;
/// use modeldelta_core::schema::ElementKind;
///
/// let mut graph = Graph::new(ElementKind::Application);
/// let window = graph.create_with_id(ElementKind::Window, "main");
/// let root = graph.root();
/// graph.append(root, "children", window).unwrap();
///
/// let found = PositionalMatch.resolve(&graph, &StableId::from("main"), &Origins::new());
/// assert_eq!(found, Some(window));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalMatch;

impl PositionalMatch {
    fn resolve_bounded(
        &self,
        target: &Graph,
        id: &StableId,
        origins: &Origins,
        depth: usize,
    ) -> Option<NodeId> {
        if let Some(node) = target.find_by_stable_id(id.as_str()) {
            return Some(node);
        }
        // origin chains come from documents; guard against loops
        if depth > origins.len() {
            return None;
        }
        match origins.get(id)? {
            Origin::Root => Some(target.root()),
            Origin::Positional {
                parent,
                feature,
                kind,
                ordinal,
            } => {
                let owner = self.resolve_bounded(target, parent, origins, depth + 1)?;
                target
                    .list(owner, feature)
                    .iter()
                    .copied()
                    .filter(|n| target.kind(*n) == Some(*kind))
                    .nth(*ordinal)
            }
        }
    }
}

impl MatchStrategy for PositionalMatch {
    fn resolve(&self, target: &Graph, id: &StableId, origins: &Origins) -> Option<NodeId> {
        self.resolve_bounded(target, id, origins, 0)
    }
}

/// Only application-assigned ids (and the root) are matched
///
/// Anonymous elements never match, so their changes are reported as
/// unresolved and new anonymous elements are always recreated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitOnlyMatch;

impl MatchStrategy for ExplicitOnlyMatch {
    fn resolve(&self, target: &Graph, id: &StableId, origins: &Origins) -> Option<NodeId> {
        target
            .find_by_stable_id(id.as_str())
            .or_else(|| matches!(origins.get(id), Some(Origin::Root)).then(|| target.root()))
    }
}

//! Baseline capture and per-element normalized state.

use crate::identity::{IdentityMap, StableId};
use crate::model::{Graph, NodeId, Scalar};
use crate::schema::{ElementKind, FeatureDef, FeatureType};
use std::collections::BTreeMap;

/// Normalized feature state of one element
///
/// Attributes at their schema default are absent, references and list
/// members are stable ids. Two states compare equal exactly when no
/// feature would be recorded as changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementState {
    pub id: StableId,
    pub kind: ElementKind,
    pub attributes: BTreeMap<String, Scalar>,
    pub references: BTreeMap<String, StableId>,
    pub lists: BTreeMap<String, Vec<StableId>>,
}

impl ElementState {
    /// Read the normalized state of `node`, assigning ids as needed
    pub fn capture(graph: &Graph, node: NodeId, identity: &mut IdentityMap) -> Option<Self> {
        let kind = graph.kind(node)?;
        let mut state = ElementState {
            id: identity.id_of(graph, node),
            kind,
            attributes: BTreeMap::new(),
            references: BTreeMap::new(),
            lists: BTreeMap::new(),
        };
        for def in kind.features() {
            match def.feature_type {
                FeatureType::Attribute { .. } => {
                    if let Some(value) = normalized_attribute(graph, node, def) {
                        state.attributes.insert(def.name.to_string(), value);
                    }
                }
                FeatureType::Reference => {
                    if let Some(target) = graph.reference(node, def.name) {
                        let id = identity.id_of(graph, target);
                        state.references.insert(def.name.to_string(), id);
                    }
                }
                FeatureType::ContainmentList | FeatureType::ReferenceList => {
                    let members = graph.list(node, def.name);
                    if !members.is_empty() {
                        let ids = members.iter().map(|m| identity.id_of(graph, *m)).collect();
                        state.lists.insert(def.name.to_string(), ids);
                    }
                }
            }
        }
        Some(state)
    }

    pub fn attribute(&self, feature: &str) -> Option<&Scalar> {
        self.attributes.get(feature)
    }

    pub fn reference(&self, feature: &str) -> Option<&StableId> {
        self.references.get(feature)
    }

    pub fn list(&self, feature: &str) -> &[StableId] {
        self.lists.get(feature).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Explicit value unless it equals the schema default
pub(crate) fn normalized_attribute(graph: &Graph, node: NodeId, def: &FeatureDef) -> Option<Scalar> {
    graph
        .explicit_attribute(node, def.name)
        .filter(|v| !def.is_default(v))
        .cloned()
}

/// Deep copy of every reachable element's state at recording start
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    elements: BTreeMap<NodeId, ElementState>,
}

impl Snapshot {
    pub fn capture(graph: &Graph, identity: &mut IdentityMap) -> Self {
        identity.observe_baseline(graph);
        let elements = graph
            .reachable()
            .into_iter()
            .filter_map(|node| ElementState::capture(graph, node, identity).map(|s| (node, s)))
            .collect();
        Self { elements }
    }

    pub fn get(&self, node: NodeId) -> Option<&ElementState> {
        self.elements.get(&node)
    }

    /// Whether `node` existed (reachable) when recording began
    pub fn contains(&self, node: NodeId) -> bool {
        self.elements.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modeldelta_core_types::SessionId;

    #[test]
    fn test_default_values_normalize_to_absent() {
        let mut graph = Graph::new(ElementKind::Application);
        let window = graph.create_with_id(ElementKind::Window, "main");
        let root = graph.root();
        graph.append(root, "children", window).unwrap();
        graph.set_attribute(window, "visible", true).unwrap();
        graph.set_attribute(window, "label", "windowName").unwrap();

        let mut identity = IdentityMap::new(&SessionId::new());
        let state = ElementState::capture(&graph, window, &mut identity).unwrap();

        assert_eq!(state.attribute("visible"), None);
        assert_eq!(state.attribute("label"), Some(&Scalar::from("windowName")));
    }

    #[test]
    fn test_snapshot_covers_reachable_only() {
        let mut graph = Graph::new(ElementKind::Application);
        let window = graph.create(ElementKind::Window);
        let detached = graph.create(ElementKind::Window);
        let root = graph.root();
        graph.append(root, "children", window).unwrap();

        let mut identity = IdentityMap::new(&SessionId::new());
        let snapshot = Snapshot::capture(&graph, &mut identity);

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(window));
        assert!(!snapshot.contains(detached));
        assert_eq!(
            snapshot.get(root).unwrap().list("children"),
            &[StableId::from("@root/children/Window.0")]
        );
    }
}

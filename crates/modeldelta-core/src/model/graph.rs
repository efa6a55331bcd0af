//! Element arena and the mutation API application code uses.

use crate::errors::{DeltaError, Result};
use crate::model::{Containment, Element, NodeId, Scalar};
use crate::schema::{self, ElementKind, FeatureDef, FeatureType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A rooted tree of typed elements connected by containment lists, plus
/// references that may point anywhere in the tree
///
/// Elements created with [`Graph::create`] are detached until inserted into
/// a containment list. Removing an element from its container detaches it
/// (with its subtree); detached elements are not reachable and are invisible
/// to [`Graph::reachable`] and [`Graph::find_by_stable_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "GraphRepr", try_from = "GraphRepr")]
pub struct Graph {
    root: NodeId,
    next_id: u64,
    elements: BTreeMap<NodeId, Element>,
    /// Arena-wide index; reachability is checked on lookup
    by_stable_id: BTreeMap<String, BTreeSet<NodeId>>,
}

#[derive(Serialize, Deserialize)]
struct GraphRepr {
    root: NodeId,
    elements: Vec<Element>,
}

impl From<Graph> for GraphRepr {
    fn from(graph: Graph) -> Self {
        GraphRepr {
            root: graph.root,
            elements: graph.elements.into_values().collect(),
        }
    }
}

impl TryFrom<GraphRepr> for Graph {
    type Error = DeltaError;

    fn try_from(repr: GraphRepr) -> Result<Self> {
        let mut elements = BTreeMap::new();
        for element in repr.elements {
            let id = element.id;
            if elements.insert(id, element).is_some() {
                return Err(DeltaError::Internal {
                    message: format!("node {} appears twice in graph data", id),
                });
            }
        }
        if !elements.contains_key(&repr.root) {
            return Err(DeltaError::NodeNotFound {
                node: repr.root.to_string(),
            });
        }
        let next_id = elements.keys().next_back().map_or(0, |id| id.0 + 1);
        let mut by_stable_id: BTreeMap<String, BTreeSet<NodeId>> = BTreeMap::new();
        for element in elements.values() {
            if let Some(sid) = &element.stable_id {
                by_stable_id.entry(sid.clone()).or_default().insert(element.id);
            }
        }
        Ok(Graph {
            root: repr.root,
            next_id,
            elements,
            by_stable_id,
        })
    }
}

impl Graph {
    /// Create a graph holding only a root element of `root_kind`
    pub fn new(root_kind: ElementKind) -> Self {
        let root = NodeId(0);
        let mut elements = BTreeMap::new();
        elements.insert(root, Element::new(root, root_kind, None));
        Self {
            root,
            next_id: 1,
            elements,
            by_stable_id: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached anonymous element
    pub fn create(&mut self, kind: ElementKind) -> NodeId {
        self.alloc(kind, None)
    }

    /// Create a detached element carrying an application-assigned id
    pub fn create_with_id(&mut self, kind: ElementKind, stable_id: impl Into<String>) -> NodeId {
        self.alloc(kind, Some(stable_id.into()))
    }

    fn alloc(&mut self, kind: ElementKind, stable_id: Option<String>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        if let Some(sid) = &stable_id {
            self.by_stable_id.entry(sid.clone()).or_default().insert(id);
        }
        self.elements.insert(id, Element::new(id, kind, stable_id));
        id
    }

    pub fn get(&self, node: NodeId) -> Option<&Element> {
        self.elements.get(&node)
    }

    pub fn kind(&self, node: NodeId) -> Option<ElementKind> {
        self.get(node).map(|e| e.kind)
    }

    pub fn stable_id(&self, node: NodeId) -> Option<&str> {
        self.get(node).and_then(|e| e.stable_id.as_deref())
    }

    pub fn set_stable_id(&mut self, node: NodeId, stable_id: Option<String>) -> Result<()> {
        let element = self.element_mut(node)?;
        let previous = std::mem::replace(&mut element.stable_id, stable_id.clone());
        if let Some(old) = previous {
            if let Some(nodes) = self.by_stable_id.get_mut(&old) {
                nodes.remove(&node);
                if nodes.is_empty() {
                    self.by_stable_id.remove(&old);
                }
            }
        }
        if let Some(sid) = stable_id {
            self.by_stable_id.entry(sid).or_default().insert(node);
        }
        Ok(())
    }

    /// Container and containment feature of `node`
    pub fn parent(&self, node: NodeId) -> Option<(NodeId, &str)> {
        self.get(node)
            .and_then(|e| e.parent.as_ref())
            .map(|c| (c.parent, c.feature.as_str()))
    }

    /// Every element in the arena, reachable or not
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    // ===== Attributes =====

    /// Effective value: explicit value, else the schema default
    ///
    /// Returns `None` for unknown features and for unset attributes without
    /// a declared default.
    pub fn attribute(&self, node: NodeId, feature: &str) -> Option<Scalar> {
        let element = self.get(node)?;
        let def = schema::lookup(element.kind, feature)?;
        element
            .attributes
            .get(feature)
            .cloned()
            .or_else(|| def.default_value())
    }

    /// Explicitly stored value, ignoring defaults
    pub fn explicit_attribute(&self, node: NodeId, feature: &str) -> Option<&Scalar> {
        self.get(node)?.attributes.get(feature)
    }

    pub fn set_attribute(
        &mut self,
        node: NodeId,
        feature: &str,
        value: impl Into<Scalar>,
    ) -> Result<()> {
        let value = value.into();
        let def = self.feature_def(node, feature)?;
        let FeatureType::Attribute { value_type, .. } = def.feature_type else {
            return Err(DeltaError::type_mismatch(
                feature,
                "attribute",
                def.feature_type.name(),
            ));
        };
        if !value_type.accepts(&value) {
            return Err(DeltaError::type_mismatch(
                feature,
                value_type.name(),
                value.type_name(),
            ));
        }
        self.element_mut(node)?
            .attributes
            .insert(feature.to_string(), value);
        Ok(())
    }

    /// Reset an attribute to its schema default
    pub fn unset_attribute(&mut self, node: NodeId, feature: &str) -> Result<()> {
        let def = self.feature_def(node, feature)?;
        if !matches!(def.feature_type, FeatureType::Attribute { .. }) {
            return Err(DeltaError::type_mismatch(
                feature,
                "attribute",
                def.feature_type.name(),
            ));
        }
        self.element_mut(node)?.attributes.remove(feature);
        Ok(())
    }

    // ===== References =====

    pub fn reference(&self, node: NodeId, feature: &str) -> Option<NodeId> {
        self.get(node)?.references.get(feature).copied()
    }

    /// Point `feature` at `target`, or clear it with `None`
    pub fn set_reference(
        &mut self,
        node: NodeId,
        feature: &str,
        target: Option<NodeId>,
    ) -> Result<()> {
        let def = self.feature_def(node, feature)?;
        if def.feature_type != FeatureType::Reference {
            return Err(DeltaError::type_mismatch(
                feature,
                "reference",
                def.feature_type.name(),
            ));
        }
        if let Some(target) = target {
            self.require(target)?;
        }
        let element = self.element_mut(node)?;
        match target {
            Some(target) => {
                element.references.insert(feature.to_string(), target);
            }
            None => {
                element.references.remove(feature);
            }
        }
        Ok(())
    }

    // ===== Lists =====

    /// Members of a list feature; empty for unknown or empty features
    pub fn list(&self, node: NodeId, feature: &str) -> &[NodeId] {
        self.get(node)
            .and_then(|e| e.lists.get(feature))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn index_of(&self, node: NodeId, feature: &str, item: NodeId) -> Option<usize> {
        self.list(node, feature).iter().position(|n| *n == item)
    }

    /// Insert `item` at `index` (clamped to the list length)
    ///
    /// Lists hold each member once: inserting a present member moves it.
    /// Inserting into a containment list detaches `item` from its previous
    /// container first.
    pub fn insert(&mut self, node: NodeId, feature: &str, index: usize, item: NodeId) -> Result<()> {
        let def = self.feature_def(node, feature)?;
        if !def.is_list() {
            return Err(DeltaError::type_mismatch(
                feature,
                "list",
                def.feature_type.name(),
            ));
        }
        self.require(item)?;

        if def.is_containment() {
            if item == self.root || self.is_ancestor_or_self(item, node) {
                return Err(DeltaError::CycleDetected {
                    node: item.to_string(),
                });
            }
            self.detach(item);
        } else if let Some(pos) = self.index_of(node, feature, item) {
            if let Some(list) = self.element_mut(node)?.lists.get_mut(feature) {
                list.remove(pos);
            }
        }

        let list = self
            .element_mut(node)?
            .lists
            .entry(feature.to_string())
            .or_default();
        let index = index.min(list.len());
        list.insert(index, item);

        if def.is_containment() {
            self.element_mut(item)?.parent = Some(Containment {
                parent: node,
                feature: feature.to_string(),
            });
        }
        Ok(())
    }

    pub fn append(&mut self, node: NodeId, feature: &str, item: NodeId) -> Result<()> {
        self.insert(node, feature, usize::MAX, item)
    }

    /// Remove `item` from a list feature
    ///
    /// Returns `false` when the item was not a member. A child removed from a
    /// containment list becomes detached.
    pub fn remove(&mut self, node: NodeId, feature: &str, item: NodeId) -> Result<bool> {
        let def = self.feature_def(node, feature)?;
        if !def.is_list() {
            return Err(DeltaError::type_mismatch(
                feature,
                "list",
                def.feature_type.name(),
            ));
        }
        let Some(pos) = self.index_of(node, feature, item) else {
            return Ok(false);
        };
        let element = self.element_mut(node)?;
        if let Some(list) = element.lists.get_mut(feature) {
            list.remove(pos);
            if list.is_empty() {
                element.lists.remove(feature);
            }
        }
        if def.is_containment() {
            if let Some(child) = self.elements.get_mut(&item) {
                child.parent = None;
            }
        }
        Ok(true)
    }

    fn detach(&mut self, item: NodeId) {
        let Some(Containment { parent, feature }) =
            self.elements.get_mut(&item).and_then(|e| e.parent.take())
        else {
            return;
        };
        if let Some(owner) = self.elements.get_mut(&parent) {
            if let Some(list) = owner.lists.get_mut(&feature) {
                list.retain(|n| *n != item);
                if list.is_empty() {
                    owner.lists.remove(&feature);
                }
            }
        }
    }

    // ===== Traversal =====

    /// Reachable elements in pre-order from the root
    ///
    /// Children are visited per containment feature in schema declaration
    /// order, then list order.
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            let Some(element) = self.get(node) else {
                continue;
            };
            out.push(node);
            let children: Vec<NodeId> = element
                .kind
                .features()
                .iter()
                .filter(|f| f.is_containment())
                .flat_map(|f| self.list(node, f.name).iter().copied())
                .collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Whether `node` is reachable from the root via containment
    pub fn contains(&self, node: NodeId) -> bool {
        let mut current = node;
        let mut steps = 0usize;
        loop {
            if current == self.root {
                return self.elements.contains_key(&current);
            }
            match self.parent(current) {
                Some((parent, _)) => current = parent,
                None => return false,
            }
            steps += 1;
            if steps > self.elements.len() {
                return false;
            }
        }
    }

    /// First reachable element (pre-order) carrying `stable_id`
    ///
    /// Costs one walk up the containment chain per element carrying the id;
    /// only duplicated ids fall back to a pre-order scan.
    pub fn find_by_stable_id(&self, stable_id: &str) -> Option<NodeId> {
        let candidates = self.by_stable_id.get(stable_id)?;
        let mut live = candidates.iter().copied().filter(|n| self.contains(*n));
        let first = live.next()?;
        if live.next().is_none() {
            return Some(first);
        }
        self.reachable()
            .into_iter()
            .find(|n| self.stable_id(*n) == Some(stable_id))
    }

    /// `true` if `ancestor` is `node` or one of its containers
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0usize;
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.elements.len() {
                return false;
            }
            current = self.parent(n).map(|(p, _)| p);
        }
        false
    }

    // ===== Helpers =====

    fn require(&self, node: NodeId) -> Result<&Element> {
        self.get(node).ok_or_else(|| DeltaError::NodeNotFound {
            node: node.to_string(),
        })
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut Element> {
        self.elements
            .get_mut(&node)
            .ok_or_else(|| DeltaError::NodeNotFound {
                node: node.to_string(),
            })
    }

    fn feature_def(&self, node: NodeId, feature: &str) -> Result<&'static FeatureDef> {
        let kind = self.require(node)?.kind;
        schema::lookup(kind, feature).ok_or_else(|| DeltaError::unknown_feature(kind, feature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_graph() -> (Graph, NodeId) {
        let mut graph = Graph::new(ElementKind::Application);
        let window = graph.create_with_id(ElementKind::Window, "main");
        graph.append(graph.root(), "children", window).unwrap();
        (graph, window)
    }

    #[test]
    fn test_attribute_default_and_explicit() {
        let (mut graph, window) = window_graph();
        assert_eq!(graph.attribute(window, "visible"), Some(Scalar::Bool(true)));
        assert_eq!(graph.explicit_attribute(window, "visible"), None);
        assert_eq!(graph.attribute(window, "label"), None);

        graph.set_attribute(window, "label", "windowName").unwrap();
        assert_eq!(graph.attribute(window, "label"), Some(Scalar::from("windowName")));

        graph.unset_attribute(window, "label").unwrap();
        assert_eq!(graph.attribute(window, "label"), None);
    }

    #[test]
    fn test_write_validation() {
        let (mut graph, window) = window_graph();
        assert!(matches!(
            graph.set_attribute(window, "colour", "red"),
            Err(DeltaError::UnknownFeature { .. })
        ));
        assert!(matches!(
            graph.set_attribute(window, "visible", "yes"),
            Err(DeltaError::TypeMismatch { .. })
        ));
        assert!(matches!(
            graph.set_attribute(window, "children", "x"),
            Err(DeltaError::TypeMismatch { .. })
        ));
        assert!(graph.attribute(window, "colour").is_none());
    }

    #[test]
    fn test_containment_insert_moves_element() {
        let (mut graph, window) = window_graph();
        let stack_a = graph.create(ElementKind::PartStack);
        let stack_b = graph.create(ElementKind::PartStack);
        let part = graph.create(ElementKind::Part);
        graph.append(window, "children", stack_a).unwrap();
        graph.append(window, "children", stack_b).unwrap();
        graph.append(stack_a, "children", part).unwrap();

        graph.append(stack_b, "children", part).unwrap();

        assert!(graph.list(stack_a, "children").is_empty());
        assert_eq!(graph.list(stack_b, "children"), &[part]);
        assert_eq!(graph.parent(part), Some((stack_b, "children")));
    }

    #[test]
    fn test_insert_clamps_and_reorders() {
        let (mut graph, window) = window_graph();
        let a = graph.create(ElementKind::Part);
        let b = graph.create(ElementKind::Part);
        let c = graph.create(ElementKind::Part);
        for p in [a, b, c] {
            graph.append(window, "children", p).unwrap();
        }
        graph.insert(window, "children", 0, c).unwrap();
        assert_eq!(graph.list(window, "children"), &[c, a, b]);
        graph.insert(window, "children", 99, c).unwrap();
        assert_eq!(graph.list(window, "children"), &[a, b, c]);
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut graph, window) = window_graph();
        let sash = graph.create(ElementKind::PartSashContainer);
        graph.append(window, "children", sash).unwrap();
        let result = graph.append(sash, "children", window);
        assert!(matches!(result, Err(DeltaError::CycleDetected { .. })));
        let result = graph.append(sash, "children", sash);
        assert!(matches!(result, Err(DeltaError::CycleDetected { .. })));
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let (mut graph, window) = window_graph();
        let part = graph.create_with_id(ElementKind::Part, "editor");
        graph.append(window, "children", part).unwrap();
        assert_eq!(graph.find_by_stable_id("editor"), Some(part));

        assert!(graph.remove(graph.root(), "children", window).unwrap());
        assert!(!graph.contains(window));
        assert!(!graph.contains(part));
        assert_eq!(graph.find_by_stable_id("editor"), None);
        assert!(!graph.remove(graph.root(), "children", window).unwrap());
    }

    #[test]
    fn test_reference_list_is_unique() {
        let (mut graph, window) = window_graph();
        let stack = graph.create(ElementKind::PartStack);
        let a = graph.create(ElementKind::Part);
        let b = graph.create(ElementKind::Part);
        graph.append(window, "children", stack).unwrap();
        graph.append(stack, "children", a).unwrap();
        graph.append(stack, "children", b).unwrap();

        graph.append(stack, "activation_order", a).unwrap();
        graph.append(stack, "activation_order", b).unwrap();
        graph.insert(stack, "activation_order", 0, b).unwrap();

        assert_eq!(graph.list(stack, "activation_order"), &[b, a]);
        // reference lists do not own their members
        assert_eq!(graph.parent(a), Some((stack, "children")));
    }

    #[test]
    fn test_reachable_preorder() {
        let (mut graph, window) = window_graph();
        let command = graph.create(ElementKind::Command);
        let part = graph.create(ElementKind::Part);
        graph.append(graph.root(), "commands", command).unwrap();
        graph.append(window, "children", part).unwrap();

        assert_eq!(graph.reachable(), vec![graph.root(), window, part, command]);
    }

    #[test]
    fn test_stable_id_lookup_follows_renames_and_detach() {
        let (mut graph, window) = window_graph();
        let part = graph.create_with_id(ElementKind::Part, "editor");
        assert_eq!(graph.find_by_stable_id("editor"), None);

        graph.append(window, "children", part).unwrap();
        assert_eq!(graph.find_by_stable_id("editor"), Some(part));

        graph.set_stable_id(part, Some("viewer".into())).unwrap();
        assert_eq!(graph.find_by_stable_id("editor"), None);
        assert_eq!(graph.find_by_stable_id("viewer"), Some(part));

        graph.remove(window, "children", part).unwrap();
        assert_eq!(graph.find_by_stable_id("viewer"), None);
    }

    #[test]
    fn test_duplicate_stable_id_resolves_in_preorder() {
        let (mut graph, window) = window_graph();
        let late = graph.create_with_id(ElementKind::Command, "dup");
        graph.append(graph.root(), "commands", late).unwrap();
        let early = graph.create_with_id(ElementKind::Part, "dup");
        graph.append(window, "children", early).unwrap();

        assert_eq!(graph.find_by_stable_id("dup"), Some(early));
    }

    #[test]
    fn test_serde_round_trip() {
        let (mut graph, window) = window_graph();
        let placeholder = graph.create(ElementKind::Placeholder);
        graph.append(window, "children", placeholder).unwrap();
        graph.set_reference(placeholder, "ref", Some(window)).unwrap();
        graph.set_attribute(window, "x", 40i64).unwrap();

        let json = serde_json::to_string(&graph).unwrap();
        let mut back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);

        assert_eq!(back.find_by_stable_id("main"), Some(window));

        // fresh handles must not collide with loaded ones
        let fresh = back.create(ElementKind::Part);
        assert!(graph.get(fresh).is_none());
    }
}

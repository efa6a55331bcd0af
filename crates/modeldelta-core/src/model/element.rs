use crate::model::Scalar;
use crate::schema::ElementKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Arena handle of an element, valid only within one `Graph`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an element sits: its container and the containment list holding it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Containment {
    pub parent: NodeId,
    pub feature: String,
}

/// A typed node of the graph
///
/// Only features declared by the kind's schema are ever stored. Attributes
/// hold explicit values; an absent entry means the schema default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub(crate) id: NodeId,
    pub(crate) kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) stable_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) parent: Option<Containment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) attributes: BTreeMap<String, Scalar>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) references: BTreeMap<String, NodeId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) lists: BTreeMap<String, Vec<NodeId>>,
}

impl Element {
    pub(crate) fn new(id: NodeId, kind: ElementKind, stable_id: Option<String>) -> Self {
        Self {
            id,
            kind,
            stable_id,
            parent: None,
            attributes: BTreeMap::new(),
            references: BTreeMap::new(),
            lists: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Application-assigned identity, if any
    pub fn stable_id(&self) -> Option<&str> {
        self.stable_id.as_deref()
    }

    pub fn parent(&self) -> Option<&Containment> {
        self.parent.as_ref()
    }

    /// Explicitly set attributes (defaults are not listed)
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn references(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.references.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Non-empty lists, keyed by feature name
    pub fn lists(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.lists.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

//! Stable identities and cross-instance element matching.
//!
//! Elements with an application-assigned id keep it. Anonymous elements get
//! a synthesized id when the recorder first observes them, along with an
//! [`Origin`] describing where they sat so a second graph instance can
//! re-find them positionally.

pub mod strategy;

pub use strategy::{ExplicitOnlyMatch, MatchStrategy, PositionalMatch};

use crate::model::{Graph, NodeId};
use crate::schema::ElementKind;
use modeldelta_core_types::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Id of the root element when the application gave it none
pub const ROOT_ID: &str = "@root";

/// Identity of an element that survives serialization
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Synthesized for an anonymous element present when recording began
    pub fn is_positional(&self) -> bool {
        self.0.starts_with('@')
    }

    /// Synthesized for an anonymous element first seen during recording
    pub fn is_session_local(&self) -> bool {
        self.0.starts_with('+')
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StableId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StableId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Positional context recorded for a synthesized id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Root,
    /// `ordinal`-th element of `kind` in `parent.feature`
    Positional {
        parent: StableId,
        feature: String,
        kind: ElementKind,
        ordinal: usize,
    },
}

/// Synthesized-id origins keyed by id
pub type Origins = BTreeMap<StableId, Origin>;

/// Session-scoped identity registry
///
/// Ids handed out for a node are memoized, so repeated calls within one
/// session always agree.
#[derive(Debug, Clone)]
pub struct IdentityMap {
    prefix: String,
    assigned: BTreeMap<NodeId, StableId>,
    origins: Origins,
    next_local: u64,
}

impl IdentityMap {
    pub fn new(session: &SessionId) -> Self {
        Self {
            prefix: session.short().to_string(),
            assigned: BTreeMap::new(),
            origins: BTreeMap::new(),
            next_local: 0,
        }
    }

    /// Assign ids to every element reachable in the baseline graph
    pub fn observe_baseline(&mut self, graph: &Graph) {
        for node in graph.reachable() {
            if self.assigned.contains_key(&node) {
                continue;
            }
            let id = match graph.stable_id(node) {
                Some(explicit) => StableId::new(explicit),
                None => self.synthesize_positional(graph, node),
            };
            self.assigned.insert(node, id);
        }
    }

    fn synthesize_positional(&mut self, graph: &Graph, node: NodeId) -> StableId {
        let Some((parent, feature)) = graph.parent(node) else {
            let id = StableId::root();
            self.origins.insert(id.clone(), Origin::Root);
            return id;
        };
        // pre-order guarantees the parent was assigned first
        let parent_id = self
            .assigned
            .get(&parent)
            .cloned()
            .unwrap_or_else(StableId::root);
        let kind = graph.kind(node).unwrap_or(ElementKind::Application);
        let ordinal = same_kind_ordinal(graph, parent, feature, node);
        let id = StableId::new(format!(
            "@{}/{}/{}.{}",
            parent_id.as_str().trim_start_matches('@'),
            feature,
            kind,
            ordinal
        ));
        self.origins.insert(
            id.clone(),
            Origin::Positional {
                parent: parent_id,
                feature: feature.to_string(),
                kind,
                ordinal,
            },
        );
        id
    }

    /// Id of `node`, assigning a session-local id on first sight
    pub fn id_of(&mut self, graph: &Graph, node: NodeId) -> StableId {
        if let Some(id) = self.assigned.get(&node) {
            return id.clone();
        }
        let id = match graph.stable_id(node) {
            Some(explicit) => StableId::new(explicit),
            None => {
                self.next_local += 1;
                StableId::new(format!("+{}.{}", self.prefix, self.next_local))
            }
        };
        self.assigned.insert(node, id.clone());
        id
    }

    /// Id of `node` if one was already assigned
    pub fn peek(&self, node: NodeId) -> Option<&StableId> {
        self.assigned.get(&node)
    }

    pub fn origin(&self, id: &StableId) -> Option<&Origin> {
        self.origins.get(id)
    }

    pub fn origins(&self) -> &Origins {
        &self.origins
    }

    /// Locate the counterpart of a `source` element in `target`
    pub fn match_across(
        &mut self,
        source: &Graph,
        node: NodeId,
        target: &Graph,
        strategy: &dyn MatchStrategy,
    ) -> Option<NodeId> {
        let id = self.id_of(source, node);
        let found = strategy.resolve(target, &id, &self.origins)?;
        (target.kind(found) == source.kind(node)).then_some(found)
    }
}

/// Direct lookup of an application-assigned id
pub fn find(graph: &Graph, id: &StableId) -> Option<NodeId> {
    graph.find_by_stable_id(id.as_str())
}

/// Number of same-kind siblings preceding `node` in `parent.feature`
pub(crate) fn same_kind_ordinal(graph: &Graph, parent: NodeId, feature: &str, node: NodeId) -> usize {
    let kind = graph.kind(node);
    graph
        .list(parent, feature)
        .iter()
        .take_while(|n| **n != node)
        .filter(|n| graph.kind(**n) == kind)
        .count()
}

/// Smallest origin table covering `ids` and every positional parent they
/// depend on
pub fn close_origins<'a>(origins: &Origins, ids: impl IntoIterator<Item = &'a StableId>) -> Origins {
    let mut out = Origins::new();
    let mut pending: Vec<&StableId> = ids.into_iter().collect();
    while let Some(id) = pending.pop() {
        if out.contains_key(id) {
            continue;
        }
        let Some(origin) = origins.get(id) else {
            continue;
        };
        if let Origin::Positional { parent, .. } = origin {
            pending.push(parent);
        }
        out.insert(id.clone(), origin.clone());
    }
    out
}

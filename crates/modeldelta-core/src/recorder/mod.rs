//! Change recording: snapshot a graph, then report how the live graph has
//! diverged from that snapshot.

pub mod list_diff;
pub mod snapshot;

pub use snapshot::{ElementState, Snapshot};

use crate::delta::codec;
use crate::delta::model::{Change, ChangeSet, ElementDefinition, ListItem, SetValue};
use crate::delta::Document;
use crate::errors::Result;
use crate::identity::{close_origins, IdentityMap, StableId};
use crate::model::{Graph, NodeId};
use crate::schema::FeatureType;
use crate::{log_op_end, log_op_start};
use chrono::{DateTime, Utc};
use modeldelta_core_types::SessionId;
use std::collections::BTreeSet;
use std::time::Instant;

/// An active recording over one graph instance
///
/// The session owns the baseline snapshot and the identity registry; the
/// graph stays owned by the caller and is passed in on every query.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    started_at: DateTime<Utc>,
    snapshot: Snapshot,
    identity: IdentityMap,
}

/// Start recording changes to `graph`
///
/// Captures every attribute value, reference target id and list id
/// sequence of every element reachable now.
pub fn begin_recording(graph: &Graph) -> Session {
    let start = Instant::now();
    let id = SessionId::new();
    log_op_start!("begin_recording", session_id = %id);

    let mut identity = IdentityMap::new(&id);
    let snapshot = Snapshot::capture(graph, &mut identity);

    log_op_end!(
        "begin_recording",
        duration_ms = start.elapsed().as_millis() as u64,
        element_count = snapshot.len()
    );
    Session {
        id,
        started_at: Utc::now(),
        snapshot,
        identity,
    }
}

impl Session {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Differences between the live `graph` and the baseline snapshot
    ///
    /// Computed on demand; repeated calls on an unchanged graph return equal
    /// change sets.
    pub fn changes(&mut self, graph: &Graph) -> ChangeSet {
        let start = Instant::now();
        log_op_start!("changes", session_id = %self.id);

        let mut out = ChangeSet::new(self.id.clone());
        for node in graph.reachable() {
            if self.snapshot.contains(node) {
                self.diff_element(graph, node, &mut out.changes);
            }
        }

        let mentioned: BTreeSet<&StableId> = out
            .changes
            .iter()
            .flat_map(|c| std::iter::once(c.element()).chain(c.mentioned_ids()))
            .collect();
        out.origins = close_origins(self.identity.origins(), mentioned);

        log_op_end!(
            "changes",
            duration_ms = start.elapsed().as_millis() as u64,
            entry_count = out.len()
        );
        out
    }

    pub fn has_changes(&mut self, graph: &Graph) -> bool {
        !self.changes(graph).is_empty()
    }

    /// Encode the current change set as a portable document
    pub fn serialize(&mut self, graph: &Graph) -> Result<Document> {
        let changes = self.changes(graph);
        codec::encode(&changes)
    }

    fn diff_element(&mut self, graph: &Graph, node: NodeId, out: &mut Vec<Change>) {
        let Some(current) = ElementState::capture(graph, node, &mut self.identity) else {
            return;
        };
        let Some(baseline) = self.snapshot.get(node) else {
            return;
        };
        if *baseline == current {
            return;
        }
        // the baseline id is authoritative even if the application renamed it
        let element = baseline.id.clone();
        let kind = baseline.kind;

        let mut pending = Vec::new();
        for def in kind.features() {
            let feature = def.name.to_string();
            match def.feature_type {
                FeatureType::Attribute { .. } => {
                    let now = current.attribute(def.name);
                    if baseline.attribute(def.name) != now {
                        pending.push(Change::Set {
                            element: element.clone(),
                            kind,
                            feature,
                            value: SetValue::Attribute(now.cloned()),
                        });
                    }
                }
                FeatureType::Reference => {
                    let now = current.reference(def.name);
                    if baseline.reference(def.name) != now {
                        pending.push(Change::Set {
                            element: element.clone(),
                            kind,
                            feature,
                            value: SetValue::Reference(now.cloned()),
                        });
                    }
                }
                FeatureType::ContainmentList | FeatureType::ReferenceList => {
                    let edit = list_diff::edit_script(
                        baseline.list(def.name),
                        current.list(def.name),
                    );
                    for item in edit.removed {
                        pending.push(Change::Remove {
                            element: element.clone(),
                            kind,
                            feature: feature.clone(),
                            item,
                        });
                    }
                    for (anchor, item) in edit.added {
                        pending.push(Change::Add {
                            element: element.clone(),
                            kind,
                            feature: feature.clone(),
                            anchor,
                            item: ListItem::Existing(item),
                        });
                    }
                }
            }
        }

        for mut change in pending {
            if let Change::Add { feature, item, .. } = &mut change {
                if crate::schema::lookup(kind, feature).is_some_and(|d| d.is_containment()) {
                    let id = item.id().clone();
                    *item = self.list_item(graph, node, feature, &id);
                }
            }
            out.push(change);
        }
    }

    /// Member of a containment list: baseline elements by id, new elements
    /// captured whole
    fn list_item(&mut self, graph: &Graph, owner: NodeId, feature: &str, id: &StableId) -> ListItem {
        let member = graph
            .list(owner, feature)
            .iter()
            .copied()
            .find(|m| self.identity.peek(*m) == Some(id));
        member
            .filter(|node| !self.snapshot.contains(*node))
            .and_then(|node| self.define(graph, node))
            .map_or_else(|| ListItem::Existing(id.clone()), |def| ListItem::New(Box::new(def)))
    }

    fn define(&mut self, graph: &Graph, node: NodeId) -> Option<ElementDefinition> {
        let state = ElementState::capture(graph, node, &mut self.identity)?;
        let kind = state.kind;
        let explicit = graph.stable_id(node) == Some(state.id.as_str());
        let mut def = ElementDefinition::new(state.id, explicit, kind);
        def.attributes = state.attributes;
        def.references = state.references;
        for feature in kind.features() {
            match feature.feature_type {
                FeatureType::ReferenceList => {
                    let ids: Vec<StableId> = graph
                        .list(node, feature.name)
                        .iter()
                        .map(|m| self.identity.id_of(graph, *m))
                        .collect();
                    if !ids.is_empty() {
                        def.reference_lists.insert(feature.name.to_string(), ids);
                    }
                }
                FeatureType::ContainmentList => {
                    let mut items = Vec::new();
                    for child in graph.list(node, feature.name).to_vec() {
                        let new_child = if self.snapshot.contains(child) {
                            None
                        } else {
                            self.define(graph, child)
                        };
                        items.push(match new_child {
                            Some(child_def) => ListItem::New(Box::new(child_def)),
                            None => ListItem::Existing(self.identity.id_of(graph, child)),
                        });
                    }
                    if !items.is_empty() {
                        def.children.insert(feature.name.to_string(), items);
                    }
                }
                _ => {}
            }
        }
        Some(def)
    }
}

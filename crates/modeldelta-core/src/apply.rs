//! Delta application: execute bound operations against the target graph.
//!
//! Operations run sequentially in plan order. A failing operation is
//! recorded and the rest continue; no failure aborts the batch.

use crate::construct::{AddItem, Anchor, FailureStage, Operand, Operation, OperationFailure, Target};
use crate::delta::model::{ElementDefinition, ListItem};
use crate::errors::{DeltaError, Result};
use crate::identity::StableId;
use crate::model::{Graph, NodeId};
use crate::{log_op_end, log_op_start};
use std::collections::BTreeMap;
use std::time::Instant;

/// Aggregate outcome of applying a plan
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyStatus {
    Ok,
    Error(Vec<OperationFailure>),
}

impl ApplyStatus {
    pub fn from_failures(failures: Vec<OperationFailure>) -> Self {
        if failures.is_empty() {
            ApplyStatus::Ok
        } else {
            ApplyStatus::Error(failures)
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ApplyStatus::Ok)
    }

    pub fn failures(&self) -> &[OperationFailure] {
        match self {
            ApplyStatus::Ok => &[],
            ApplyStatus::Error(failures) => failures,
        }
    }

    /// Combine with failures from another stage, ordered by stage then index
    pub fn merge(self, more: Vec<OperationFailure>) -> Self {
        let mut all = match self {
            ApplyStatus::Ok => Vec::new(),
            ApplyStatus::Error(failures) => failures,
        };
        all.extend(more);
        all.sort_by_key(|f| (f.stage, f.index));
        ApplyStatus::from_failures(all)
    }
}

/// Execute `operations` against `target`
///
/// Operations whose feature is named in `filters` are skipped entirely.
/// Features inside inline definitions of new elements are never filtered.
/// References out of inline definitions are linked after every operation
/// has run, so they may point at elements created later in the batch.
pub fn apply(target: &mut Graph, operations: &[Operation], filters: &[&str]) -> ApplyStatus {
    let start = Instant::now();
    log_op_start!("apply", operation_count = operations.len());

    let mut run = Run::default();
    for (index, op) in operations.iter().enumerate() {
        if filters.contains(&op.feature()) {
            tracing::debug!(index, feature = op.feature(), "operation filtered out");
            continue;
        }
        if let Err(error) = run.execute(target, index, op) {
            tracing::warn!(index, operation = %op, error = %error, "operation failed");
            run.fail(index, op.to_string(), error);
        }
    }
    run.link(target);

    log_op_end!(
        "apply",
        duration_ms = start.elapsed().as_millis() as u64,
        failure_count = run.failures.len()
    );
    ApplyStatus::from_failures(run.failures)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Reference,
    ReferenceList,
}

/// Reference out of an inline definition awaiting its target
struct PendingLink {
    index: usize,
    node: NodeId,
    feature: String,
    kind: LinkKind,
    ids: Vec<StableId>,
}

#[derive(Default)]
struct Run {
    created: BTreeMap<StableId, NodeId>,
    bindings: BTreeMap<StableId, NodeId>,
    pending: Vec<PendingLink>,
    failures: Vec<OperationFailure>,
}

impl Run {
    fn fail(&mut self, index: usize, description: String, error: DeltaError) {
        self.failures.push(OperationFailure {
            stage: FailureStage::Apply,
            index,
            description,
            error,
        });
    }

    fn lookup(&self, target: &Graph, t: &Target) -> Option<NodeId> {
        match t {
            Target::Existing(node) => target.get(*node).map(|_| *node),
            Target::Created(id) => self.created.get(id).copied(),
            Target::Unbound(id) => self.lookup_id(target, id),
        }
    }

    fn lookup_id(&self, target: &Graph, id: &StableId) -> Option<NodeId> {
        self.created
            .get(id)
            .or_else(|| self.bindings.get(id))
            .copied()
            .or_else(|| target.find_by_stable_id(id.as_str()))
    }

    fn bind(&self, target: &Graph, t: &Target) -> Result<NodeId> {
        self.lookup(target, t).ok_or_else(|| match t {
            Target::Existing(node) => DeltaError::NodeNotFound {
                node: node.to_string(),
            },
            Target::Created(id) | Target::Unbound(id) => DeltaError::unresolved(id.as_str()),
        })
    }

    fn execute(&mut self, target: &mut Graph, index: usize, op: &Operation) -> Result<()> {
        match op {
            Operation::Set {
                element,
                feature,
                value,
            } => {
                let node = self.bind(target, element)?;
                match value {
                    Operand::Attribute(Some(v)) => target.set_attribute(node, feature, v.clone()),
                    Operand::Attribute(None) => target.unset_attribute(node, feature),
                    Operand::Reference(Some(t)) => {
                        let referenced = self.bind(target, t)?;
                        target.set_reference(node, feature, Some(referenced))
                    }
                    Operand::Reference(None) => target.set_reference(node, feature, None),
                }
            }
            Operation::Add {
                owner,
                feature,
                anchor,
                item,
            } => {
                let owner = self.bind(target, owner)?;
                let item = match item {
                    AddItem::Existing(t) => self.bind(target, t)?,
                    AddItem::Create {
                        definition,
                        bindings,
                    } => {
                        self.bindings
                            .extend(bindings.iter().map(|(k, v)| (k.clone(), *v)));
                        self.materialize(target, index, definition)
                    }
                };
                let position = self.position(target, owner, feature, anchor, item);
                target.insert(owner, feature, position, item)
            }
            Operation::Remove {
                owner,
                feature,
                item,
            } => {
                if !target.remove(*owner, feature, *item)? {
                    tracing::debug!(index, "removal target already gone");
                }
                Ok(())
            }
        }
    }

    /// Index at which `item` goes, computed on the list without `item`
    fn position(
        &self,
        target: &Graph,
        owner: NodeId,
        feature: &str,
        anchor: &Anchor,
        item: NodeId,
    ) -> usize {
        let others: Vec<NodeId> = target
            .list(owner, feature)
            .iter()
            .copied()
            .filter(|n| *n != item)
            .collect();
        let Anchor::After(anchor) = anchor else {
            return 0;
        };
        if let Some(pos) = self
            .lookup(target, anchor)
            .and_then(|a| others.iter().position(|n| *n == a))
        {
            return pos + 1;
        }
        // anchor gone: end of the run of the item's own kind
        let kind = target.kind(item);
        others
            .iter()
            .rposition(|n| target.kind(*n) == kind)
            .map_or(others.len(), |p| p + 1)
    }

    /// Create the element described by `def` and its nested definitions
    ///
    /// Feature failures inside the definition are recorded against `index`
    /// without aborting the creation.
    fn materialize(&mut self, target: &mut Graph, index: usize, def: &ElementDefinition) -> NodeId {
        let node = if def.explicit {
            target.create_with_id(def.kind, def.id.as_str())
        } else {
            target.create(def.kind)
        };
        self.created.insert(def.id.clone(), node);

        for (name, value) in &def.attributes {
            if let Err(error) = target.set_attribute(node, name, value.clone()) {
                self.fail(index, format!("attribute {} of new `{}`", name, def.id), error);
            }
        }
        for (name, id) in &def.references {
            self.pending.push(PendingLink {
                index,
                node,
                feature: name.clone(),
                kind: LinkKind::Reference,
                ids: vec![id.clone()],
            });
        }
        for (name, ids) in &def.reference_lists {
            self.pending.push(PendingLink {
                index,
                node,
                feature: name.clone(),
                kind: LinkKind::ReferenceList,
                ids: ids.clone(),
            });
        }
        for (name, items) in &def.children {
            for item in items {
                let child = match item {
                    ListItem::New(child) => Some(self.materialize(target, index, child)),
                    ListItem::Existing(id) => self.lookup_id(target, id),
                };
                let result = match child {
                    Some(child) => target.append(node, name, child),
                    None => Err(DeltaError::unresolved(item.id().as_str())),
                };
                if let Err(error) = result {
                    self.fail(index, format!("child {} of new `{}`", item.id(), def.id), error);
                }
            }
        }
        node
    }

    /// Resolve references collected from inline definitions
    fn link(&mut self, target: &mut Graph) {
        for link in std::mem::take(&mut self.pending) {
            for id in &link.ids {
                let result = match self.lookup_id(target, id) {
                    Some(referenced) => match link.kind {
                        LinkKind::Reference => {
                            target.set_reference(link.node, &link.feature, Some(referenced))
                        }
                        LinkKind::ReferenceList => target.append(link.node, &link.feature, referenced),
                    },
                    None => Err(DeltaError::unresolved(id.as_str())),
                };
                if let Err(error) = result {
                    self.fail(
                        link.index,
                        format!("link {} of new element {}", link.feature, link.node),
                        error,
                    );
                }
            }
        }
    }
}

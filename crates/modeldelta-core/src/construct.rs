//! Delta construction: bind a change set to one target graph.
//!
//! Every stable id is resolved against the target *before* anything is
//! applied, so positional matches see the target exactly as it was loaded.

use crate::apply::{self, ApplyStatus};
use crate::delta::model::{Change, ChangeSet, ElementDefinition, ListItem, SetValue};
use crate::errors::DeltaError;
use crate::identity::{MatchStrategy, Origins, PositionalMatch, StableId};
use crate::model::{Graph, NodeId, Scalar};
use crate::schema::{self, ElementKind};
use crate::{log_op_end, log_op_start};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Instant;

/// Element an operation acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Matched element of the target graph
    Existing(NodeId),
    /// Element materialized by an earlier operation of the same plan
    Created(StableId),
    /// Not matched when the plan was built; looked up again at apply time
    Unbound(StableId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Existing(node) => write!(f, "{}", node),
            Target::Created(id) => write!(f, "new `{}`", id),
            Target::Unbound(id) => write!(f, "`{}`", id),
        }
    }
}

/// Insertion point of an add
///
/// When an `After` anchor is no longer in the list at apply time, the item
/// goes after the last member of its own kind, or at the end of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Head,
    After(Target),
}

/// Operand of a set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Attribute(Option<Scalar>),
    Reference(Option<Target>),
}

/// What an add inserts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddItem {
    /// Move or link an element that already exists
    Existing(Target),
    /// Materialize a new element from its inline definition
    Create {
        definition: Box<ElementDefinition>,
        /// Ids mentioned inside the definition that matched in the target
        bindings: BTreeMap<StableId, NodeId>,
    },
}

/// Directly executable operation bound to one target graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Set {
        element: Target,
        feature: String,
        value: Operand,
    },
    Add {
        owner: Target,
        feature: String,
        anchor: Anchor,
        item: AddItem,
    },
    Remove {
        owner: NodeId,
        feature: String,
        item: NodeId,
    },
}

impl Operation {
    pub fn feature(&self) -> &str {
        match self {
            Operation::Set { feature, .. }
            | Operation::Add { feature, .. }
            | Operation::Remove { feature, .. } => feature,
        }
    }

    /// Plan position group; reference-list adds are moved to 2 by the caller
    fn rank(&self) -> u8 {
        match self {
            Operation::Remove { .. } => 0,
            Operation::Add { .. } => 1,
            Operation::Set { .. } => 3,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Set {
                element, feature, ..
            } => write!(f, "set {} on {}", feature, element),
            Operation::Add {
                owner,
                feature,
                item,
                ..
            } => match item {
                AddItem::Existing(t) => write!(f, "add {} to {}.{}", t, owner, feature),
                AddItem::Create { definition, .. } => write!(
                    f,
                    "create {} `{}` in {}.{}",
                    definition.kind, definition.id, owner, feature
                ),
            },
            Operation::Remove {
                owner,
                feature,
                item,
            } => write!(f, "remove {} from {}.{}", item, owner, feature),
        }
    }
}

/// Stage of the pipeline that reported a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureStage {
    Decode,
    Construct,
    Apply,
}

/// One entry or operation that could not be carried out
#[derive(Debug, Clone, PartialEq)]
pub struct OperationFailure {
    pub stage: FailureStage,
    /// Entry index (decode/construct) or operation index (apply)
    pub index: usize,
    pub description: String,
    pub error: DeltaError,
}

/// Operations bound to one target, plus entries that could not be bound
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeltaPlan {
    pub operations: Vec<Operation>,
    pub unresolved: Vec<OperationFailure>,
}

impl DeltaPlan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.unresolved.is_empty()
    }

    /// Apply the operations and fold construct-time failures into the status
    pub fn apply(&self, target: &mut Graph, filters: &[&str]) -> ApplyStatus {
        let status = apply::apply(target, &self.operations, filters);
        status.merge(self.unresolved.clone())
    }
}

/// Bind `change_set` to `target` using positional matching
pub fn construct_deltas(target: &Graph, change_set: &ChangeSet) -> DeltaPlan {
    construct_deltas_with(target, change_set, &PositionalMatch)
}

/// Bind `change_set` to `target` with an explicit matching strategy
///
/// Operations come out ordered: removals, containment additions,
/// reference-list additions, sets. Within each group recording order is kept.
pub fn construct_deltas_with(
    target: &Graph,
    change_set: &ChangeSet,
    strategy: &dyn MatchStrategy,
) -> DeltaPlan {
    let start = Instant::now();
    log_op_start!(
        "construct_deltas",
        session_id = %change_set.session_id,
        entry_count = change_set.len()
    );

    let mut binder = Binder {
        target,
        strategy,
        origins: &change_set.origins,
        created: BTreeSet::new(),
        defined: defined_ids(change_set),
        cache: BTreeMap::new(),
    };
    let mut ranked: Vec<(u8, Operation)> = Vec::new();
    let mut unresolved = Vec::new();

    for (index, change) in change_set.iter().enumerate() {
        match binder.bind(change) {
            Ok(Some(op)) => {
                let mut rank = op.rank();
                if rank == 1 && !is_containment(change.kind(), change.feature()) {
                    rank = 2;
                }
                ranked.push((rank, op));
            }
            Ok(None) => {
                tracing::debug!(index, element = %change.element(), feature = change.feature(),
                    "entry needs no operation on this target");
            }
            Err(error) => {
                tracing::warn!(index, element = %change.element(), error = %error, "entry not bound");
                unresolved.push(OperationFailure {
                    stage: FailureStage::Construct,
                    index,
                    description: format!(
                        "{} {}.{} on `{}`",
                        change.op_name(),
                        change.kind(),
                        change.feature(),
                        change.element()
                    ),
                    error,
                });
            }
        }
    }

    // stable sort keeps recording order within a group
    ranked.sort_by_key(|(rank, _)| *rank);
    let operations: Vec<Operation> = ranked.into_iter().map(|(_, op)| op).collect();

    log_op_end!(
        "construct_deltas",
        duration_ms = start.elapsed().as_millis() as u64,
        operation_count = operations.len(),
        failure_count = unresolved.len()
    );
    DeltaPlan {
        operations,
        unresolved,
    }
}

/// Ids of every element some inline definition of the change set creates
fn defined_ids(change_set: &ChangeSet) -> BTreeSet<StableId> {
    change_set
        .iter()
        .filter_map(|change| match change {
            Change::Add {
                item: ListItem::New(def),
                ..
            } => Some(def),
            _ => None,
        })
        .flat_map(|def| def.walk())
        .map(|def| def.id.clone())
        .collect()
}

fn is_containment(kind: ElementKind, feature: &str) -> bool {
    schema::lookup(kind, feature).is_some_and(|d| d.is_containment())
}

struct Binder<'a> {
    target: &'a Graph,
    strategy: &'a dyn MatchStrategy,
    origins: &'a Origins,
    /// Ids of new elements an earlier add of this plan will materialize
    created: BTreeSet<StableId>,
    /// Ids defined anywhere in the change set, in any order
    defined: BTreeSet<StableId>,
    cache: BTreeMap<StableId, Option<NodeId>>,
}

impl Binder<'_> {
    fn resolve(&mut self, id: &StableId) -> Option<NodeId> {
        if let Some(hit) = self.cache.get(id) {
            return *hit;
        }
        let found = self.strategy.resolve(self.target, id, self.origins);
        self.cache.insert(id.clone(), found);
        found
    }

    /// Resolve an element the change is addressed to, checking its kind
    fn element(&mut self, id: &StableId, kind: ElementKind) -> Option<Target> {
        if self.created.contains(id) {
            return Some(Target::Created(id.clone()));
        }
        self.resolve(id)
            .filter(|n| self.target.kind(*n) == Some(kind))
            .map(Target::Existing)
    }

    /// Resolve an operand id, deferring misses to apply time
    fn operand(&mut self, id: &StableId) -> Target {
        if self.created.contains(id) {
            return Target::Created(id.clone());
        }
        match self.resolve(id) {
            Some(node) => Target::Existing(node),
            None => Target::Unbound(id.clone()),
        }
    }

    fn bind(&mut self, change: &Change) -> Result<Option<Operation>, DeltaError> {
        match change {
            Change::Set {
                element,
                kind,
                feature,
                value,
            } => {
                let target = self
                    .element(element, *kind)
                    .ok_or_else(|| DeltaError::unresolved(element.as_str()))?;
                let value = match value {
                    SetValue::Attribute(v) => Operand::Attribute(v.clone()),
                    SetValue::Reference(r) => Operand::Reference(r.as_ref().map(|id| self.operand(id))),
                };
                Ok(Some(Operation::Set {
                    element: target,
                    feature: feature.clone(),
                    value,
                }))
            }
            Change::Add {
                element,
                kind,
                feature,
                anchor,
                item,
            } => {
                let owner = self
                    .element(element, *kind)
                    .ok_or_else(|| DeltaError::unresolved(element.as_str()))?;
                let anchor = match anchor {
                    None => Anchor::Head,
                    Some(id) => Anchor::After(self.operand(id)),
                };
                let item = match item {
                    ListItem::Existing(id) => match self.operand(id) {
                        // created by a containment add, which runs first
                        Target::Unbound(_) if self.defined.contains(id) => {
                            AddItem::Existing(Target::Created(id.clone()))
                        }
                        Target::Unbound(_) => return Err(DeltaError::unresolved(id.as_str())),
                        bound => AddItem::Existing(bound),
                    },
                    ListItem::New(def) => self.bind_new(def),
                };
                Ok(Some(Operation::Add {
                    owner,
                    feature: feature.clone(),
                    anchor,
                    item,
                }))
            }
            Change::Remove {
                element,
                kind,
                feature,
                item,
            } => {
                // a removal that cannot be matched has already happened
                let Some(Target::Existing(owner)) = self.element(element, *kind) else {
                    return Ok(None);
                };
                let Some(member) = self.resolve(item) else {
                    return Ok(None);
                };
                if !self.target.list(owner, feature).contains(&member) {
                    return Ok(None);
                }
                Ok(Some(Operation::Remove {
                    owner,
                    feature: feature.clone(),
                    item: member,
                }))
            }
        }
    }

    /// A new element whose application id already exists in the target is
    /// moved instead of recreated; its recorded features are not applied.
    fn bind_new(&mut self, def: &ElementDefinition) -> AddItem {
        if def.explicit {
            if let Some(node) = self.target.find_by_stable_id(def.id.as_str()) {
                if self.target.kind(node) == Some(def.kind) {
                    return AddItem::Existing(Target::Existing(node));
                }
            }
        }
        for nested in def.walk() {
            self.created.insert(nested.id.clone());
        }
        let mut bindings = BTreeMap::new();
        for id in def.mentioned_ids() {
            if self.created.contains(id) {
                continue;
            }
            if let Some(node) = self.resolve(id) {
                bindings.insert(id.clone(), node);
            }
        }
        AddItem::Create {
            definition: Box::new(def.clone()),
            bindings,
        }
    }
}

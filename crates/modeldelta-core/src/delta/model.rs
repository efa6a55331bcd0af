//! Change set types produced by the recorder and consumed by the constructor.
//!
//! Everything here is expressed in stable ids, never arena handles, so a
//! change set is meaningful against any instance of the graph.

use crate::identity::{Origins, StableId};
use crate::model::Scalar;
use crate::schema::ElementKind;
use modeldelta_core_types::SessionId;
use std::collections::BTreeMap;

/// New value of a single-valued feature; `None` unsets / clears it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValue {
    Attribute(Option<Scalar>),
    Reference(Option<StableId>),
}

/// Member added to a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
    /// Element that existed when recording began (or is defined elsewhere)
    Existing(StableId),
    /// Element created during recording, captured whole
    New(Box<ElementDefinition>),
}

impl ListItem {
    pub fn id(&self) -> &StableId {
        match self {
            ListItem::Existing(id) => id,
            ListItem::New(def) => &def.id,
        }
    }
}

/// Complete inline description of a newly created element
///
/// Attributes at their schema default are omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDefinition {
    pub id: StableId,
    /// `id` was assigned by the application rather than synthesized
    pub explicit: bool,
    pub kind: ElementKind,
    pub attributes: BTreeMap<String, Scalar>,
    pub references: BTreeMap<String, StableId>,
    pub reference_lists: BTreeMap<String, Vec<StableId>>,
    pub children: BTreeMap<String, Vec<ListItem>>,
}

impl ElementDefinition {
    pub fn new(id: StableId, explicit: bool, kind: ElementKind) -> Self {
        Self {
            id,
            explicit,
            kind,
            attributes: BTreeMap::new(),
            references: BTreeMap::new(),
            reference_lists: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// This definition and every nested new definition, pre-order
    pub fn walk(&self) -> Vec<&ElementDefinition> {
        let mut out = vec![self];
        for items in self.children.values() {
            for item in items {
                if let ListItem::New(def) = item {
                    out.extend(def.walk());
                }
            }
        }
        out
    }

    /// Every stable id this definition points at (references, reference
    /// list members, pre-existing children), nested definitions included
    pub fn mentioned_ids(&self) -> Vec<&StableId> {
        let mut out = Vec::new();
        for def in self.walk() {
            out.extend(def.references.values());
            out.extend(def.reference_lists.values().flatten());
            for item in def.children.values().flatten() {
                if let ListItem::Existing(id) = item {
                    out.push(id);
                }
            }
        }
        out
    }
}

/// One recorded difference, addressed by the owning element's stable id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Set {
        element: StableId,
        kind: ElementKind,
        feature: String,
        value: SetValue,
    },
    /// Insert `item` directly after `anchor` (`None` = head of list)
    Add {
        element: StableId,
        kind: ElementKind,
        feature: String,
        anchor: Option<StableId>,
        item: ListItem,
    },
    Remove {
        element: StableId,
        kind: ElementKind,
        feature: String,
        item: StableId,
    },
}

impl Change {
    pub fn element(&self) -> &StableId {
        match self {
            Change::Set { element, .. }
            | Change::Add { element, .. }
            | Change::Remove { element, .. } => element,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Change::Set { kind, .. } | Change::Add { kind, .. } | Change::Remove { kind, .. } => {
                *kind
            }
        }
    }

    pub fn feature(&self) -> &str {
        match self {
            Change::Set { feature, .. }
            | Change::Add { feature, .. }
            | Change::Remove { feature, .. } => feature,
        }
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            Change::Set { .. } => "set",
            Change::Add { .. } => "add",
            Change::Remove { .. } => "remove",
        }
    }

    /// Stable ids this change mentions besides its own element
    pub fn mentioned_ids(&self) -> Vec<&StableId> {
        match self {
            Change::Set {
                value: SetValue::Reference(Some(id)),
                ..
            } => vec![id],
            Change::Set { .. } => Vec::new(),
            Change::Add { anchor, item, .. } => {
                let mut out: Vec<&StableId> = anchor.iter().collect();
                match item {
                    ListItem::Existing(id) => out.push(id),
                    ListItem::New(def) => out.extend(def.mentioned_ids()),
                }
                out
            }
            Change::Remove { item, .. } => vec![item],
        }
    }
}

/// Ordered differences recorded in one session
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub session_id: SessionId,
    pub changes: Vec<Change>,
    /// Origins of every synthesized baseline id the changes mention
    pub origins: Origins,
}

impl ChangeSet {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            changes: Vec::new(),
            origins: Origins::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_definition() -> ElementDefinition {
        let mut child = ElementDefinition::new(StableId::from("+abc.2"), false, ElementKind::Part);
        child.references.insert("ref".into(), StableId::from("editor"));
        let mut stack = ElementDefinition::new(StableId::from("+abc.1"), false, ElementKind::PartStack);
        stack.children.insert(
            "children".into(),
            vec![
                ListItem::New(Box::new(child)),
                ListItem::Existing(StableId::from("@root/children/Window.0/children/Part.0")),
            ],
        );
        stack
            .reference_lists
            .insert("activation_order".into(), vec![StableId::from("+abc.2")]);
        stack
    }

    #[test]
    fn test_walk_visits_nested_definitions() {
        let def = nested_definition();
        let ids: Vec<&str> = def.walk().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["+abc.1", "+abc.2"]);
    }

    #[test]
    fn test_mentioned_ids_cover_references_and_existing_children() {
        let def = nested_definition();
        let ids: Vec<&str> = def.mentioned_ids().iter().map(|i| i.as_str()).collect();
        assert!(ids.contains(&"editor"));
        assert!(ids.contains(&"+abc.2"));
        assert!(ids.contains(&"@root/children/Window.0/children/Part.0"));
    }

    #[test]
    fn test_change_accessors() {
        let change = Change::Add {
            element: StableId::from("main"),
            kind: ElementKind::Window,
            feature: "children".into(),
            anchor: Some(StableId::from("b")),
            item: ListItem::Existing(StableId::from("d")),
        };
        assert_eq!(change.element().as_str(), "main");
        assert_eq!(change.feature(), "children");
        assert_eq!(change.op_name(), "add");
        assert_eq!(change.mentioned_ids().len(), 2);
    }
}

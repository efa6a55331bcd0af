//! Portable delta document: encoding and schema-tolerant decoding.
//!
//! Each entry is a standalone JSON object so a reader whose schema has
//! drifted can drop the entries it does not understand and keep the rest.

use crate::delta::model::{Change, ChangeSet, ElementDefinition, ListItem, SetValue};
use crate::errors::{DeltaError, Result};
use crate::identity::{Origin, Origins, StableId};
use crate::model::Scalar;
use crate::schema::{self, ElementKind, FeatureType};
use crate::{log_op_end, log_op_error, log_op_start};
use chrono::{DateTime, Utc};
use modeldelta_core_types::SessionId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Instant;

/// Version written by [`encode`]; the only version [`decode`] accepts
pub const FORMAT_VERSION: u32 = 1;

/// Serialized change set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub format_version: u32,
    pub session_id: SessionId,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub origins: BTreeMap<String, serde_json::Value>,
    pub entries: Vec<serde_json::Value>,
}

impl Document {
    /// Canonical JSON bytes (maps are key-sorted)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a document, rejecting unreadable bytes and foreign versions
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| DeltaError::InvalidDocument {
                reason: e.to_string(),
            })?;
        let version = value
            .get("format_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| DeltaError::InvalidDocument {
                reason: "missing format_version".to_string(),
            })?;
        check_version(u32::try_from(version).unwrap_or(u32::MAX))?;
        serde_json::from_value(value).map_err(|e| DeltaError::InvalidDocument {
            reason: e.to_string(),
        })
    }

    /// SHA-256 of the canonical bytes, lowercase hex
    pub fn digest(&self) -> Result<String> {
        let bytes = self.to_bytes()?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn check_version(found: u32) -> Result<()> {
    if found == FORMAT_VERSION {
        Ok(())
    } else {
        Err(DeltaError::UnsupportedFormatVersion {
            found,
            supported: FORMAT_VERSION,
        })
    }
}

/// Entry that could not be understood by this reader
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedEntry {
    /// Position in `Document::entries`
    pub index: usize,
    /// `true` when only part of the entry (a feature of an inline
    /// definition) was dropped and the entry itself was kept
    pub partial: bool,
    pub error: DeltaError,
}

/// Result of decoding: the understood change set plus what was dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub change_set: ChangeSet,
    pub dropped: Vec<DroppedEntry>,
}

// ===== Wire forms =====

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireOp {
    Set,
    Add,
    Remove,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireEntry {
    op: WireOp,
    element: StableId,
    kind: String,
    feature: String,
    /// Attribute operand; absent on a set means "unset"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Scalar>,
    /// Reference operand; absent on a set means "clear"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<StableId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anchor: Option<StableId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item: Option<WireItem>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireItem {
    Existing(StableId),
    New(Box<WireDefinition>),
}

#[derive(Debug, Serialize, Deserialize)]
struct WireDefinition {
    id: StableId,
    #[serde(default)]
    explicit: bool,
    kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    references: BTreeMap<String, StableId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    reference_lists: BTreeMap<String, Vec<StableId>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<String, Vec<WireItem>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
enum WireOrigin {
    Root,
    Positional {
        parent: StableId,
        feature: String,
        kind: String,
        ordinal: usize,
    },
}

// ===== Encoding =====

/// Encode a change set, stamped with the current time
pub fn encode(change_set: &ChangeSet) -> Result<Document> {
    let origins = change_set
        .origins
        .iter()
        .map(|(id, origin)| -> Result<(String, serde_json::Value)> {
            Ok((id.as_str().to_string(), serde_json::to_value(wire_origin(origin))?))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;
    let entries = change_set
        .iter()
        .map(|change| -> Result<serde_json::Value> { Ok(serde_json::to_value(wire_entry(change)?)?) })
        .collect::<Result<Vec<_>>>()?;
    Ok(Document {
        format_version: FORMAT_VERSION,
        session_id: change_set.session_id.clone(),
        recorded_at: Utc::now(),
        origins,
        entries,
    })
}

fn wire_origin(origin: &Origin) -> WireOrigin {
    match origin {
        Origin::Root => WireOrigin::Root,
        Origin::Positional {
            parent,
            feature,
            kind,
            ordinal,
        } => WireOrigin::Positional {
            parent: parent.clone(),
            feature: feature.clone(),
            kind: kind.name().to_string(),
            ordinal: *ordinal,
        },
    }
}

fn wire_entry(change: &Change) -> Result<WireEntry> {
    let mut entry = WireEntry {
        op: WireOp::Set,
        element: change.element().clone(),
        kind: change.kind().name().to_string(),
        feature: change.feature().to_string(),
        value: None,
        target: None,
        anchor: None,
        item: None,
    };
    match change {
        Change::Set { value, .. } => match value {
            SetValue::Attribute(v) => entry.value = v.clone(),
            SetValue::Reference(t) => entry.target = t.clone(),
        },
        Change::Add { anchor, item, .. } => {
            entry.op = WireOp::Add;
            entry.anchor = anchor.clone();
            entry.item = Some(wire_item(item)?);
        }
        Change::Remove { item, .. } => {
            entry.op = WireOp::Remove;
            entry.item = Some(WireItem::Existing(item.clone()));
        }
    }
    Ok(entry)
}

fn wire_item(item: &ListItem) -> Result<WireItem> {
    Ok(match item {
        ListItem::Existing(id) => WireItem::Existing(id.clone()),
        ListItem::New(def) => WireItem::New(Box::new(wire_definition(def)?)),
    })
}

fn wire_definition(def: &ElementDefinition) -> Result<WireDefinition> {
    let attributes = def
        .attributes
        .iter()
        .map(|(k, v)| -> Result<(String, serde_json::Value)> {
            Ok((k.clone(), serde_json::to_value(v)?))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;
    let children = def
        .children
        .iter()
        .map(|(k, items)| -> Result<(String, Vec<WireItem>)> {
            Ok((k.clone(), items.iter().map(wire_item).collect::<Result<Vec<_>>>()?))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;
    Ok(WireDefinition {
        id: def.id.clone(),
        explicit: def.explicit,
        kind: def.kind.name().to_string(),
        attributes,
        references: def.references.clone(),
        reference_lists: def.reference_lists.clone(),
        children,
    })
}

// ===== Decoding =====

/// Decode a document against the local schema
///
/// Entries naming an unknown kind or feature, or whose feature shape does
/// not fit the operation, are dropped and reported; the rest decode.
///
/// # Errors
/// Only an unsupported `format_version` is fatal.
pub fn decode(document: &Document) -> Result<Decoded> {
    let start = Instant::now();
    log_op_start!("decode", session_id = %document.session_id, entry_count = document.entries.len());

    if let Err(err) = check_version(document.format_version) {
        log_op_error!(
            "decode",
            err.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        return Err(err);
    }

    let mut change_set = ChangeSet::new(document.session_id.clone());
    let mut dropped = Vec::new();

    change_set.origins = decode_origins(&document.origins);

    for (index, raw) in document.entries.iter().enumerate() {
        let mut partial = Vec::new();
        match decode_entry(raw, &mut partial) {
            Ok(change) => change_set.changes.push(change),
            Err(error) => {
                tracing::warn!(index, error = %error, "dropping undecodable delta entry");
                dropped.push(DroppedEntry {
                    index,
                    partial: false,
                    error,
                });
            }
        }
        for error in partial {
            tracing::warn!(index, error = %error, "dropping part of inline definition");
            dropped.push(DroppedEntry {
                index,
                partial: true,
                error,
            });
        }
    }

    log_op_end!(
        "decode",
        duration_ms = start.elapsed().as_millis() as u64,
        entry_count = change_set.len(),
        dropped_count = dropped.len()
    );
    Ok(Decoded {
        change_set,
        dropped,
    })
}

fn decode_origins(raw: &BTreeMap<String, serde_json::Value>) -> Origins {
    let mut origins = Origins::new();
    for (id, value) in raw {
        let origin = match serde_json::from_value::<WireOrigin>(value.clone()) {
            Ok(WireOrigin::Root) => Some(Origin::Root),
            Ok(WireOrigin::Positional {
                parent,
                feature,
                kind,
                ordinal,
            }) => ElementKind::from_name(&kind).map(|kind| Origin::Positional {
                parent,
                feature,
                kind,
                ordinal,
            }),
            Err(_) => None,
        };
        match origin {
            Some(origin) => {
                origins.insert(StableId::new(id.clone()), origin);
            }
            // the id simply stays unmatchable positionally
            None => tracing::debug!(id = %id, "ignoring unreadable origin"),
        }
    }
    origins
}

fn decode_entry(raw: &serde_json::Value, partial: &mut Vec<DeltaError>) -> Result<Change> {
    let wire: WireEntry =
        serde_json::from_value(raw.clone()).map_err(|e| DeltaError::InvalidDocument {
            reason: e.to_string(),
        })?;
    let kind = parse_kind(&wire.kind)?;
    let def = schema::lookup(kind, &wire.feature)
        .ok_or_else(|| DeltaError::unknown_feature(kind, &wire.feature))?;
    let feature = wire.feature;

    match wire.op {
        WireOp::Set => {
            let value = match def.feature_type {
                FeatureType::Attribute { value_type, .. } => {
                    if let Some(v) = &wire.value {
                        if !value_type.accepts(v) {
                            return Err(DeltaError::type_mismatch(
                                &feature,
                                value_type.name(),
                                v.type_name(),
                            ));
                        }
                    }
                    SetValue::Attribute(wire.value)
                }
                FeatureType::Reference => SetValue::Reference(wire.target),
                other => {
                    return Err(DeltaError::type_mismatch(
                        &feature,
                        "attribute or reference",
                        other.name(),
                    ))
                }
            };
            Ok(Change::Set {
                element: wire.element,
                kind,
                feature,
                value,
            })
        }
        WireOp::Add => {
            if !def.is_list() {
                return Err(DeltaError::type_mismatch(&feature, "list", def.feature_type.name()));
            }
            let item = match wire.item {
                Some(WireItem::Existing(id)) => ListItem::Existing(id),
                Some(WireItem::New(wd)) if def.is_containment() => {
                    ListItem::New(Box::new(decode_definition(*wd, partial)?))
                }
                Some(WireItem::New(_)) => {
                    return Err(DeltaError::type_mismatch(
                        &feature,
                        "containment list",
                        def.feature_type.name(),
                    ))
                }
                None => {
                    return Err(DeltaError::InvalidDocument {
                        reason: "add entry without item".to_string(),
                    })
                }
            };
            Ok(Change::Add {
                element: wire.element,
                kind,
                feature,
                anchor: wire.anchor,
                item,
            })
        }
        WireOp::Remove => {
            if !def.is_list() {
                return Err(DeltaError::type_mismatch(&feature, "list", def.feature_type.name()));
            }
            let Some(WireItem::Existing(item)) = wire.item else {
                return Err(DeltaError::InvalidDocument {
                    reason: "remove entry without item id".to_string(),
                });
            };
            Ok(Change::Remove {
                element: wire.element,
                kind,
                feature,
                item,
            })
        }
    }
}

fn parse_kind(name: &str) -> Result<ElementKind> {
    ElementKind::from_name(name).ok_or_else(|| DeltaError::UnknownElementKind {
        kind: name.to_string(),
    })
}

/// Decode an inline definition, dropping individual unknown features
///
/// An unknown kind fails the definition as a whole.
fn decode_definition(wire: WireDefinition, partial: &mut Vec<DeltaError>) -> Result<ElementDefinition> {
    let kind = parse_kind(&wire.kind)?;
    let mut def = ElementDefinition::new(wire.id, wire.explicit, kind);

    for (name, raw) in wire.attributes {
        let Some(FeatureType::Attribute { value_type, .. }) =
            schema::lookup(kind, &name).map(|d| d.feature_type)
        else {
            partial.push(DeltaError::unknown_feature(kind, &name));
            continue;
        };
        match serde_json::from_value::<Scalar>(raw) {
            Ok(value) if value_type.accepts(&value) => {
                def.attributes.insert(name, value);
            }
            Ok(value) => partial.push(DeltaError::type_mismatch(
                &name,
                value_type.name(),
                value.type_name(),
            )),
            Err(e) => partial.push(DeltaError::InvalidDocument {
                reason: format!("attribute '{}': {}", name, e),
            }),
        }
    }

    for (name, target) in wire.references {
        if fits(kind, &name, |t| t == FeatureType::Reference, partial) {
            def.references.insert(name, target);
        }
    }

    for (name, ids) in wire.reference_lists {
        if fits(kind, &name, |t| t == FeatureType::ReferenceList, partial) {
            def.reference_lists.insert(name, ids);
        }
    }

    for (name, items) in wire.children {
        if !fits(kind, &name, |t| t == FeatureType::ContainmentList, partial) {
            continue;
        }
        let mut decoded = Vec::with_capacity(items.len());
        for item in items {
            match item {
                WireItem::Existing(id) => decoded.push(ListItem::Existing(id)),
                WireItem::New(child) => match decode_definition(*child, partial) {
                    Ok(child) => decoded.push(ListItem::New(Box::new(child))),
                    Err(e) => partial.push(e),
                },
            }
        }
        def.children.insert(name, decoded);
    }

    Ok(def)
}

/// `true` if `kind.name` exists with an accepted shape; records why not
fn fits(
    kind: ElementKind,
    name: &str,
    accept: impl Fn(FeatureType) -> bool,
    partial: &mut Vec<DeltaError>,
) -> bool {
    match schema::lookup(kind, name) {
        Some(def) if accept(def.feature_type) => true,
        Some(def) => {
            partial.push(DeltaError::type_mismatch(name, "matching feature shape", def.feature_type.name()));
            false
        }
        None => {
            partial.push(DeltaError::unknown_feature(kind, name));
            false
        }
    }
}

//! ModelDelta Core - change recording and delta reconciliation for
//! application models
//!
//! This crate provides:
//! - A schema-described graph of typed elements (windows, parts, menus, ...)
//! - A change recorder that diffs a live graph against a baseline snapshot
//! - A versioned, self-describing delta document codec
//! - Stable identity resolution across independently built graphs
//! - Delta construction and application with per-operation failure reporting
//! - Structural validation and Markdown change summaries
//!
//! The usual flow is [`begin_recording`] on the user's graph, then
//! [`recorder::Session::serialize`] once the user is done, and later
//! [`reconcile`] of that document against a freshly built application graph.

pub mod apply;
pub mod construct;
pub mod delta;
pub mod errors;
pub mod identity;
pub mod logging_facility;
pub mod model;
pub mod reconcile;
pub mod recorder;
pub mod rules;
pub mod schema;

// Macros reach schema constants through this path
pub use modeldelta_core_types;

// Re-export commonly used types
pub use apply::{apply, ApplyStatus};
pub use construct::{construct_deltas, construct_deltas_with, DeltaPlan, Operation};
pub use delta::{ChangeSet, Document};
pub use errors::{DeltaError, MdError, MdErrorKind, Result};
pub use identity::StableId;
pub use model::{Graph, NodeId, Scalar};
pub use reconcile::{reconcile, MatchingMode, ReconcileOptions};
pub use recorder::{begin_recording, Session};
pub use schema::ElementKind;

//! Core types shared across ModelDelta facilities
//!
//! This crate provides foundational types used by both the reconciliation
//! engine and the logging facility:
//!
//! - **Correlation types**: SessionId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::SessionId;

//! Content-Addressable Storage (CAS)
//!
//! Provides:
//! - Filesystem-based CAS with atomic writes
//! - Collision detection and read-side integrity checks
//! - Sharding by first 2 hex chars of digest

pub(crate) mod atomic;
mod content_store;
mod sharding;

pub use content_store::{sha256_hex, ContentStore};

//! ModelDelta Store - file-backed persistence for graphs and delta documents
//!
//! Provides:
//! - Atomic file writes (temp file, then rename)
//! - Content-addressed storage for delta documents, sharded by digest prefix
//! - Named graph files validated on load

pub mod cas;
pub mod errors;
pub mod fs_store;

// Re-export key types
pub use errors::Result;
pub use fs_store::FsStore;

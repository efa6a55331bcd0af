//! Error handling for modeldelta-store
//!
//! Wraps modeldelta-core MdError with store-specific helpers

use modeldelta_core::errors::{MdError, MdErrorKind};

/// Result type alias using MdError
pub type Result<T> = std::result::Result<T, MdError>;

/// Create a CAS collision error
pub fn cas_collision(digest: &str) -> MdError {
    MdError::new(MdErrorKind::ConstraintViolation)
        .with_op("cas_write")
        .with_message(format!("CAS collision for digest {}", digest))
}

/// Create a CAS missing blob error
pub fn cas_missing(digest: &str) -> MdError {
    MdError::new(MdErrorKind::NotFound)
        .with_op("cas_read")
        .with_message(format!("CAS blob not found for digest {}", digest))
}

/// Create a CAS integrity error for a blob whose bytes no longer hash to its name
pub fn cas_corrupt(digest: &str, actual: &str) -> MdError {
    MdError::new(MdErrorKind::Persistence)
        .with_op("cas_read")
        .with_message(format!(
            "CAS blob {} is corrupt: content hashes to {}",
            digest, actual
        ))
}

/// Create an error for a digest that is not 64 lowercase hex chars
pub fn invalid_digest(digest: &str) -> MdError {
    MdError::new(MdErrorKind::ConstraintViolation)
        .with_op("cas_read")
        .with_message(format!("Not a SHA-256 hex digest: {:?}", digest))
}

/// Create an error for a graph locator that is not a plain file stem
pub fn invalid_locator(locator: &str) -> MdError {
    MdError::new(MdErrorKind::ConstraintViolation)
        .with_op("graph_path")
        .with_message(format!("Invalid graph locator: {:?}", locator))
}

/// Create a missing graph error
pub fn graph_missing(locator: &str) -> MdError {
    MdError::new(MdErrorKind::NotFound)
        .with_op("load_graph")
        .with_message(format!("No graph stored under {:?}", locator))
}

/// Create a serialization error from serde_json::Error
pub fn from_serde(operation: &str, err: serde_json::Error) -> MdError {
    MdError::new(MdErrorKind::Serialization)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> MdError {
    MdError::new(MdErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

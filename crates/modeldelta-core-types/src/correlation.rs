//! Correlation type for recording sessions
//!
//! A `SessionId` names one recording session and travels inside every delta
//! document it produces, and in the log events of every reconcile call that
//! replays one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a recording session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new SessionId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Short prefix used when synthesizing ids for elements created during
    /// the session.
    ///
    /// UUIDv7 strings start with the timestamp, so the prefix is taken from
    /// the random tail to keep two sessions started in the same millisecond
    /// apart.
    pub fn short(&self) -> &str {
        let len = self.0.len();
        if len > 8 {
            &self.0[len - 8..]
        } else {
            &self.0
        }
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

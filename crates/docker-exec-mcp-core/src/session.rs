//! Session types for interactive exec session management.

use std::time::SystemTime;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Number of exec-id characters kept in a session identifier.
pub const DEFAULT_SESSION_ID_LEN: usize = 12;

/// Identifier of an interactive exec session.
///
/// Derived from the runtime-assigned exec id by keeping its first
/// `len` characters. Two exec ids sharing that prefix map to the same
/// session id; the registry refuses to register the second one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Build a session id by truncating an exec id to `len` characters.
    ///
    /// Exec ids shorter than `len` are used verbatim.
    pub fn from_exec_id(exec_id: &str, len: usize) -> Self {
        Self(exec_id.chars().take(len).collect())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Information about a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session identifier
    pub id: SessionId,
    /// Container the session is bound to
    pub container_name: String,
    /// Full runtime exec identifier
    pub exec_id: String,
    /// Creation time
    pub created_at: SystemTime,
}

impl SessionInfo {
    /// Seconds elapsed since the session was created.
    pub fn age_seconds(&self) -> u64 {
        self.created_at
            .elapsed()
            .map(|age| age.as_secs())
            .unwrap_or_default()
    }
}

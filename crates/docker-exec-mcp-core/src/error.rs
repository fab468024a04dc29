//! Error types for the docker-exec-mcp server.

use thiserror::Error;

use crate::SessionId;

/// Main error type for exec session operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The runtime could not create or attach the exec target
    #[error("Failed to create exec session: {0}")]
    SessionCreate(String),

    /// Writing a command to the session stream failed
    #[error("Failed to write to session: {0}")]
    Write(#[source] std::io::Error),

    /// Reading from the session stream failed (other than EOF or timeout)
    #[error("Failed to read from session: {0}")]
    Read(#[source] std::io::Error),

    /// Session not found
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Session is bound to a different container than the caller named
    #[error("Session {session_id} belongs to container '{bound}', not '{requested}'")]
    ContainerMismatch {
        /// Session identifier
        session_id: SessionId,
        /// Container the session was created against
        bound: String,
        /// Container named by the caller
        requested: String,
    },

    /// Session stream has already been closed
    #[error("Session already closed: {0}")]
    SessionClosed(SessionId),

    /// A live session already uses the truncated identifier
    #[error("Session id collision: {0} is already in use")]
    SessionIdCollision(SessionId),

    /// Session limit reached
    #[error("Session limit reached (max: {0})")]
    SessionLimitReached(usize),

    /// Container runtime connection error
    #[error("Container runtime error: {0}")]
    Runtime(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input or parameters (generic)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether the error reports a missing or foreign session rather than a
    /// runtime failure.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Error::SessionNotFound(_) | Error::ContainerMismatch { .. }
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

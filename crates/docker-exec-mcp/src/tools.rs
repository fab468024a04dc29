//! MCP Tool Types
//!
//! This module defines all MCP tool parameter and response types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use docker_exec_mcp_core::{Error, Result, SessionInfo};

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

// =============================================================================
// Session Lifecycle Tools
// =============================================================================

/// Parameters for create_exec_session
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateSessionParams {
    /// Name or id of the running container to open a shell in
    pub container_name: String,
}

impl CreateSessionParams {
    /// Reject an empty container name.
    pub fn validate(&self) -> Result<()> {
        require("container_name", &self.container_name)
    }
}

/// Response for create_exec_session
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateSessionResponse {
    /// Outcome marker, always "success"
    pub status: String,

    /// Identifier to pass to the other session tools
    pub exec_session_id: String,

    /// Container the session is bound to
    pub container_name: String,
}

/// Parameters for close_exec_session and get_more_session_output
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionParams {
    /// Container the session was created for
    pub container_name: String,

    /// Session identifier returned by create_exec_session
    pub exec_session_id: String,
}

impl SessionParams {
    /// Reject empty identifiers.
    pub fn validate(&self) -> Result<()> {
        require("container_name", &self.container_name)?;
        require("exec_session_id", &self.exec_session_id)
    }
}

/// Response for close_exec_session
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CloseSessionResponse {
    /// Outcome marker, always "success"
    pub status: String,

    /// Session that was closed
    pub exec_session_id: String,
}

/// Parameters for list_exec_sessions
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SessionListParams {}

/// Response for list_exec_sessions
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionListResponse {
    /// Live sessions, oldest first
    pub sessions: Vec<SessionSummary>,

    /// Total count
    pub count: usize,
}

/// Information about a live session
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionSummary {
    /// Session identifier
    pub exec_session_id: String,

    /// Container the session is bound to
    pub container_name: String,

    /// Full runtime exec id
    pub exec_id: String,

    /// Session age in seconds
    pub age_seconds: u64,
}

impl From<SessionInfo> for SessionSummary {
    fn from(info: SessionInfo) -> Self {
        Self {
            age_seconds: info.age_seconds(),
            exec_session_id: info.id.to_string(),
            container_name: info.container_name,
            exec_id: info.exec_id,
        }
    }
}

// =============================================================================
// Command Tools
// =============================================================================

/// Parameters for execute_command_in_session
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteCommandParams {
    /// Container the session was created for
    pub container_name: String,

    /// Session identifier returned by create_exec_session
    pub exec_session_id: String,

    /// Command line sent to the shell (a newline is appended)
    pub cmd: String,

    /// Poll budget in seconds after the initial 2 second wait (default 5,
    /// at most `session.max_command_timeout_secs`)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ExecuteCommandParams {
    /// Reject empty identifiers. An empty `cmd` is allowed and sends a bare
    /// newline.
    pub fn validate(&self) -> Result<()> {
        require("container_name", &self.container_name)?;
        require("exec_session_id", &self.exec_session_id)
    }
}

/// Response for execute_command_in_session and get_more_session_output
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionOutputResponse {
    /// Outcome marker, always "success"
    pub status: String,

    /// Session the output was read from
    pub exec_session_id: String,

    /// Captured output with terminal escape sequences removed
    pub output: String,
}

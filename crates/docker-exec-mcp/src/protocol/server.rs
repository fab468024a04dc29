//! Docker Exec MCP Server Implementation
//!
//! This module implements the MCP server using rmcp 0.9's #[tool_router] pattern.
//! It routes MCP tool calls to the exec session registry.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use docker_exec_mcp_core::{Error, SessionId};
use docker_exec_mcp_session::{Session, SessionRegistry};

use crate::tools::*;

/// Short machine-readable name for an error, sent as `data.kind`.
fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::SessionCreate(_) => "session_create_failed",
        Error::Write(_) => "write_failed",
        Error::Read(_) => "read_failed",
        Error::SessionNotFound(_) => "session_not_found",
        Error::ContainerMismatch { .. } => "container_mismatch",
        Error::SessionClosed(_) => "session_closed",
        Error::SessionIdCollision(_) => "session_id_collision",
        Error::SessionLimitReached(_) => "session_limit_reached",
        Error::Runtime(_) => "runtime_error",
        Error::Io(_) => "io_error",
        Error::Config(_) => "config_error",
        Error::Serialization(_) => "serialization_error",
        Error::InvalidInput(_) => "invalid_input",
    }
}

/// Map a library error to an MCP error.
///
/// Unknown or foreign sessions and malformed arguments are the caller's
/// fault and become invalid-params errors; everything else is internal.
pub fn to_mcp_error(err: &Error) -> McpError {
    let code = if err.is_lookup_failure() || matches!(err, Error::InvalidInput(_)) {
        ErrorCode(-32602) // Invalid params
    } else {
        ErrorCode(-32603) // Internal error
    };
    McpError::new(code, err.to_string(), Some(json!({ "kind": error_kind(err) })))
}

fn success<T: serde::Serialize>(response: &T, fallback: impl FnOnce() -> String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(response).unwrap_or_else(|_| fallback()),
    )])
}

/// Docker Exec MCP Server
///
/// Exposes interactive container shell sessions via MCP tools.
#[derive(Clone)]
pub struct ExecMcpServer {
    /// Live exec sessions
    registry: Arc<SessionRegistry>,
    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ExecMcpServer {
    /// Create a server backed by `registry`
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            tool_router: Self::tool_router(),
        }
    }

    /// Get the session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Resolve a session for a caller naming `container_name` (helper method)
    async fn authorized(
        &self,
        exec_session_id: &str,
        container_name: &str,
    ) -> Result<Arc<Session>, McpError> {
        let session_id = SessionId::from(exec_session_id);
        self.registry
            .authorize(&session_id, container_name)
            .await
            .map_err(|e| {
                warn!("Rejected session lookup: {}", e);
                to_mcp_error(&e)
            })
    }

    /// Open an interactive shell session in a container
    #[tool(
        description = "Create an interactive shell session inside a running container. Returns an exec_session_id for the other session tools."
    )]
    #[instrument(skip_all)]
    async fn create_exec_session(
        &self,
        Parameters(params): Parameters<CreateSessionParams>,
    ) -> Result<CallToolResult, McpError> {
        params.validate().map_err(|e| to_mcp_error(&e))?;
        info!("Creating exec session: container='{}'", params.container_name);

        let session = self
            .registry
            .create_session(&params.container_name)
            .await
            .map_err(|e| {
                error!("Failed to create exec session: {}", e);
                to_mcp_error(&e)
            })?;

        let exec_session_id = session.id().to_string();
        let response = CreateSessionResponse {
            status: "success".to_string(),
            exec_session_id: exec_session_id.clone(),
            container_name: params.container_name,
        };

        Ok(success(&response, || exec_session_id))
    }

    /// Send a command and capture its first burst of output
    #[tool(
        description = "Run a command in an exec session. Waits 2 seconds, then polls up to timeout_secs seconds (default 5, at most the configured maximum of 300 by default) and returns the first burst of output with terminal escape sequences removed. Use get_more_session_output for output that arrives later."
    )]
    #[instrument(skip_all)]
    async fn execute_command_in_session(
        &self,
        Parameters(params): Parameters<ExecuteCommandParams>,
    ) -> Result<CallToolResult, McpError> {
        params.validate().map_err(|e| to_mcp_error(&e))?;
        info!(
            "Executing command: session={}, container='{}', timeout={:?}",
            params.exec_session_id, params.container_name, params.timeout_secs
        );

        let session = self
            .authorized(&params.exec_session_id, &params.container_name)
            .await?;

        let output = match params.timeout_secs {
            Some(timeout_secs) => {
                session
                    .execute_command_with_timeout(&params.cmd, timeout_secs)
                    .await
            }
            None => session.execute_command(&params.cmd).await,
        }
        .map_err(|e| {
            error!("Command failed in session {}: {}", params.exec_session_id, e);
            to_mcp_error(&e)
        })?;

        debug!("Command returned {} chars", output.len());

        let response = SessionOutputResponse {
            status: "success".to_string(),
            exec_session_id: params.exec_session_id,
            output,
        };
        let fallback = response.output.clone();

        Ok(success(&response, || fallback))
    }

    /// Collect output that arrived after the last call
    #[tool(
        description = "Read output that an exec session produced since the last call, without sending anything. Returns an empty string when the shell is quiet."
    )]
    #[instrument(skip_all)]
    async fn get_more_session_output(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        params.validate().map_err(|e| to_mcp_error(&e))?;
        debug!("Draining output: session={}", params.exec_session_id);

        let session = self
            .authorized(&params.exec_session_id, &params.container_name)
            .await?;

        let output = session.get_output().await.map_err(|e| {
            error!("Failed to read session {}: {}", params.exec_session_id, e);
            to_mcp_error(&e)
        })?;

        let response = SessionOutputResponse {
            status: "success".to_string(),
            exec_session_id: params.exec_session_id,
            output,
        };
        let fallback = response.output.clone();

        Ok(success(&response, || fallback))
    }

    /// Close an exec session
    #[tool(description = "Close an exec session: sends exit to the shell and releases the stream.")]
    #[instrument(skip_all)]
    async fn close_exec_session(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        params.validate().map_err(|e| to_mcp_error(&e))?;
        info!("Closing exec session: session={}", params.exec_session_id);

        let session_id = SessionId::from(params.exec_session_id.as_str());
        self.registry
            .close_for(&session_id, &params.container_name)
            .await
            .map_err(|e| {
                warn!("Failed to close session {}: {}", params.exec_session_id, e);
                to_mcp_error(&e)
            })?;

        let response = CloseSessionResponse {
            status: "success".to_string(),
            exec_session_id: params.exec_session_id,
        };

        Ok(success(&response, || "Session closed".to_string()))
    }

    /// List all live exec sessions
    #[tool(description = "List all live exec sessions")]
    #[instrument(skip_all)]
    async fn list_exec_sessions(
        &self,
        Parameters(_params): Parameters<SessionListParams>,
    ) -> Result<CallToolResult, McpError> {
        let sessions: Vec<SessionSummary> = self
            .registry
            .list_sessions()
            .await
            .into_iter()
            .map(SessionSummary::from)
            .collect();
        let count = sessions.len();

        info!("Found {} live session(s)", count);

        let response = SessionListResponse { sessions, count };
        Ok(success(&response, || format!("{count} sessions live")))
    }
}

// Implement the ServerHandler trait to define server capabilities
#[tool_handler]
impl rmcp::ServerHandler for ExecMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Docker Exec MCP Server - Drive interactive shells inside running containers. \
                 Use create_exec_session to open a shell, execute_command_in_session to run \
                 commands, get_more_session_output to collect late output, and \
                 close_exec_session when done."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

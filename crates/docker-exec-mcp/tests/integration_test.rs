//! Integration tests for the docker-exec-mcp system.

use std::sync::Arc;

use docker_exec_mcp::protocol::to_mcp_error;
use docker_exec_mcp::{ExecMcpServer, ExecuteCommandParams, SessionListResponse, SessionSummary};
use docker_exec_mcp_core::{ServerConfig, SessionId};
use docker_exec_mcp_session::testing::ScriptedGateway;
use docker_exec_mcp_session::{SessionRegistry, SessionRegistryConfig};
use rmcp::model::ErrorCode;

fn server_with(config: &ServerConfig) -> ExecMcpServer {
    let registry = SessionRegistry::new(
        Arc::new(ScriptedGateway::new()),
        SessionRegistryConfig::from(config),
    );
    ExecMcpServer::new(Arc::new(registry))
}

#[tokio::test(start_paused = true)]
async fn test_full_session_flow() {
    let server = server_with(&ServerConfig::default());
    let registry = server.registry();

    let session = registry.create_session("c1").await.unwrap();
    let id = session.id().clone();
    session.get_output().await.unwrap();

    let output = registry
        .authorize(&id, "c1")
        .await
        .unwrap()
        .execute_command("echo hi")
        .await
        .unwrap();
    assert!(output.contains("hi"), "unexpected output: {output:?}");

    let listing = SessionListResponse {
        sessions: registry
            .list_sessions()
            .await
            .into_iter()
            .map(SessionSummary::from)
            .collect(),
        count: registry.session_count().await,
    };
    assert_eq!(listing.count, 1);
    assert_eq!(listing.sessions[0].exec_session_id, id.as_str());

    assert!(registry.close_session(&id).await);
    assert!(registry.get_session(&id).await.is_none());

    let err = registry.authorize(&id, "c1").await.unwrap_err();
    let mcp = to_mcp_error(&err);
    assert_eq!(mcp.code, ErrorCode(-32602));
    assert_eq!(mcp.data.unwrap()["kind"], "session_not_found");
}

#[tokio::test(start_paused = true)]
async fn test_session_limit_from_config() {
    let config = ServerConfig::from_yaml("server:\n  max_sessions: 1\n").unwrap();
    let server = server_with(&config);

    server.registry().create_session("c1").await.unwrap();
    let err = server.registry().create_session("c2").await.unwrap_err();

    let mcp = to_mcp_error(&err);
    assert_eq!(mcp.code, ErrorCode(-32603));
    assert_eq!(mcp.data.unwrap()["kind"], "session_limit_reached");
}

#[test]
fn test_execute_params_schema() {
    let schema = serde_json::to_value(schemars::schema_for!(ExecuteCommandParams)).unwrap();
    let required: Vec<&str> = schema["required"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();

    assert!(required.contains(&"container_name"));
    assert!(required.contains(&"exec_session_id"));
    assert!(required.contains(&"cmd"));
    assert!(!required.contains(&"timeout_secs"));
}

#[test]
fn test_mismatch_error_names_both_containers() {
    let err = docker_exec_mcp_core::Error::ContainerMismatch {
        session_id: SessionId::from("0123456789ab"),
        bound: "web1".to_string(),
        requested: "web2".to_string(),
    };
    let mcp = to_mcp_error(&err);
    assert!(mcp.message.contains("web1"));
    assert!(mcp.message.contains("web2"));
}

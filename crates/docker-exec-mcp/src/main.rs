//! # Docker Exec MCP Server
//!
//! Model Context Protocol server giving AI agents interactive shell sessions
//! inside running Docker containers.
//!
//! ## Overview
//!
//! This server provides MCP tools for:
//! - Session management (create, list, close)
//! - Command execution with bounded output capture
//! - Collecting output that arrives after a command returned
//!
//! ## Architecture
//!
//! This is Layer 2 - the main MCP server binary that ties together:
//! - docker-exec-mcp-core: Core types, configuration, escape sanitizer
//! - docker-exec-mcp-session: Exec sessions, registry, Docker gateway

use std::sync::Arc;

use anyhow::{bail, Context};
use rmcp::{transport::stdio, ServiceExt};

use docker_exec_mcp::ExecMcpServer;
use docker_exec_mcp_core::ServerConfig;
use docker_exec_mcp_session::{DockerGateway, SessionRegistry, SessionRegistryConfig};

const USAGE: &str = "Usage: docker-exec-mcp [--config <path>]";

/// Parse command line arguments, returning the config file path if any.
fn parse_args(args: &[String]) -> anyhow::Result<Option<String>> {
    let mut config_path = None;
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().context("--config requires a path")?;
                config_path = Some(path.clone());
            }
            "--help" | "-h" => {
                eprintln!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("Unknown argument '{other}'\n{USAGE}"),
        }
    }
    Ok(config_path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config_path = parse_args(&args)?;

    let config = match &config_path {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => ServerConfig::default(),
    };

    // Initialize logging on stderr; stdout carries the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        "Docker Exec MCP Server v{} starting (config: {})...",
        env!("CARGO_PKG_VERSION"),
        config_path.as_deref().unwrap_or("defaults")
    );

    if config.server.transport != "stdio" {
        bail!(
            "Unsupported transport '{}': only stdio is served",
            config.server.transport
        );
    }

    let gateway = DockerGateway::connect(&config.docker)?;
    if let Err(e) = gateway.ping().await {
        tracing::warn!("Docker Engine not reachable yet: {}", e);
    }

    let registry = Arc::new(SessionRegistry::new(
        Arc::new(gateway),
        SessionRegistryConfig::from(&config),
    ));
    let server = ExecMcpServer::new(Arc::clone(&registry));

    tracing::info!("Server initialized, starting stdio transport...");

    // Serve the MCP server over stdio
    let service = server.serve(stdio()).await.map_err(|e| {
        tracing::error!("Error starting server: {}", e);
        e
    })?;

    tracing::info!("Docker Exec MCP Server running on stdio");

    tokio::select! {
        result = service.waiting() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
    }

    tracing::info!("Docker Exec MCP Server shutting down");
    registry.close_all().await;

    Ok(())
}

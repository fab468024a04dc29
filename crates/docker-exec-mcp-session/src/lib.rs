//! # docker-exec-mcp-session
//!
//! Exec session lifecycle management for the docker-exec-mcp server.
//!
//! This crate provides:
//! - The container runtime seam ([`ExecGateway`]) and its Docker Engine
//!   implementation
//! - Interactive shell sessions with heuristic output capture
//! - The process-wide session registry
//! - A scripted in-memory gateway for tests
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on docker-exec-mcp-core
//! and is used by the MCP server crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod docker;
pub mod gateway;
mod output;
pub mod registry;
pub mod session;
pub mod testing;

// Re-export commonly used types
pub use docker::DockerGateway;
pub use gateway::{ExecGateway, ExecStream, InputSink, OutputStream};
pub use registry::{SessionRegistry, SessionRegistryConfig};
pub use session::{Session, SessionStatus};

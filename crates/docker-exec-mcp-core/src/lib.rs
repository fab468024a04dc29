//! # docker-exec-mcp-core
//!
//! Core types for the docker-exec-mcp server.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other docker-exec-mcp crates. It provides:
//!
//! - Session types (SessionId, SessionInfo)
//! - Server configuration loaded from YAML
//! - The terminal escape sanitizer applied to captured shell output
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other docker-exec-mcp crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ansi;
pub mod config;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use ansi::strip_ansi;
pub use config::{DockerSettings, ServerConfig, ServerSettings, SessionSettings};
pub use error::{Error, Result};
pub use session::{SessionId, SessionInfo, DEFAULT_SESSION_ID_LEN};

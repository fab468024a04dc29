//! Configuration types for the docker-exec-mcp server.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::session::DEFAULT_SESSION_ID_LEN;
use crate::Error;

/// Server configuration loaded from YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Server settings
    pub server: ServerSettings,
    /// Docker connection settings
    pub docker: DockerSettings,
    /// Exec session settings
    pub session: SessionSettings,
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: ServerConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.max_sessions == 0 {
            return Err(Error::Config("server.max_sessions must be > 0".into()));
        }

        if let Some(host) = &self.docker.host {
            if host.trim().is_empty() {
                return Err(Error::Config("docker.host cannot be empty".into()));
            }
        }

        self.session.validate()
    }
}

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Transport type (only stdio is served)
    pub transport: String,
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            transport: "stdio".to_string(),
            max_sessions: 10,
            log_level: "info".to_string(),
        }
    }
}

/// Docker Engine connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerSettings {
    /// Engine address (e.g. "tcp://10.0.0.5:2375"); local defaults when unset
    pub host: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            host: None,
            timeout_secs: 120,
        }
    }
}

/// Exec session settings.
///
/// The timing fields drive the polling heuristic used to capture command
/// output from a shell that emits no framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Shell started inside the container
    pub shell: String,
    /// Number of exec-id characters kept in a session id
    pub id_length: usize,
    /// Command budget, in poll iterations, when the caller gives none
    pub default_command_timeout_secs: u64,
    /// Largest command budget a caller may request
    pub max_command_timeout_secs: u64,
    /// Pause between sending a command and the first read
    pub warmup_ms: u64,
    /// Length of one poll iteration
    pub poll_interval_ms: u64,
    /// Read deadline used while draining pending output
    pub drain_deadline_ms: u64,
    /// Maximum bytes returned by a single read
    pub read_buffer_size: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            shell: "/bin/bash".to_string(),
            id_length: DEFAULT_SESSION_ID_LEN,
            default_command_timeout_secs: 5,
            max_command_timeout_secs: 300,
            warmup_ms: 2000,
            poll_interval_ms: 1000,
            drain_deadline_ms: 100,
            read_buffer_size: 4096,
        }
    }
}

impl SessionSettings {
    /// Validate the session settings.
    pub fn validate(&self) -> crate::Result<()> {
        if self.shell.trim().is_empty() {
            return Err(Error::Config("session.shell cannot be empty".into()));
        }
        if self.id_length == 0 {
            return Err(Error::Config("session.id_length must be > 0".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(Error::Config("session.read_buffer_size must be > 0".into()));
        }
        if self.default_command_timeout_secs > self.max_command_timeout_secs {
            return Err(Error::Config(
                "session.default_command_timeout_secs cannot exceed session.max_command_timeout_secs"
                    .into(),
            ));
        }
        if self.poll_interval_ms == 0 || self.drain_deadline_ms == 0 {
            return Err(Error::Config(
                "session.poll_interval_ms and session.drain_deadline_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Warm-up pause as a duration.
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    /// Poll iteration length as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Drain read deadline as a duration.
    pub fn drain_deadline(&self) -> Duration {
        Duration::from_millis(self.drain_deadline_ms)
    }
}

//! Docker Engine implementation of [`ExecGateway`] built on bollard.

use std::io;

use async_trait::async_trait;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::StreamExt;
use tracing::{debug, error, info};

use docker_exec_mcp_core::{DockerSettings, Error, Result};

use crate::gateway::{ExecGateway, ExecStream};

/// Exec gateway talking to a Docker Engine.
#[derive(Debug, Clone)]
pub struct DockerGateway {
    docker: Docker,
}

impl DockerGateway {
    /// Connect using the given settings.
    ///
    /// Without an explicit host the local defaults apply (`DOCKER_HOST` or
    /// the platform socket).
    pub fn connect(settings: &DockerSettings) -> Result<Self> {
        let docker = match &settings.host {
            Some(host) => {
                info!("Connecting to Docker Engine at {}", host);
                Docker::connect_with_http(host, settings.timeout_secs, API_DEFAULT_VERSION)
            }
            None => {
                info!("Connecting to local Docker Engine");
                Docker::connect_with_local_defaults()
            }
        }
        .map_err(|e| {
            error!("Failed to connect to Docker: {}", e);
            Error::Runtime(format!("Failed to connect to Docker: {e}"))
        })?;

        Ok(Self { docker })
    }

    /// Check that the engine answers.
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| Error::Runtime(format!("Docker ping failed: {e}")))
    }
}

#[async_trait]
impl ExecGateway for DockerGateway {
    async fn create_exec(&self, container: &str, shell: &str) -> Result<String> {
        let options = CreateExecOptions {
            attach_stdin: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(true),
            cmd: Some(vec![shell.to_string()]),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(container, options)
            .await
            .map_err(|e| Error::SessionCreate(e.to_string()))?;

        debug!("Created exec {} in container '{}'", exec.id, container);
        Ok(exec.id)
    }

    async fn attach_exec(&self, exec_id: &str) -> Result<ExecStream> {
        let options = StartExecOptions {
            detach: false,
            tty: true,
            ..Default::default()
        };

        let started = self
            .docker
            .start_exec(exec_id, Some(options))
            .await
            .map_err(|e| Error::SessionCreate(e.to_string()))?;

        match started {
            StartExecResults::Attached { output, input } => {
                debug!("Attached to exec {}", exec_id);
                let output = output
                    .map(|frame| {
                        frame
                            .map(|log| log.into_bytes().to_vec())
                            .map_err(io::Error::other)
                    })
                    .boxed();
                Ok(ExecStream::new(output, input))
            }
            StartExecResults::Detached => Err(Error::SessionCreate(format!(
                "exec {exec_id} started detached"
            ))),
        }
    }
}

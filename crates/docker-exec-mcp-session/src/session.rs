//! Interactive exec session management.
//!
//! A [`Session`] owns the duplex stream attached to one shell running under
//! a pseudo-terminal inside a container. The shell emits raw terminal bytes
//! with no marker for "command finished", so output is captured with a
//! polling heuristic: send, wait a warm-up period, then poll until the first
//! burst arrives or the iteration budget runs out. Anything that arrives
//! later is collected with [`Session::get_output`].
//!
//! All stream access goes through one async mutex, so concurrent callers on
//! the same session never interleave their writes or reads.

use std::time::{Duration, SystemTime};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use docker_exec_mcp_core::{strip_ansi, Error, Result, SessionId, SessionInfo, SessionSettings};

use crate::gateway::{ExecGateway, InputSink};
use crate::output::{OutputReader, ReadOutcome};

/// Line sent to the shell when a session is closed.
const EXIT_COMMAND: &[u8] = b"exit\n";

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Stream attached and usable
    Open,
    /// Stream released
    Closed,
}

/// Stream halves owned by an open session.
struct Channel {
    input: InputSink,
    output: OutputReader,
}

/// An interactive shell session inside a container.
pub struct Session {
    /// Session identifier (truncated exec id)
    id: SessionId,

    /// Container the session was created against
    container_name: String,

    /// Full runtime exec id
    exec_id: String,

    /// Session creation time
    created_at: SystemTime,

    /// Timing and buffer settings
    settings: SessionSettings,

    /// Attached stream; `None` once closed
    channel: Mutex<Option<Channel>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("container_name", &self.container_name)
            .field("exec_id", &self.exec_id)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a new interactive shell in `container_name`.
    ///
    /// Creates an exec target running the configured shell with a tty and
    /// all standard streams attached, then attaches to it. Nothing is left
    /// behind locally if either step fails.
    pub async fn create(
        gateway: &dyn ExecGateway,
        container_name: &str,
        settings: SessionSettings,
    ) -> Result<Self> {
        info!(
            "Creating exec session: container='{}', shell='{}'",
            container_name, settings.shell
        );

        let exec_id = gateway.create_exec(container_name, &settings.shell).await?;
        let stream = gateway.attach_exec(&exec_id).await?;

        let id = SessionId::from_exec_id(&exec_id, settings.id_length);
        info!(
            "Exec session created: id={}, container='{}', exec_id={}",
            id, container_name, exec_id
        );

        Ok(Self {
            id,
            container_name: container_name.to_string(),
            exec_id,
            created_at: SystemTime::now(),
            settings,
            channel: Mutex::new(Some(Channel {
                input: stream.input,
                output: OutputReader::new(stream.output),
            })),
        })
    }

    /// Get the session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get the container the session is bound to.
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Get the full exec id.
    pub fn exec_id(&self) -> &str {
        &self.exec_id
    }

    /// Get the session creation time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Get the session settings.
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Snapshot of the session's identifying data.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            container_name: self.container_name.clone(),
            exec_id: self.exec_id.clone(),
            created_at: self.created_at,
        }
    }

    /// Get the current lifecycle state.
    pub async fn status(&self) -> SessionStatus {
        if self.channel.lock().await.is_some() {
            SessionStatus::Open
        } else {
            SessionStatus::Closed
        }
    }

    /// Refuse callers that name a different container.
    pub fn ensure_container(&self, container_name: &str) -> Result<()> {
        if self.container_name == container_name {
            Ok(())
        } else {
            Err(Error::ContainerMismatch {
                session_id: self.id.clone(),
                bound: self.container_name.clone(),
                requested: container_name.to_string(),
            })
        }
    }

    /// Run a command using the configured default budget.
    pub async fn execute_command(&self, command: &str) -> Result<String> {
        self.execute_command_with_timeout(command, self.settings.default_command_timeout_secs)
            .await
    }

    /// Send `command` and capture the first burst of output.
    ///
    /// Waits the warm-up period, then polls at most `timeout_secs` times,
    /// one poll interval each. Stops at the first read that yields bytes;
    /// output arriving after that burst is left for [`Session::get_output`].
    /// EOF and empty polls are not errors. Returns within roughly
    /// `warmup + timeout_secs * poll_interval`.
    ///
    /// Budgets above `max_command_timeout_secs` are refused with
    /// [`Error::InvalidInput`], since the session stays locked for the whole
    /// call.
    pub async fn execute_command_with_timeout(
        &self,
        command: &str,
        timeout_secs: u64,
    ) -> Result<String> {
        if timeout_secs > self.settings.max_command_timeout_secs {
            return Err(Error::InvalidInput(format!(
                "timeout_secs {} exceeds the maximum of {}",
                timeout_secs, self.settings.max_command_timeout_secs
            )));
        }

        let mut guard = self.channel.lock().await;
        let channel = guard
            .as_mut()
            .ok_or_else(|| Error::SessionClosed(self.id.clone()))?;

        debug!(
            "Sending command: id={}, {} bytes, timeout={}",
            self.id,
            command.len(),
            timeout_secs
        );
        let line = format!("{command}\n");
        channel
            .input
            .write_all(line.as_bytes())
            .await
            .map_err(Error::Write)?;
        channel.input.flush().await.map_err(Error::Write)?;

        tokio::time::sleep(self.settings.warmup()).await;

        let tick = self.settings.poll_interval();
        let mut output = Vec::new();
        for _ in 0..timeout_secs {
            let started = Instant::now();
            match channel
                .output
                .read(tick, self.settings.read_buffer_size)
                .await
                .map_err(Error::Read)?
            {
                ReadOutcome::Data(bytes) if !bytes.is_empty() => {
                    output.extend_from_slice(&bytes);
                    break;
                }
                // A deadline expiry has already used up the tick; an
                // immediate timeout error has not.
                ReadOutcome::TimedOut => {
                    let remaining = tick.saturating_sub(started.elapsed());
                    if !remaining.is_zero() {
                        tokio::time::sleep(remaining).await;
                    }
                }
                ReadOutcome::Data(_) | ReadOutcome::Eof => tokio::time::sleep(tick).await,
            }
        }

        debug!(
            "Command output captured: id={}, {} bytes",
            self.id,
            output.len()
        );
        Ok(strip_ansi(&String::from_utf8_lossy(&output)))
    }

    /// Drain output that is already pending, without sending anything.
    ///
    /// Keeps reading while chunks arrive within the drain deadline of each
    /// other. A silent stream returns an empty string after one deadline.
    /// EOF is reported as a read error.
    pub async fn get_output(&self) -> Result<String> {
        let mut guard = self.channel.lock().await;
        let channel = guard
            .as_mut()
            .ok_or_else(|| Error::SessionClosed(self.id.clone()))?;

        let deadline = self.settings.drain_deadline();
        let mut output = Vec::new();
        loop {
            match channel
                .output
                .read(deadline, self.settings.read_buffer_size)
                .await
                .map_err(Error::Read)?
            {
                ReadOutcome::Data(bytes) if !bytes.is_empty() => output.extend_from_slice(&bytes),
                ReadOutcome::Data(_) | ReadOutcome::TimedOut => break,
                ReadOutcome::Eof => {
                    warn!("Exec stream ended while draining: id={}", self.id);
                    return Err(Error::Read(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "exec stream closed by remote",
                    )));
                }
            }
        }

        debug!("Drained session output: id={}, {} bytes", self.id, output.len());
        Ok(strip_ansi(&String::from_utf8_lossy(&output)))
    }

    /// Close the session.
    ///
    /// Sends `exit` as a best effort (write failures are ignored), then shuts
    /// down and releases the stream. Later calls on this session fail with
    /// [`Error::SessionClosed`]; closing again does nothing.
    pub async fn close(&self) {
        let Some(mut channel) = self.channel.lock().await.take() else {
            debug!("Session already closed: id={}", self.id);
            return;
        };

        info!("Closing exec session: id={}", self.id);
        if let Err(e) = channel.input.write_all(EXIT_COMMAND).await {
            debug!("Ignoring exit write failure: id={}, {}", self.id, e);
        }
        if let Err(e) = channel.input.shutdown().await {
            debug!("Ignoring stream shutdown failure: id={}, {}", self.id, e);
        }
        drop(channel);
        info!("Exec session closed: id={}", self.id);
    }

    /// Shorthand for the configured warm-up plus `timeout_secs` poll intervals.
    pub fn max_command_duration(&self, timeout_secs: u64) -> Duration {
        let polls = u32::try_from(timeout_secs).unwrap_or(u32::MAX);
        self.settings
            .warmup()
            .saturating_add(self.settings.poll_interval().saturating_mul(polls))
    }
}

//! Container runtime seam used to open exec sessions.

use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::io::AsyncWrite;

use docker_exec_mcp_core::Result;

/// Raw output chunks read from the remote pseudo-terminal.
pub type OutputStream = BoxStream<'static, io::Result<Vec<u8>>>;

/// Writer feeding the remote pseudo-terminal's stdin.
pub type InputSink = Pin<Box<dyn AsyncWrite + Send>>;

/// Duplex byte channel attached to a running exec target.
pub struct ExecStream {
    /// Output produced by the remote shell, in arrival order
    pub output: OutputStream,
    /// Input written to the remote shell
    pub input: InputSink,
}

impl ExecStream {
    /// Build a stream from its two halves.
    pub fn new(output: OutputStream, input: InputSink) -> Self {
        Self { output, input }
    }
}

impl std::fmt::Debug for ExecStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecStream").finish_non_exhaustive()
    }
}

/// Runtime operations needed to open an interactive shell in a container.
///
/// Implementations create the exec target with stdin, stdout and stderr
/// attached and a tty allocated, then attach to it without detaching.
#[async_trait]
pub trait ExecGateway: Send + Sync {
    /// Create an exec target running `shell` in `container`, returning the
    /// runtime-assigned exec id.
    async fn create_exec(&self, container: &str, shell: &str) -> Result<String>;

    /// Start and attach to a previously created exec target.
    async fn attach_exec(&self, exec_id: &str) -> Result<ExecStream>;
}

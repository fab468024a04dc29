//! Scripted in-memory shell.
//!
//! Each attach spawns a task that plays the remote shell: it reads lines
//! written by the session and answers with the replies produced by a script.
//! Replies can emit output, pause, fail the stream, or hang up.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};

use docker_exec_mcp_core::{Error, Result};

use crate::gateway::{ExecGateway, ExecStream};

/// Colored bash-style prompt, including the bracketed-paste toggle.
pub const PROMPT: &str = "\x1b[?2004h\x1b[01;32mroot@c1\x1b[00m:\x1b[01;34m/\x1b[00m# ";

/// One step of the shell's answer to an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Emit output as a single chunk
    Output(String),
    /// Wait before the next reply
    Pause(Duration),
    /// Close the output stream and stop reading input
    Hangup,
    /// Deliver a read error of the given kind
    Fail(io::ErrorKind),
}

impl Reply {
    /// Emit `text` as one chunk.
    pub fn output(text: impl Into<String>) -> Self {
        Reply::Output(text.into())
    }

    /// Wait for `duration`.
    pub fn pause(duration: Duration) -> Self {
        Reply::Pause(duration)
    }
}

type Script = Arc<dyn Fn(&str) -> Vec<Reply> + Send + Sync>;

/// In-memory gateway backed by a scripted shell.
pub struct ScriptedGateway {
    script: Script,
    banner: Option<String>,
    create_error: Option<String>,
    attach_error: Option<String>,
    exec_ids: Mutex<VecDeque<String>>,
    exec_counter: Mutex<u64>,
    exec_requests: Mutex<Vec<(String, String)>>,
    received: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGateway {
    /// A shell that echoes input like a tty, answers `echo`, prints a
    /// colored prompt, and hangs up on `exit`.
    pub fn new() -> Self {
        let mut gateway = Self::with_script(bash_like);
        gateway.banner = Some(PROMPT.to_string());
        gateway
    }

    /// A shell that never prints anything (it still hangs up on `exit`).
    pub fn silent() -> Self {
        Self::with_script(|line| {
            if line.trim() == "exit" {
                vec![Reply::Hangup]
            } else {
                Vec::new()
            }
        })
    }

    /// A shell answering every line with `script(line)` and no banner.
    pub fn with_script<F>(script: F) -> Self
    where
        F: Fn(&str) -> Vec<Reply> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            banner: None,
            create_error: None,
            attach_error: None,
            exec_ids: Mutex::new(VecDeque::new()),
            exec_counter: Mutex::new(0),
            exec_requests: Mutex::new(Vec::new()),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make exec creation fail with `message`.
    pub fn fail_create(mut self, message: impl Into<String>) -> Self {
        self.create_error = Some(message.into());
        self
    }

    /// Make attaching fail with `message`.
    pub fn fail_attach(mut self, message: impl Into<String>) -> Self {
        self.attach_error = Some(message.into());
        self
    }

    /// Hand out these exec ids first, in order.
    pub fn with_exec_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exec_ids
            .lock()
            .unwrap()
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// `(container, shell)` pairs passed to `create_exec`.
    pub fn exec_requests(&self) -> Vec<(String, String)> {
        self.exec_requests.lock().unwrap().clone()
    }

    /// Input lines the shells have read, across all sessions.
    pub fn received_lines(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    fn next_exec_id(&self) -> String {
        if let Some(id) = self.exec_ids.lock().unwrap().pop_front() {
            return id;
        }
        let mut counter = self.exec_counter.lock().unwrap();
        *counter += 1;
        format!("{:012x}{}", *counter, "e".repeat(52))
    }
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecGateway for ScriptedGateway {
    async fn create_exec(&self, container: &str, shell: &str) -> Result<String> {
        if let Some(message) = &self.create_error {
            return Err(Error::SessionCreate(message.clone()));
        }
        self.exec_requests
            .lock()
            .unwrap()
            .push((container.to_string(), shell.to_string()));
        Ok(self.next_exec_id())
    }

    async fn attach_exec(&self, _exec_id: &str) -> Result<ExecStream> {
        if let Some(message) = &self.attach_error {
            return Err(Error::SessionCreate(message.clone()));
        }

        let (client, shell) = tokio::io::duplex(4096);
        let (tx, rx) = mpsc::unbounded();
        tokio::spawn(run_shell(
            shell,
            tx,
            Arc::clone(&self.script),
            self.banner.clone(),
            Arc::clone(&self.received),
        ));

        Ok(ExecStream::new(rx.boxed(), Box::pin(client)))
    }
}

async fn run_shell(
    io: DuplexStream,
    tx: mpsc::UnboundedSender<io::Result<Vec<u8>>>,
    script: Script,
    banner: Option<String>,
    received: Arc<Mutex<Vec<String>>>,
) {
    if let Some(banner) = banner {
        let _ = tx.unbounded_send(Ok(banner.into_bytes()));
    }

    let mut lines = BufReader::new(io).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        received.lock().unwrap().push(line.clone());
        for reply in script(&line) {
            match reply {
                Reply::Output(text) => {
                    let _ = tx.unbounded_send(Ok(text.into_bytes()));
                }
                Reply::Pause(duration) => tokio::time::sleep(duration).await,
                Reply::Hangup => return,
                Reply::Fail(kind) => {
                    let _ = tx.unbounded_send(Err(io::Error::new(kind, "scripted failure")));
                }
            }
        }
    }
}

fn bash_like(line: &str) -> Vec<Reply> {
    // The tty echoes input back before the shell answers.
    let mut out = format!("{line}\r\n");
    let command = line.trim();

    if command == "exit" {
        return vec![Reply::Output(out), Reply::Hangup];
    }
    if let Some(text) = command.strip_prefix("echo ") {
        out.push_str(text);
        out.push_str("\r\n");
    } else if command == "pwd" {
        out.push_str("/\r\n");
    }
    out.push_str(PROMPT);
    vec![Reply::Output(out)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_like_echo() {
        let replies = bash_like("echo hi");
        assert_eq!(replies.len(), 1);
        assert!(matches!(&replies[0], Reply::Output(text) if text.starts_with("echo hi\r\nhi\r\n")));
    }

    #[test]
    fn test_bash_like_exit_hangs_up() {
        assert_eq!(
            bash_like("exit"),
            vec![Reply::output("exit\r\n"), Reply::Hangup]
        );
    }

    #[tokio::test]
    async fn test_generated_exec_ids_have_unique_prefixes() {
        let gateway = ScriptedGateway::new();
        let a = gateway.create_exec("c1", "/bin/bash").await.unwrap();
        let b = gateway.create_exec("c1", "/bin/bash").await.unwrap();
        assert_eq!(a.len(), 64);
        assert_ne!(&a[..12], &b[..12]);
    }

    #[tokio::test]
    async fn test_queued_exec_ids_come_first() {
        let gateway = ScriptedGateway::new().with_exec_ids(["abc", "def"]);
        assert_eq!(gateway.create_exec("c1", "sh").await.unwrap(), "abc");
        assert_eq!(gateway.create_exec("c1", "sh").await.unwrap(), "def");
        assert_eq!(gateway.exec_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_fail_create() {
        let gateway = ScriptedGateway::new().fail_create("No such container: c9");
        let result = gateway.create_exec("c9", "sh").await;
        assert!(matches!(result, Err(Error::SessionCreate(_))));
        assert!(gateway.exec_requests().is_empty());
    }
}

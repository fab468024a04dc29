//! Bounded reads over an exec session's output stream.
//!
//! The remote side delivers output as arbitrarily sized chunks. A read here
//! behaves like reading a socket into a fixed-size buffer: it waits up to a
//! deadline for the first chunk, takes whatever else is already available,
//! and hands back at most `max` bytes. Bytes beyond `max` stay pending for
//! the next read.

use std::io;
use std::time::Duration;

use futures::{FutureExt, StreamExt};

use crate::gateway::OutputStream;

/// Result of a single bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// Bytes read (possibly empty)
    Data(Vec<u8>),
    /// Nothing arrived before the deadline
    TimedOut,
    /// The remote side closed its output
    Eof,
}

/// Output buffer for bytes received but not yet handed out.
#[derive(Debug, Default)]
pub(crate) struct OutputBuffer {
    pending: Vec<u8>,
}

impl OutputBuffer {
    /// Create a new output buffer.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append new output to the buffer.
    pub(crate) fn append(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Take up to `max` bytes from the front of the buffer.
    pub(crate) fn take(&mut self, max: usize) -> Vec<u8> {
        let n = max.min(self.pending.len());
        self.pending.drain(..n).collect()
    }

    /// Get unread bytes count.
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no bytes are pending.
    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Reader over an exec output stream.
pub(crate) struct OutputReader {
    stream: OutputStream,
    buffer: OutputBuffer,
    deferred: Option<io::Error>,
    ended: bool,
}

impl OutputReader {
    pub(crate) fn new(stream: OutputStream) -> Self {
        Self {
            stream,
            buffer: OutputBuffer::new(),
            deferred: None,
            ended: false,
        }
    }

    /// Read at most `max` bytes, waiting up to `deadline` when nothing is
    /// buffered.
    ///
    /// Timeout-like and EOF-like I/O errors are reported as
    /// [`ReadOutcome::TimedOut`] and [`ReadOutcome::Eof`]; any other error is
    /// returned as is.
    pub(crate) async fn read(&mut self, deadline: Duration, max: usize) -> io::Result<ReadOutcome> {
        if self.buffer.is_empty() {
            if let Some(err) = self.deferred.take() {
                return classify(err);
            }
            if self.ended {
                return Ok(ReadOutcome::Eof);
            }

            match tokio::time::timeout(deadline, self.stream.next()).await {
                Err(_) => return Ok(ReadOutcome::TimedOut),
                Ok(None) => {
                    self.ended = true;
                    return Ok(ReadOutcome::Eof);
                }
                Ok(Some(Err(err))) => return classify(err),
                Ok(Some(Ok(bytes))) => self.buffer.append(&bytes),
            }

            self.fill_ready(max);
        }

        Ok(ReadOutcome::Data(self.buffer.take(max)))
    }

    /// Pull chunks that are already available without waiting.
    fn fill_ready(&mut self, max: usize) {
        while self.buffer.len() < max {
            match self.stream.next().now_or_never() {
                Some(Some(Ok(bytes))) => self.buffer.append(&bytes),
                Some(Some(Err(err))) => {
                    self.deferred = Some(err);
                    break;
                }
                Some(None) => {
                    self.ended = true;
                    break;
                }
                None => break,
            }
        }
    }
}

fn classify(err: io::Error) -> io::Result<ReadOutcome> {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Ok(ReadOutcome::TimedOut),
        io::ErrorKind::UnexpectedEof => Ok(ReadOutcome::Eof),
        _ => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;

    fn reader() -> (mpsc::UnboundedSender<io::Result<Vec<u8>>>, OutputReader) {
        let (tx, rx) = mpsc::unbounded();
        (tx, OutputReader::new(rx.boxed()))
    }

    #[test]
    fn test_output_buffer_take() {
        let mut buffer = OutputBuffer::new();
        buffer.append(b"Hello");
        buffer.append(b" World");
        assert_eq!(buffer.len(), 11);

        assert_eq!(buffer.take(5), b"Hello");
        assert_eq!(buffer.take(100), b" World");
        assert!(buffer.is_empty());
        assert_eq!(buffer.take(4), b"");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_times_out_without_data() {
        let (_tx, mut reader) = reader();
        let outcome = reader.read(Duration::from_millis(100), 4096).await.unwrap();
        assert_eq!(outcome, ReadOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_coalesces_ready_chunks() {
        let (tx, mut reader) = reader();
        tx.unbounded_send(Ok(b"echo hi\r\n".to_vec())).unwrap();
        tx.unbounded_send(Ok(b"hi\r\n".to_vec())).unwrap();

        let outcome = reader.read(Duration::from_millis(100), 4096).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Data(b"echo hi\r\nhi\r\n".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_respects_buffer_size() {
        let (tx, mut reader) = reader();
        tx.unbounded_send(Ok(b"abcdefgh".to_vec())).unwrap();

        let first = reader.read(Duration::from_millis(100), 5).await.unwrap();
        assert_eq!(first, ReadOutcome::Data(b"abcde".to_vec()));

        let second = reader.read(Duration::from_millis(100), 5).await.unwrap();
        assert_eq!(second, ReadOutcome::Data(b"fgh".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_reports_eof() {
        let (tx, mut reader) = reader();
        tx.unbounded_send(Ok(b"bye".to_vec())).unwrap();
        drop(tx);

        let first = reader.read(Duration::from_millis(100), 4096).await.unwrap();
        assert_eq!(first, ReadOutcome::Data(b"bye".to_vec()));

        let second = reader.read(Duration::from_millis(100), 4096).await.unwrap();
        assert_eq!(second, ReadOutcome::Eof);

        // Stays at EOF
        let third = reader.read(Duration::from_millis(100), 4096).await.unwrap();
        assert_eq!(third, ReadOutcome::Eof);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_classifies_errors() {
        let (tx, mut reader) = reader();
        tx.unbounded_send(Err(io::Error::new(io::ErrorKind::TimedOut, "i/o timeout")))
            .unwrap();
        tx.unbounded_send(Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof")))
            .unwrap();
        tx.unbounded_send(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
            .unwrap();

        let deadline = Duration::from_millis(100);
        assert_eq!(reader.read(deadline, 4096).await.unwrap(), ReadOutcome::TimedOut);
        assert_eq!(reader.read(deadline, 4096).await.unwrap(), ReadOutcome::Eof);

        let err = reader.read(deadline, 4096).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_after_data_is_deferred() {
        let (tx, mut reader) = reader();
        tx.unbounded_send(Ok(b"partial".to_vec())).unwrap();
        tx.unbounded_send(Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")))
            .unwrap();

        let deadline = Duration::from_millis(100);
        assert_eq!(
            reader.read(deadline, 4096).await.unwrap(),
            ReadOutcome::Data(b"partial".to_vec())
        );

        let err = reader.read(deadline, 4096).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}

//! Command session: one connection to the remote debuggee, one frame reader
//! task, three response slots, and a shared outbound writer.
//!
//! Exactly one session exists per process. It is constructed once a
//! connection is accepted, owns both halves of the socket for the remainder
//! of the process, and ends when the inbound stream reaches end-of-input
//! (closing the stop slot) or a desync terminates it.

mod reader;
mod slots;

pub use slots::CompletionSlot;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::constants::{IND_COMMAND, IND_COMPLETE, IND_EVAL, IND_QUICKFIX};
use crate::error::{Error, Result};
use crate::protocol::{Codec, Frame};

/// Cloneable handle for sending outbound frames.
///
/// The command loop and the event relays share the write half; an async
/// mutex serializes their frames so no partial frame is ever interleaved.
#[derive(Clone)]
pub struct SessionWriter {
    write: Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>,
}

impl SessionWriter {
    fn new<W>(write: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            write: Arc::new(Mutex::new(Box::new(write))),
        }
    }

    async fn send_frame(&self, indicator: u8, payload: &str) -> Result<()> {
        let encoded = Codec::encode(&Frame::new(indicator, payload))?;
        let mut write = self.write.lock().await;
        write.write_all(&encoded).await?;
        write.flush().await?;
        Ok(())
    }

    /// Send a control command ("continue", "next", "scopes").
    pub async fn send_command(&self, command: &str) -> Result<()> {
        self.send_frame(IND_COMMAND, command).await
    }

    /// Send an expression for evaluation in the debuggee's context.
    pub async fn send_eval(&self, expression: &str) -> Result<()> {
        self.send_frame(IND_EVAL, expression).await
    }

    /// Send a completion query for the given cursor position and line.
    pub async fn send_completion_query(&self, cursor_pos: usize, line: &str) -> Result<()> {
        self.send_frame(IND_COMPLETE, &format!("{}|{}", cursor_pos, line))
            .await
    }

    /// Relay a quickfix line to the editor driving the console.
    pub async fn send_quickfix(&self, line: &str) -> Result<()> {
        self.send_frame(IND_QUICKFIX, line).await
    }
}

/// The command session.
///
/// Construct with [`Session::start`], which spawns the frame reader task.
/// The stop and result receivers live on the session and are consumed by the
/// command loop; the writer and completion slot are cloneable handles handed
/// to whoever needs them.
pub struct Session {
    writer: SessionWriter,
    stop_rx: mpsc::Receiver<String>,
    result_rx: mpsc::Receiver<String>,
    completions: Arc<CompletionSlot>,
    reader: JoinHandle<Result<()>>,
}

impl Session {
    /// Start a session over an accepted TCP connection.
    pub fn start(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self::start_with(read, write)
    }

    /// Start a session over arbitrary stream halves (used by tests).
    pub fn start_with<R, W>(read: R, write: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let (result_tx, result_rx) = mpsc::channel(1);
        let completions = Arc::new(CompletionSlot::new());

        let reader = tokio::spawn(reader::run_reader(
            read,
            stop_tx,
            result_tx,
            Arc::clone(&completions),
        ));
        debug!("session started");

        Self {
            writer: SessionWriter::new(write),
            stop_rx,
            result_rx,
            completions,
            reader,
        }
    }

    /// Handle for sending outbound frames.
    pub fn writer(&self) -> SessionWriter {
        self.writer.clone()
    }

    /// Handle for receiving completion results.
    pub fn completions(&self) -> Arc<CompletionSlot> {
        Arc::clone(&self.completions)
    }

    /// Wait for the next stop notification.
    ///
    /// Returns `None` once the inbound stream has ended; that is the clean
    /// shutdown signal for the whole session.
    pub async fn recv_stop(&mut self) -> Option<String> {
        self.stop_rx.recv().await
    }

    /// Wait for the response to the single in-flight request.
    pub async fn recv_result(&mut self) -> Result<String> {
        self.result_rx.recv().await.ok_or(Error::ConnectionClosed)
    }

    /// Consume the session and surface the reader's exit status.
    ///
    /// `Ok(())` means the stream ended cleanly; a desync error means the
    /// process should exit nonzero.
    pub async fn join(self) -> Result<()> {
        match self.reader.await {
            Ok(result) => result,
            Err(e) => Err(Error::Io(std::io::Error::other(e.to_string()))),
        }
    }
}

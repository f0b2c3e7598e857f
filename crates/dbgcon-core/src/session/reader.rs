//! Frame reader and router for the command session.
//!
//! Reads the inbound byte stream, decodes one frame at a time, and routes
//! each frame to its response slot. Runs until the stream ends or a desync
//! is detected; a desync is fatal to the whole session.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::constants::{IND_COMPLETIONS, IND_RESULT, IND_STOPPED};
use crate::error::{Error, Result};
use crate::protocol::{Codec, Frame};

use super::slots::CompletionSlot;

/// Initial capacity of the decode buffer.
const READ_BUF_CAPACITY: usize = 4096;

/// Run the frame reader until end-of-stream or desync.
///
/// On clean end-of-stream the stop sender is dropped, closing the stop slot;
/// that close is the sole clean-shutdown signal for the session. A stream
/// that ends mid-frame is a truncated body, reported as a desync.
pub(super) async fn run_reader<R>(
    mut read: R,
    stop_tx: mpsc::Sender<String>,
    result_tx: mpsc::Sender<String>,
    completions: Arc<CompletionSlot>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_BUF_CAPACITY);

    loop {
        while let Some(frame) = Codec::decode(&mut buf)? {
            route(frame, &stop_tx, &result_tx, &completions).await?;
        }

        let n = read.read_buf(&mut buf).await?;
        if n == 0 {
            // Anything left over besides inter-frame newlines means the
            // stream ended inside a frame.
            if buf.iter().any(|&b| b != b'\n') {
                return Err(Error::desync(format!(
                    "stream ended mid-frame with {} bytes buffered",
                    buf.len()
                )));
            }
            debug!("command stream reached end-of-input");
            return Ok(());
        }
    }
}

/// Dispatch one frame to its response slot.
async fn route(
    frame: Frame,
    stop_tx: &mpsc::Sender<String>,
    result_tx: &mpsc::Sender<String>,
    completions: &CompletionSlot,
) -> Result<()> {
    trace!(indicator = %(frame.indicator as char), len = frame.payload.len(), "frame");
    match frame.indicator {
        // Blocking send: the debuggee waits until the console is ready to
        // show a prompt.
        IND_STOPPED => {
            if stop_tx.send(frame.payload).await.is_err() {
                return Err(Error::ConnectionClosed);
            }
        }
        // At most one command awaits a result at a time, enforced by the
        // command loop's single-flight discipline.
        IND_RESULT => {
            if result_tx.send(frame.payload).await.is_err() {
                return Err(Error::ConnectionClosed);
            }
        }
        IND_COMPLETIONS => completions.store(frame.payload),
        other => {
            // Forward-compatibility escape valve, never fatal.
            warn!(indicator = %(other as char), "unknown inbound indicator, skipping frame");
        }
    }
    Ok(())
}

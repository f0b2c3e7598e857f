//! Accept loop for the test-event endpoint.
//!
//! The debuggee opens a fresh connection per test run, so unlike the command
//! session this endpoint accepts connections for the life of the process.
//! Each connection gets its own parser task; a shape violation ends that
//! connection's parsing without disturbing the others.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::session::SessionWriter;

use super::parser::EventParser;

/// Program types with a known event grammar.
const PROGRAM_TYPE_JAVA: &str = "java";

/// Accept event connections until the listener fails or the process exits.
///
/// Accept errors terminate this loop but not the process; the event endpoint
/// is optional.
pub async fn run_event_listener(listener: TcpListener, program_type: String, writer: SessionWriter) {
    loop {
        match listener.accept().await {
            Ok((conn, peer)) => {
                debug!(%peer, "event connection accepted");
                let program_type = program_type.clone();
                let writer = writer.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(conn, &program_type, writer).await {
                        warn!(%peer, error = %e, "event connection ended with error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "event listener accept failed, no longer accepting");
                return;
            }
        }
    }
}

async fn handle_connection(
    conn: TcpStream,
    program_type: &str,
    writer: SessionWriter,
) -> Result<()> {
    match program_type {
        PROGRAM_TYPE_JAVA => relay_junit_events(conn, writer).await,
        other => {
            // No event grammar for this program type; drain and discard so
            // the runner is not blocked on a full socket buffer.
            warn!(program_type = other, "no event grammar for program type, draining");
            drain(conn).await
        }
    }
}

/// Parse the JUnit runner stream, relaying each event as a quickfix line.
async fn relay_junit_events(conn: TcpStream, writer: SessionWriter) -> Result<()> {
    let mut lines = BufReader::new(conn).lines();
    let mut parser = EventParser::new();

    while let Some(line) = lines.next_line().await? {
        match parser.feed_line(&line) {
            Ok(Some(event)) => writer.send_quickfix(&event.to_string()).await?,
            Ok(None) => {}
            Err(e) => {
                // Shape violation: stop parsing this connection, leave the
                // listener and every other connection running.
                warn!(error = %e, "malformed event record, abandoning connection");
                return Ok(());
            }
        }
    }

    info!("event connection closed");
    Ok(())
}

/// Discard a stream to EOF without buffering it.
async fn drain(mut conn: TcpStream) -> Result<()> {
    let discarded = tokio::io::copy(&mut conn, &mut tokio::io::sink()).await?;
    debug!(bytes = discarded, "drained event connection");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::IND_QUICKFIX;
    use crate::protocol::Codec;
    use crate::session::Session;
    use bytes::BytesMut;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn editor_quickfix_lines(
        mut editor: tokio::io::DuplexStream,
        expected: usize,
    ) -> Vec<String> {
        let mut buf = BytesMut::new();
        let mut lines = Vec::new();
        let mut chunk = [0u8; 256];
        while lines.len() < expected {
            let n = editor.read(&mut chunk).await.unwrap();
            assert!(n > 0, "editor stream closed early");
            buf.extend_from_slice(&chunk[..n]);
            while let Some(frame) = Codec::decode(&mut buf).unwrap() {
                assert_eq!(frame.indicator, IND_QUICKFIX);
                lines.push(frame.payload);
            }
        }
        lines
    }

    #[tokio::test]
    async fn junit_connection_relays_quickfix_frames() {
        let (editor, ours) = tokio::io::duplex(4096);
        let (our_read, our_write) = tokio::io::split(ours);
        let session = Session::start_with(our_read, our_write);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_event_listener(
            listener,
            PROGRAM_TYPE_JAVA.to_string(),
            session.writer(),
        ));

        let mut runner = TcpStream::connect(addr).await.unwrap();
        runner
            .write_all(b"%TESTC 2 v2\n%TESTS 1,fooTest\n%TESTE 1,fooTest\n%RUNTIME 42\n")
            .await
            .unwrap();
        runner.shutdown().await.unwrap();

        let lines = editor_quickfix_lines(editor, 4).await;
        assert_eq!(
            lines,
            vec![
                "Running 2 tests",
                "Test started: fooTest",
                "Test ended: fooTest",
                "Test run finished in 42 milliseconds",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_program_type_is_drained_without_relaying() {
        let (mut editor, ours) = tokio::io::duplex(4096);
        let (our_read, our_write) = tokio::io::split(ours);
        let session = Session::start_with(our_read, our_write);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_event_listener(
            listener,
            "go".to_string(),
            session.writer(),
        ));

        // A chatty runner must never block on a full socket buffer: the
        // stream is consumed to EOF even when nothing understands it.
        let mut runner = TcpStream::connect(addr).await.unwrap();
        let chunk = vec![b'x'; 64 * 1024];
        for _ in 0..16 {
            runner.write_all(&chunk).await.unwrap();
        }
        runner.shutdown().await.unwrap();

        // Nothing is relayed to the editor
        let mut byte = [0u8; 1];
        let quiet = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            editor.read(&mut byte),
        )
        .await;
        assert!(quiet.is_err(), "unexpected relay output for unknown type");
    }

    #[tokio::test]
    async fn malformed_record_halts_only_that_connection() {
        let (editor, ours) = tokio::io::duplex(4096);
        let (our_read, our_write) = tokio::io::split(ours);
        let session = Session::start_with(our_read, our_write);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_event_listener(
            listener,
            PROGRAM_TYPE_JAVA.to_string(),
            session.writer(),
        ));

        // First connection sends a malformed run-start: no event, parsing halts
        let mut bad = TcpStream::connect(addr).await.unwrap();
        bad.write_all(b"%TESTC 10\n%TESTS 1,neverSeen\n").await.unwrap();
        bad.shutdown().await.unwrap();

        // A later connection is still served
        let mut good = TcpStream::connect(addr).await.unwrap();
        good.write_all(b"%RUNTIME 7\n").await.unwrap();
        good.shutdown().await.unwrap();

        let lines = editor_quickfix_lines(editor, 1).await;
        assert_eq!(lines, vec!["Test run finished in 7 milliseconds"]);
    }
}

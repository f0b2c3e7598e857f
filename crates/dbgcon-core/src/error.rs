//! Error types for dbgcon-core.

use thiserror::Error;

/// Main error type for dbgcon operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol desync: frame boundaries can no longer be trusted.
    ///
    /// The wire format carries no resync marker, so this is unrecoverable
    /// and terminates the process.
    #[error("protocol desync: {message}")]
    Desync { message: String },

    /// Structured payload (scopes or completion JSON) failed to parse.
    ///
    /// Indicates the two ends disagree on payload semantics.
    #[error("malformed payload: {message}")]
    Payload { message: String },

    /// Shape violation in a test-event record. Local to one event
    /// connection, never terminates the process.
    #[error("event stream error: {message}")]
    EventStream { message: String },

    /// Connection was closed cleanly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Line editor error.
    #[error("readline error: {message}")]
    Readline { message: String },
}

impl Error {
    /// Returns true if this error terminates the whole session.
    ///
    /// Fatal errors mean the console and the debuggee have desynced on frame
    /// boundaries or payload shape; there is no recovery strategy, only
    /// crash-and-restart.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Desync { .. } | Error::Payload { .. })
    }

    /// Returns true if this error is local to a single event connection.
    pub fn is_connection_local(&self) -> bool {
        matches!(self, Error::EventStream { .. })
    }

    /// Shorthand for a desync error.
    pub fn desync(message: impl Into<String>) -> Self {
        Error::Desync {
            message: message.into(),
        }
    }

    /// Shorthand for an event-stream error.
    pub fn event_stream(message: impl Into<String>) -> Self {
        Error::EventStream {
            message: message.into(),
        }
    }
}

/// Convenience result type for dbgcon operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_desync() {
        let err = Error::desync("length field is not numeric");
        assert_eq!(
            err.to_string(),
            "protocol desync: length field is not numeric"
        );
    }

    #[test]
    fn error_display_event_stream() {
        let err = Error::event_stream("%TESTS expected 2 fields, got 3");
        assert_eq!(
            err.to_string(),
            "event stream error: %TESTS expected 2 fields, got 3"
        );
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn fatal_classification() {
        assert!(Error::desync("truncated body").is_fatal());
        assert!(Error::Payload {
            message: "bad json".into()
        }
        .is_fatal());

        assert!(!Error::ConnectionClosed.is_fatal());
        assert!(!Error::event_stream("bad record").is_fatal());
        assert!(!Error::Io(std::io::Error::other("io")).is_fatal());
    }

    #[test]
    fn connection_local_classification() {
        assert!(Error::event_stream("bad record").is_connection_local());
        assert!(!Error::desync("bad frame").is_connection_local());
    }
}

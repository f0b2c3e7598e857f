//! Protocol and configuration constants for dbgcon.

use std::time::Duration;

// =============================================================================
// Frame Protocol Constants
// =============================================================================

/// Delimiter between the decimal length field and the frame body.
pub const LENGTH_DELIMITER: u8 = b'#';

/// Maximum frame body size (1 MiB). Completion item lists and scope dumps
/// are the largest payloads and stay far below this.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum number of decimal digits in a length field before the stream is
/// considered desynced (enough for MAX_FRAME_SIZE and then some).
pub const MAX_LENGTH_DIGITS: usize = 10;

// Inbound frame indicators (debuggee -> console).

/// The debuggee has suspended; payload is a human-readable location.
pub const IND_STOPPED: u8 = b'@';

/// Result of the most recently issued evaluation or scopes request.
pub const IND_RESULT: u8 = b'!';

/// Result of the most recently issued completion query.
pub const IND_COMPLETIONS: u8 = b'?';

// Outbound frame indicators (console -> debuggee).

/// Control command text ("continue", "next", "scopes").
pub const IND_COMMAND: u8 = b':';

/// Expression to evaluate in the debuggee's context.
pub const IND_EVAL: u8 = b'!';

/// Completion query: "<cursor-pos>|<line-text>".
pub const IND_COMPLETE: u8 = b'?';

/// Quickfix line relayed to the editor driving the console.
pub const IND_QUICKFIX: u8 = b'q';

// =============================================================================
// Test-Event Stream Markers
// =============================================================================

/// Test run started: `%TESTC <count> v2`.
pub const MARKER_RUN_START: &str = "%TESTC";

/// Test run finished: `%RUNTIME<elapsed-millis>`.
pub const MARKER_RUN_END: &str = "%RUNTIME";

/// Single test started: `%TESTS <id>,<name>`.
pub const MARKER_TEST_START: &str = "%TESTS";

/// Single test ended: `%TESTE <id>,<name>`.
pub const MARKER_TEST_END: &str = "%TESTE";

/// Single test failed: `%FAILED <id>,<name>`.
pub const MARKER_TEST_FAILED: &str = "%FAILED";

/// Single test errored: `%ERROR <id>,<name>`.
pub const MARKER_TEST_ERROR: &str = "%ERROR";

/// Start of an embedded stack trace.
pub const MARKER_TRACE_START: &str = "%TRACES";

/// End of an embedded stack trace.
pub const MARKER_TRACE_END: &str = "%TRACEE";

/// Protocol version token expected in the run-start record.
pub const EVENT_PROTOCOL_VERSION: &str = "v2";

// =============================================================================
// Timing Constants
// =============================================================================

/// Bounded wait for a completion result before giving up with no candidates.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay before teardown so the editor can collect trailing output.
pub const SHUTDOWN_LINGER: Duration = Duration::from_secs(5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_and_outbound_command_indicators_disjoint() {
        // ':' and 'q' never appear inbound; '@' never appears outbound.
        assert_ne!(IND_COMMAND, IND_STOPPED);
        assert_ne!(IND_QUICKFIX, IND_STOPPED);
    }

    #[test]
    fn length_digits_cover_max_frame() {
        assert!(MAX_FRAME_SIZE.to_string().len() <= MAX_LENGTH_DIGITS);
    }

    #[test]
    fn markers_share_prefix_byte() {
        for marker in [
            MARKER_RUN_START,
            MARKER_RUN_END,
            MARKER_TEST_START,
            MARKER_TEST_END,
            MARKER_TEST_FAILED,
            MARKER_TEST_ERROR,
            MARKER_TRACE_START,
            MARKER_TRACE_END,
        ] {
            assert!(marker.starts_with('%'));
        }
    }

    #[test]
    fn completion_timeout_is_shorter_than_linger() {
        assert!(COMPLETION_TIMEOUT < SHUTDOWN_LINGER);
    }
}

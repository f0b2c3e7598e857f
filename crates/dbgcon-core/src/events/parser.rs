//! Line parser for the JUnit remote-runner event stream.
//!
//! Two states: `Normal` classifies lines by their marker prefix; `InTrace`
//! passes every line through verbatim until the trace-end marker. The parser
//! never backtracks and holds no state beyond the current mode, so one
//! instance per connection is all that is needed.

use std::fmt;

use tracing::warn;

use crate::constants::{
    EVENT_PROTOCOL_VERSION, MARKER_RUN_END, MARKER_RUN_START, MARKER_TEST_END,
    MARKER_TEST_ERROR, MARKER_TEST_FAILED, MARKER_TEST_START, MARKER_TRACE_END,
    MARKER_TRACE_START,
};
use crate::error::{Error, Result};

/// A discrete test-execution event. Ephemeral; rendered for display as soon
/// as it is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestEvent {
    RunStarted { count: u32 },
    RunFinished { elapsed_ms: u64 },
    TestStarted { id: u32, name: String },
    TestEnded { id: u32, name: String },
    TestFailedOrErrored { id: u32, name: String },
    TraceLine { text: String },
}

impl fmt::Display for TestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestEvent::RunStarted { count } => write!(f, "Running {} tests", count),
            TestEvent::RunFinished { elapsed_ms } => {
                write!(f, "Test run finished in {} milliseconds", elapsed_ms)
            }
            TestEvent::TestStarted { name, .. } => write!(f, "Test started: {}", name),
            TestEvent::TestEnded { name, .. } => write!(f, "Test ended: {}", name),
            TestEvent::TestFailedOrErrored { name, .. } => {
                write!(f, "Test errored or failed: {}", name)
            }
            TestEvent::TraceLine { text } => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InTrace,
}

/// Per-connection event state machine.
#[derive(Debug)]
pub struct EventParser {
    state: State,
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EventParser {
    pub fn new() -> Self {
        Self {
            state: State::Normal,
        }
    }

    /// Feed one line, producing at most one event.
    ///
    /// Returns `Ok(None)` for marker lines and unrecognized lines (the
    /// latter are logged and skipped). A shape violation — wrong field
    /// count, bad protocol version, unparsable id or count — returns an
    /// error that ends parsing of this connection only.
    pub fn feed_line(&mut self, line: &str) -> Result<Option<TestEvent>> {
        match self.state {
            State::InTrace => {
                if line.starts_with(MARKER_TRACE_END) {
                    self.state = State::Normal;
                    return Ok(None);
                }
                Ok(Some(TestEvent::TraceLine {
                    text: line.to_string(),
                }))
            }
            State::Normal => {
                if line.starts_with(MARKER_TRACE_START) {
                    self.state = State::InTrace;
                    return Ok(None);
                }
                self.classify(line)
            }
        }
    }

    fn classify(&self, line: &str) -> Result<Option<TestEvent>> {
        if line.starts_with(MARKER_RUN_START) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 {
                return Err(field_count(MARKER_RUN_START, 3, fields.len()));
            }
            if fields[2] != EVENT_PROTOCOL_VERSION {
                return Err(Error::event_stream(format!(
                    "{} expected {}, got {}",
                    MARKER_RUN_START, EVENT_PROTOCOL_VERSION, fields[2]
                )));
            }
            let count = parse_number(MARKER_RUN_START, fields[1])?;
            Ok(Some(TestEvent::RunStarted { count }))
        } else if line.starts_with(MARKER_RUN_END) {
            let rest = line[MARKER_RUN_END.len()..].trim();
            let elapsed_ms = parse_number(MARKER_RUN_END, rest)?;
            Ok(Some(TestEvent::RunFinished { elapsed_ms }))
        } else if line.starts_with(MARKER_TEST_START) {
            let (id, name) = parse_test_fields(MARKER_TEST_START, line)?;
            Ok(Some(TestEvent::TestStarted { id, name }))
        } else if line.starts_with(MARKER_TEST_END) {
            let (id, name) = parse_test_fields(MARKER_TEST_END, line)?;
            Ok(Some(TestEvent::TestEnded { id, name }))
        } else if line.starts_with(MARKER_TEST_FAILED) {
            let (id, name) = parse_test_fields(MARKER_TEST_FAILED, line)?;
            Ok(Some(TestEvent::TestFailedOrErrored { id, name }))
        } else if line.starts_with(MARKER_TEST_ERROR) {
            let (id, name) = parse_test_fields(MARKER_TEST_ERROR, line)?;
            Ok(Some(TestEvent::TestFailedOrErrored { id, name }))
        } else {
            warn!(line, "unrecognized event line, skipping");
            Ok(None)
        }
    }
}

fn field_count(marker: &str, expected: usize, got: usize) -> Error {
    Error::event_stream(format!(
        "{} expected {} fields, got {}",
        marker, expected, got
    ))
}

fn parse_number<T: std::str::FromStr>(marker: &str, text: &str) -> Result<T> {
    text.parse().map_err(|_| {
        Error::event_stream(format!("{} has non-numeric field {:?}", marker, text))
    })
}

/// Parse a `<marker> <id>,<name>` record.
fn parse_test_fields(marker: &str, line: &str) -> Result<(u32, String)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(field_count(marker, 2, fields.len()));
    }
    let Some((id, name)) = fields[1].split_once(',') else {
        return Err(Error::event_stream(format!(
            "{} field is not an id,name pair: {:?}",
            marker, fields[1]
        )));
    };
    Ok((parse_number(marker, id)?, name.to_string()))
}

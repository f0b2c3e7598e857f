//! Test-event stream handling.
//!
//! The debuggee runs tests under a JUnit remote runner that streams
//! line-oriented lifecycle events (run started/finished, per-test
//! start/end/failure) with stack traces embedded between trace markers.
//! Each accepted connection gets its own [`EventParser`] instance; emitted
//! events are rendered and relayed to the editor as quickfix lines.

mod listener;
mod parser;

pub use listener::run_event_listener;
pub use parser::{EventParser, TestEvent};

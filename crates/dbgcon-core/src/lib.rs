//! dbgcon-core: Shared library for the debug console.
//!
//! This crate provides:
//! - Wire format codec for the command session frame protocol
//! - Session management: frame reader, response slots, outbound writer
//! - Test-event demultiplexer for the JUnit remote-runner line stream
//! - Endpoint publication for launcher discovery
//! - Error types and logging setup

pub mod bootstrap;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod protocol;
pub mod session;

pub use error::{Error, Result};
pub use logging::{LogFormat, init_logging};

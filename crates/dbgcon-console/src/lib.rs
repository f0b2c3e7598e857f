//! dbgcon-console: interactive terminal front-end for a remote debuggee.
//!
//! The binary wires together the pieces from `dbgcon-core`: it publishes
//! its endpoints, accepts the command session connection, and drives the
//! rustyline-based command loop defined here.

pub mod cli;
pub mod console;

pub use cli::Cli;
pub use console::{Console, ConsoleOptions};

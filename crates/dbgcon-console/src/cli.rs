//! Console CLI implementation.
//!
//! Provides command-line argument parsing using clap. The console is not
//! normally started by hand: an editor plugin launches it, passes the file
//! paths it wants the endpoints published to, and then connects.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

/// Log output format for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliLogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

impl From<CliLogFormat> for dbgcon_core::LogFormat {
    fn from(fmt: CliLogFormat) -> Self {
        match fmt {
            CliLogFormat::Text => dbgcon_core::LogFormat::Text,
            CliLogFormat::Json => dbgcon_core::LogFormat::Json,
        }
    }
}

/// Interactive console for a remote debuggee.
#[derive(Debug, Parser)]
#[command(name = "dbgcon", version, about = "Interactive console for a remote debuggee")]
pub struct Cli {
    /// File to publish the command session endpoint to (host:port)
    #[arg(long, value_name = "PATH")]
    pub client_addr_file: PathBuf,

    /// File to publish the test-event endpoint to (bare port); omit to
    /// disable the event endpoint
    #[arg(long, value_name = "PATH")]
    pub program_port_file: Option<PathBuf>,

    /// Type of the running program, e.g. 'java'
    #[arg(long, value_name = "TYPE", default_value = "")]
    pub program_type: String,

    /// Path to the readline history file
    #[arg(long, value_name = "PATH")]
    pub history: Option<PathBuf>,

    /// Enable vim editing mode
    #[arg(long)]
    pub vim: bool,

    /// File to write this process's pid to
    #[arg(long, value_name = "PATH")]
    pub pid_file: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Text)]
    pub log_format: CliLogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_invocation_parses() {
        let cli = Cli::parse_from(["dbgcon", "--client-addr-file", "/tmp/client.addr"]);
        assert_eq!(cli.client_addr_file, PathBuf::from("/tmp/client.addr"));
        assert!(cli.program_port_file.is_none());
        assert!(cli.program_type.is_empty());
        assert!(!cli.vim);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn full_invocation_parses() {
        let cli = Cli::parse_from([
            "dbgcon",
            "--client-addr-file",
            "/tmp/client.addr",
            "--program-port-file",
            "/tmp/program.port",
            "--program-type",
            "java",
            "--history",
            "/tmp/history",
            "--vim",
            "--pid-file",
            "/tmp/console.pid",
            "-vv",
            "--log-file",
            "/tmp/console.log",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.program_type, "java");
        assert!(cli.vim);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, CliLogFormat::Json);
    }

    #[test]
    fn client_addr_file_is_required() {
        assert!(Cli::try_parse_from(["dbgcon"]).is_err());
    }

    #[test]
    fn log_format_bridges_to_core() {
        assert_eq!(
            dbgcon_core::LogFormat::from(CliLogFormat::Json),
            dbgcon_core::LogFormat::Json
        );
    }
}

//! Interactive command loop.
//!
//! The loop is single-threaded and cooperative: it blocks on the stop slot
//! until the debuggee suspends, runs an interactive phase accepting one line
//! at a time, and resumes waiting once a continue/step command hands control
//! back to the debuggee. Only one request is ever in flight; every command
//! drains its response slot before the loop reads the next line.

mod completer;

use std::collections::HashMap;
use std::path::PathBuf;

use rustyline::config::{CompletionType, Config, EditMode};
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use serde::Deserialize;
use tokio::runtime::Handle;
use tracing::{debug, info};

use dbgcon_core::error::{Error, Result};
use dbgcon_core::session::{Session, SessionWriter};

use completer::ConsoleHelper;

const PROMPT: &str = "Debug Console> ";

/// Console configuration taken from the CLI.
#[derive(Debug, Default)]
pub struct ConsoleOptions {
    /// Readline history file.
    pub history: Option<PathBuf>,
    /// Vim editing mode.
    pub vim: bool,
}

/// Whether a command hands control back to the debuggee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Stay,
    Resume,
}

/// One variable in a scopes result.
#[derive(Debug, Deserialize)]
struct Variable {
    name: String,
    value: String,
}

/// The interactive console.
pub struct Console {
    handle: Handle,
    session: Session,
    writer: SessionWriter,
    editor: Editor<ConsoleHelper, FileHistory>,
    history: Option<PathBuf>,
}

impl Console {
    pub fn new(handle: Handle, session: Session, options: ConsoleOptions) -> Result<Self> {
        let config = Config::builder()
            .auto_add_history(false)
            .completion_type(CompletionType::List)
            .edit_mode(if options.vim {
                EditMode::Vi
            } else {
                EditMode::Emacs
            })
            .build();

        let mut editor: Editor<ConsoleHelper, FileHistory> =
            Editor::with_config(config).map_err(readline_err)?;
        editor.set_helper(Some(ConsoleHelper::new(
            handle.clone(),
            session.writer(),
            session.completions(),
        )));

        if let Some(path) = &options.history {
            // A missing history file on first start is expected
            if let Err(e) = editor.load_history(path) {
                debug!(path = %path.display(), error = %e, "no history loaded");
            }
        }

        let writer = session.writer();
        Ok(Self {
            handle,
            session,
            writer,
            editor,
            history: options.history,
        })
    }

    /// Run until the command stream ends.
    ///
    /// Returns the session so the caller can surface the reader's exit
    /// status (clean end-of-input versus fatal desync).
    pub fn run(mut self) -> Result<Session> {
        loop {
            println!("Program is running...");
            let Some(location) = self.handle.block_on(self.session.recv_stop()) else {
                break;
            };
            println!("Stopped at {}", location);
            self.interactive()?;
        }

        println!("Exiting.");
        if let Some(path) = &self.history {
            if let Err(e) = self.editor.save_history(path) {
                debug!(path = %path.display(), error = %e, "failed to save history");
            }
        }
        Ok(self.session)
    }

    /// One interactive phase, ending when a command resumes the debuggee.
    fn interactive(&mut self) -> Result<()> {
        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);
                    if self.dispatch(line)? == Flow::Resume {
                        return Ok(());
                    }
                }
                // Absorbed so an interactive interrupt never aborts an
                // in-flight request.
                Err(ReadlineError::Interrupted) => continue,
                // End-of-input is an implicit continue
                Err(ReadlineError::Eof) => {
                    self.resume("continue", "continuing")?;
                    return Ok(());
                }
                Err(e) => return Err(readline_err(e)),
            }
        }
    }

    fn dispatch(&mut self, line: &str) -> Result<Flow> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "continue" | "c" => {
                self.resume("continue", "continuing")?;
                Ok(Flow::Resume)
            }
            "step" | "next" | "s" => {
                self.resume("next", "stepping")?;
                Ok(Flow::Resume)
            }
            "eval" | "!" => {
                self.eval(rest)?;
                Ok(Flow::Stay)
            }
            "scopes" => {
                self.scopes()?;
                Ok(Flow::Stay)
            }
            "help" | "?" => {
                print_help();
                Ok(Flow::Stay)
            }
            // Anything unrecognized is evaluated in the debuggee's context
            _ => {
                self.eval(line)?;
                Ok(Flow::Stay)
            }
        }
    }

    /// Send a control command that hands control back to the debuggee.
    fn resume(&mut self, command: &str, message: &str) -> Result<()> {
        self.handle.block_on(self.writer.send_command(command))?;
        info!(command, "resuming debuggee");
        println!("{}", message);
        println!();
        Ok(())
    }

    fn eval(&mut self, expression: &str) -> Result<()> {
        self.handle.block_on(self.writer.send_eval(expression))?;
        let result = self.handle.block_on(self.session.recv_result())?;
        println!("{}", result);
        Ok(())
    }

    fn scopes(&mut self) -> Result<()> {
        self.handle.block_on(self.writer.send_command("scopes"))?;
        let payload = self.handle.block_on(self.session.recv_result())?;

        let scopes: HashMap<String, Vec<Variable>> =
            serde_json::from_str(&payload).map_err(|e| Error::Payload {
                message: format!("failed to parse scopes: {}", e),
            })?;

        for (scope, variables) in &scopes {
            println!("{}", scope);
            for variable in variables {
                println!("    {} = {}", variable.name, variable.value);
            }
        }
        println!();
        Ok(())
    }
}

/// Map an editor error back to the session taxonomy. Session errors the
/// completer tunneled through `ReadlineError::Io` are recovered intact so a
/// fatal payload mismatch is not misreported as editor trouble.
fn readline_err(e: ReadlineError) -> Error {
    match e {
        ReadlineError::Io(io_err) => match io_err.downcast::<Error>() {
            Ok(inner) => inner,
            Err(io_err) => Error::Io(io_err),
        },
        other => Error::Readline {
            message: other.to_string(),
        },
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  continue, c        - continue execution after stopping");
    println!("  step, next, s      - move forward one step");
    println!("  eval <expr>, ! ... - evaluate the rest of the line in the debuggee");
    println!("  scopes             - see available scopes");
    println!("  help, ?            - print this help text");
    println!();
    println!("Any other input is evaluated as an expression.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_payload_shape() {
        let payload = r#"{"Locals":[{"name":"x","value":"2"},{"name":"y","value":"\"s\""}]}"#;
        let scopes: HashMap<String, Vec<Variable>> = serde_json::from_str(payload).unwrap();
        assert_eq!(scopes["Locals"].len(), 2);
        assert_eq!(scopes["Locals"][0].name, "x");
        assert_eq!(scopes["Locals"][1].value, "\"s\"");
    }

    #[test]
    fn tunneled_payload_error_survives_editor_boundary() {
        let tunneled = completer::tunnel(Error::Payload {
            message: "malformed completion payload".into(),
        });
        let err = readline_err(tunneled);
        assert!(matches!(err, Error::Payload { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn plain_io_editor_error_stays_io() {
        let e = ReadlineError::Io(std::io::Error::other("tty gone"));
        assert!(matches!(readline_err(e), Error::Io(_)));
    }

    #[test]
    fn malformed_scopes_payload_is_payload_error() {
        let parsed: std::result::Result<HashMap<String, Vec<Variable>>, _> =
            serde_json::from_str("[1,2,3]");
        let err = parsed.map_err(|e| Error::Payload {
            message: format!("failed to parse scopes: {}", e),
        });
        assert!(err.unwrap_err().is_fatal());
    }
}

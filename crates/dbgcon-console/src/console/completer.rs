//! Remote tab completion for the console's line editor.
//!
//! The editor calls the completer synchronously; behind that interface sits
//! a round trip to the debuggee: send a `?` query with the cursor position
//! and line text, then wait (bounded) on the completion slot for a JSON
//! array of candidate items.

use std::sync::Arc;

use rustyline::Context;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use tokio::runtime::Handle;
use tracing::debug;

use dbgcon_core::Error;
use dbgcon_core::constants::COMPLETION_TIMEOUT;
use dbgcon_core::session::{CompletionSlot, SessionWriter};

/// Editor helper carrying the completion capability.
pub struct ConsoleHelper {
    handle: Handle,
    writer: SessionWriter,
    completions: Arc<CompletionSlot>,
}

impl ConsoleHelper {
    pub fn new(handle: Handle, writer: SessionWriter, completions: Arc<CompletionSlot>) -> Self {
        Self {
            handle,
            writer,
            completions,
        }
    }

    /// Complete an expression at `pos` within `line` via the debuggee.
    fn complete_expression(
        &self,
        line: &str,
        pos: usize,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Some(prefix) = completion_prefix(line, pos) else {
            return Ok((pos, Vec::new()));
        };

        // The remote expects a 1-based character position
        let cursor_pos = line[..pos].chars().count() + 1;
        self.handle
            .block_on(self.writer.send_completion_query(cursor_pos, line))
            .map_err(tunnel)?;

        // Bounded wait: a stalled debuggee degrades to "no completions"
        // instead of freezing the editor.
        let payload = match self.handle.block_on(tokio::time::timeout(
            COMPLETION_TIMEOUT,
            self.completions.recv(),
        )) {
            Ok(payload) => payload,
            Err(_) => {
                debug!("completion request timed out");
                return Ok((pos, Vec::new()));
            }
        };

        let candidates =
            parse_candidates(&payload).map_err(|message| tunnel(Error::Payload { message }))?;

        let pairs: Vec<Pair> = candidates
            .into_iter()
            .filter(|text| text.starts_with(prefix))
            .map(|text| Pair {
                display: text.clone(),
                replacement: text,
            })
            .collect();

        Ok((pos - prefix.len(), pairs))
    }
}

/// Smuggle a session error through the editor's error type; the command
/// loop's error mapping downcasts it back out so the classification (fatal
/// payload mismatch versus editor trouble) survives the round trip.
pub(super) fn tunnel(e: Error) -> ReadlineError {
    ReadlineError::Io(std::io::Error::other(e))
}

/// Extract the completion prefix: the run of alphanumeric characters ending
/// at the cursor. Returns `None` when no round trip should be made (an empty
/// prefix that does not follow a `.`), matching C-like member access.
fn completion_prefix(line: &str, pos: usize) -> Option<&str> {
    let before = &line[..pos];
    let mut word_break = None;
    for (idx, ch) in before.char_indices().rev() {
        if !ch.is_alphanumeric() {
            word_break = Some((idx, ch));
            break;
        }
    }

    match word_break {
        None => Some(before),
        Some((idx, ch)) => {
            let prefix = &before[idx + ch.len_utf8()..];
            if ch != '.' && prefix.is_empty() {
                None
            } else {
                Some(prefix)
            }
        }
    }
}

/// Parse a completion payload: a JSON array of objects carrying a `text` or
/// `label` string field. Items with neither are skipped.
fn parse_candidates(payload: &str) -> Result<Vec<String>, String> {
    let items: Vec<serde_json::Value> = serde_json::from_str(payload)
        .map_err(|e| format!("malformed completion payload: {}", e))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            item.get("text")
                .or_else(|| item.get("label"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .collect())
}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let before = &line[..pos];
        let Some(first_space) = before.find(' ') else {
            // Single word so far: complete it as an expression
            return self.complete_expression(line, pos);
        };

        // Multiple words: only eval arguments are completable
        match &before[..first_space] {
            "eval" | "!" => {
                let (start, pairs) =
                    self.complete_expression(&line[first_space..], pos - first_space)?;
                Ok((start + first_space, pairs))
            }
            command => {
                debug!(command, "no completion for command arguments");
                Ok((pos, Vec::new()))
            }
        }
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;
}

impl Highlighter for ConsoleHelper {}

impl Validator for ConsoleHelper {}

impl rustyline::Helper for ConsoleHelper {}

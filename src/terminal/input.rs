//! Operator input: classification of typed lines and the readers that feed
//! them to the session.
//!
//! Two readers exist. [`spawn_line_reader`] reads newline-terminated lines
//! from any [`BufRead`] (piped stdin, tests). [`spawn_interactive_reader`]
//! puts the terminal in raw mode and runs the [`LineEditor`] so submitted
//! lines can be recalled with the arrow keys.

use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::editor::{EditAction, LineEditor};
use super::TerminalSink;

/// How often the interactive reader checks whether the session went away.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Local command intercepted before anything reaches the producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalCommand {
    /// Clear the visible terminal buffer.
    Clear,
    /// Prefixed text that names no known command.
    Unknown(String),
}

/// What to do with one line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Empty input; dropped silently.
    Skip,
    /// Handled locally, never forwarded.
    Command(LocalCommand),
    /// Forward the text to the producer as an `Input` record.
    Forward(String),
}

/// Classify a typed line.
///
/// A line whose trimmed text starts with `prefix` is a local command; the
/// text after the prefix names it (`@clear`). Anything else that is not
/// empty, whitespace included, is forwarded exactly as typed.
#[must_use]
pub fn classify_input(line: &str, prefix: &str) -> InputAction {
    if line.is_empty() {
        return InputAction::Skip;
    }
    let trimmed = line.trim();
    match trimmed.strip_prefix(prefix) {
        Some("clear") => InputAction::Command(LocalCommand::Clear),
        Some(_) => InputAction::Command(LocalCommand::Unknown(trimmed.to_owned())),
        None => InputAction::Forward(line.to_owned()),
    }
}

/// Spawn a detached thread that forwards lines from stdin into a channel.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_stdin_reader(capacity: usize) -> io::Result<mpsc::Receiver<String>> {
    spawn_line_reader(BufReader::new(io::stdin()), capacity)
}

/// Spawn a detached thread that forwards lines from `reader` into a channel.
///
/// Bytes that are not valid UTF-8 are replaced rather than ending input. The
/// channel closes on end of input or an I/O error. The thread is never
/// joined, so a read blocked on the terminal cannot delay process exit.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_line_reader<R>(mut reader: R, capacity: usize) -> io::Result<mpsc::Receiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw) {
                    Ok(0) => {
                        debug!("stdin reader: end of input");
                        return;
                    }
                    Ok(_) => {
                        if tx.blocking_send(decode_line(&raw)).is_err() {
                            debug!("stdin reader: input loop gone, stopping");
                            return;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(err) => {
                        warn!(%err, "stdin reader: read failed, stopping");
                        return;
                    }
                }
            }
        })?;
    Ok(rx)
}

fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Put the terminal in raw mode and spawn the line editor thread.
///
/// Submitted lines go into the returned channel and are kept in the editor's
/// history for Up/Down recall. Ctrl-C and Ctrl-D on an empty line end input.
/// The thread leaves raw mode when it stops, including when the session
/// drops the receiver; the returned guard does the same when dropped so the
/// terminal is restored even if the process exits first.
///
/// # Errors
///
/// Returns the OS error if raw mode cannot be enabled or the thread cannot
/// be spawned.
pub fn spawn_interactive_reader(
    sink: Arc<TerminalSink>,
    history_limit: usize,
    capacity: usize,
) -> io::Result<(mpsc::Receiver<String>, RawModeGuard)> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    enable_raw_mode()?;
    let guard = RawModeGuard;
    thread::Builder::new()
        .name("line-editor".into())
        .spawn(move || {
            let mut editor = LineEditor::new(history_limit);
            sink.show_prompt(editor.line(), editor.cursor());
            if let Err(err) = edit_loop(&mut editor, &sink, &tx) {
                warn!(%err, "line editor: terminal read failed, stopping");
            }
            sink.hide_prompt();
            if let Err(err) = disable_raw_mode() {
                warn!(%err, "line editor: failed to leave raw mode");
            }
        })?;
    Ok((rx, guard))
}

/// Leaves raw mode on drop.
#[derive(Debug)]
pub struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn edit_loop(
    editor: &mut LineEditor,
    sink: &TerminalSink,
    tx: &mpsc::Sender<String>,
) -> io::Result<()> {
    while !tx.is_closed() {
        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let key = match event::read()? {
            Event::Key(key) => key,
            Event::Resize(..) => {
                sink.show_prompt(editor.line(), editor.cursor());
                continue;
            }
            _ => continue,
        };
        match editor.handle_key(key) {
            EditAction::Ignore => {}
            EditAction::Redraw => sink.show_prompt(editor.line(), editor.cursor()),
            EditAction::Submit(line) => {
                sink.commit_prompt();
                if tx.blocking_send(line).is_err() {
                    debug!("line editor: input loop gone, stopping");
                    return Ok(());
                }
            }
            EditAction::Interrupt | EditAction::EndOfInput => {
                debug!("line editor: operator ended input");
                return Ok(());
            }
        }
    }
    Ok(())
}

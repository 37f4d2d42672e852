//! Operator-facing output.
//!
//! All rendering is synchronous and holds the writer lock for the whole
//! record, so a log line and its stack trace are always adjacent even when the
//! network task and the input loop both write.
//!
//! While the interactive editor is active the sink also owns the prompt line:
//! records are written above it and the prompt is redrawn underneath, and
//! lines end in `\r\n` because the terminal is in raw mode.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Local, TimeZone};
use crossterm::cursor::{MoveTo, MoveToColumn};
use crossterm::style::{Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::tty::IsTty;
use crossterm::{execute, queue};
use tracing::warn;

use super::style::LineStyle;
use crate::protocol::{LogEntry, LogType};

/// Marker drawn in front of the operator's edit line.
pub const PROMPT: &str = "> ";

type SharedWriter = Box<dyn Write + Send>;

/// Edit line currently drawn at the bottom of the terminal.
#[derive(Debug, Clone, Default)]
struct PromptLine {
    text: String,
    cursor: usize,
}

/// Writer plus the prompt drawn on it; both change under one lock.
struct Screen {
    out: SharedWriter,
    prompt: Option<PromptLine>,
}

/// Renders log records for the operator.
///
/// Owns presentation state only; it has no access to the network.
pub struct TerminalSink {
    screen: Mutex<Screen>,
    styled: bool,
}

impl TerminalSink {
    /// Sink writing to the process stdout.
    ///
    /// Colors are applied only when `color` is set and stdout is a terminal.
    #[must_use]
    pub fn stdout(color: bool) -> Self {
        let styled = color && io::stdout().is_tty();
        Self::with_writer(io::stdout(), styled)
    }

    /// Sink writing to an arbitrary writer.
    #[must_use]
    pub fn with_writer(writer: impl Write + Send + 'static, styled: bool) -> Self {
        Self {
            screen: Mutex::new(Screen {
                out: Box::new(writer),
                prompt: None,
            }),
            styled,
        }
    }

    /// Render one line, prefixed with a timestamp when `timestamp_ms > 0`,
    /// followed by `stack_trace` on its own line in the same style.
    pub fn render(
        &self,
        log_type: LogType,
        text: &str,
        timestamp_ms: i64,
        stack_trace: Option<&str>,
    ) {
        let style = LineStyle::for_log_type(log_type);
        let line = format_line(text, timestamp_ms);
        let trace = stack_trace.filter(|trace| !trace.is_empty());

        let mut screen = lock(&self.screen);
        if let Err(err) = self.write_record(&mut screen, style, &line, trace) {
            warn!(%err, "terminal write failed");
        }
    }

    /// Render a producer log entry.
    pub fn render_entry(&self, entry: &LogEntry) {
        self.render(
            entry.log_type,
            &entry.content,
            entry.timestamp,
            entry.stack_trace.as_deref(),
        );
    }

    /// Relay status line.
    pub fn system(&self, text: &str) {
        self.render(LogType::System, text, 0, None);
    }

    /// Relay warning line.
    pub fn warning(&self, text: &str) {
        self.render(LogType::Warning, text, 0, None);
    }

    /// Relay error line.
    pub fn error(&self, text: &str) {
        self.render(LogType::Error, text, 0, None);
    }

    /// Clear the visible screen and home the cursor, keeping the prompt.
    pub fn clear(&self) {
        let mut screen = lock(&self.screen);
        let result = execute!(screen.out, Clear(ClearType::All), MoveTo(0, 0))
            .and_then(|()| draw_prompt(&mut screen));
        if let Err(err) = result {
            warn!(%err, "terminal clear failed");
        }
    }

    /// Draw (or redraw) the edit line with the cursor at char index `cursor`.
    pub fn show_prompt(&self, text: &str, cursor: usize) {
        let mut screen = lock(&self.screen);
        screen.prompt = Some(PromptLine {
            text: text.to_owned(),
            cursor,
        });
        if let Err(err) = draw_prompt(&mut screen) {
            warn!(%err, "prompt redraw failed");
        }
    }

    /// Leave the submitted edit line on screen and start an empty one below.
    pub fn commit_prompt(&self) {
        let mut screen = lock(&self.screen);
        if screen.prompt.is_none() {
            return;
        }
        screen.prompt = Some(PromptLine::default());
        let result = write!(screen.out, "\r\n").and_then(|()| draw_prompt(&mut screen));
        if let Err(err) = result {
            warn!(%err, "prompt commit failed");
        }
    }

    /// Erase the edit line and go back to plain line output.
    pub fn hide_prompt(&self) {
        let mut screen = lock(&self.screen);
        if screen.prompt.take().is_none() {
            return;
        }
        let result = queue!(screen.out, MoveToColumn(0), Clear(ClearType::CurrentLine))
            .and_then(|()| screen.out.flush());
        if let Err(err) = result {
            warn!(%err, "prompt erase failed");
        }
    }

    fn write_record(
        &self,
        screen: &mut Screen,
        style: LineStyle,
        line: &str,
        trace: Option<&str>,
    ) -> io::Result<()> {
        let raw = screen.prompt.is_some();
        if raw {
            queue!(screen.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        }
        self.write_line(&mut screen.out, style, line, raw)?;
        if let Some(trace) = trace {
            self.write_line(&mut screen.out, style, trace, raw)?;
        }
        if raw {
            draw_prompt(screen)
        } else {
            screen.out.flush()
        }
    }

    fn write_line(
        &self,
        out: &mut SharedWriter,
        style: LineStyle,
        text: &str,
        raw: bool,
    ) -> io::Result<()> {
        let end = if raw { "\r\n" } else { "\n" };
        if self.styled {
            queue!(
                out,
                SetForegroundColor(style.color()),
                Print(text),
                ResetColor,
                Print(end)
            )
        } else {
            write!(out, "{text}{end}")
        }
    }
}

fn draw_prompt(screen: &mut Screen) -> io::Result<()> {
    let Some(prompt) = &screen.prompt else {
        return screen.out.flush();
    };
    let column = PROMPT.chars().count() + prompt.cursor;
    queue!(
        screen.out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(PROMPT),
        Print(&prompt.text),
        MoveToColumn(u16::try_from(column).unwrap_or(u16::MAX))
    )?;
    screen.out.flush()
}

/// Timestamp prefix plus message.
#[must_use]
pub fn format_line(text: &str, timestamp_ms: i64) -> String {
    if timestamp_ms > 0 {
        format!("{}{text}", format_timestamp(timestamp_ms))
    } else {
        text.to_owned()
    }
}

/// `[HH:MM:SS.mmm] ` in local time, or `[Invalid-<raw>] ` when the value is
/// out of range.
#[must_use]
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(time) => format!("[{}] ", time.format("%H:%M:%S%.3f")),
        None => format!("[Invalid-{timestamp_ms}] "),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

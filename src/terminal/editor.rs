//! Single-line editor with history recall for the interactive terminal.
//!
//! Pure state machine over crossterm key events; drawing is left to the
//! [`TerminalSink`](super::TerminalSink).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::history::InputHistory;

/// Result of feeding one key to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    /// Nothing visible changed.
    Ignore,
    /// The edit line or cursor changed.
    Redraw,
    /// Enter was pressed; the line is handed to the session.
    Submit(String),
    /// Ctrl-C.
    Interrupt,
    /// Ctrl-D on an empty line.
    EndOfInput,
}

/// Edit buffer, cursor, and the history it recalls from.
#[derive(Debug, Clone)]
pub struct LineEditor {
    buffer: String,
    /// Cursor position in chars, `0..=buffer.chars().count()`.
    cursor: usize,
    history: InputHistory,
    /// Index into `history` while browsing with Up/Down.
    recall: Option<usize>,
    /// Unsubmitted text put aside when browsing started.
    draft: String,
}

impl LineEditor {
    /// Empty editor keeping up to `history_limit` submitted lines.
    #[must_use]
    pub fn new(history_limit: usize) -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            history: InputHistory::new(history_limit),
            recall: None,
            draft: String::new(),
        }
    }

    /// Current edit line.
    #[must_use]
    pub fn line(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in chars.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Lines submitted so far.
    #[must_use]
    pub fn history(&self) -> &InputHistory {
        &self.history
    }

    /// Apply one key event.
    pub fn handle_key(&mut self, key: KeyEvent) -> EditAction {
        if key.kind == KeyEventKind::Release {
            return EditAction::Ignore;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => EditAction::Interrupt,
            KeyCode::Char('d') if ctrl => {
                if self.buffer.is_empty() {
                    EditAction::EndOfInput
                } else {
                    self.delete_at_cursor()
                }
            }
            KeyCode::Char('u') if ctrl => {
                self.set_buffer(String::new());
                EditAction::Redraw
            }
            KeyCode::Char('a') if ctrl => self.move_to(0),
            KeyCode::Char('e') if ctrl => self.move_to(self.char_len()),
            KeyCode::Char(_) if ctrl => EditAction::Ignore,
            KeyCode::Char(c) => {
                let at = self.byte_index(self.cursor);
                self.buffer.insert(at, c);
                self.cursor += 1;
                EditAction::Redraw
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                if self.cursor == 0 {
                    return EditAction::Ignore;
                }
                self.cursor -= 1;
                self.delete_at_cursor()
            }
            KeyCode::Delete => self.delete_at_cursor(),
            KeyCode::Left => self.move_to(self.cursor.saturating_sub(1)),
            KeyCode::Right => self.move_to((self.cursor + 1).min(self.char_len())),
            KeyCode::Home => self.move_to(0),
            KeyCode::End => self.move_to(self.char_len()),
            KeyCode::Up => self.recall_older(),
            KeyCode::Down => self.recall_newer(),
            _ => EditAction::Ignore,
        }
    }

    fn submit(&mut self) -> EditAction {
        let line = std::mem::take(&mut self.buffer);
        self.cursor = 0;
        self.recall = None;
        self.draft.clear();
        self.history.push(&line);
        EditAction::Submit(line)
    }

    fn recall_older(&mut self) -> EditAction {
        let index = match self.recall {
            None if self.history.is_empty() => return EditAction::Ignore,
            None => {
                self.draft = self.buffer.clone();
                self.history.len() - 1
            }
            Some(0) => return EditAction::Ignore,
            Some(index) => index - 1,
        };
        self.show_entry(index)
    }

    fn recall_newer(&mut self) -> EditAction {
        match self.recall {
            None => EditAction::Ignore,
            Some(index) if index + 1 < self.history.len() => self.show_entry(index + 1),
            Some(_) => {
                self.recall = None;
                let draft = std::mem::take(&mut self.draft);
                self.set_buffer(draft);
                EditAction::Redraw
            }
        }
    }

    fn show_entry(&mut self, index: usize) -> EditAction {
        let Some(entry) = self.history.get(index).map(str::to_owned) else {
            return EditAction::Ignore;
        };
        self.recall = Some(index);
        self.set_buffer(entry);
        EditAction::Redraw
    }

    fn set_buffer(&mut self, text: String) {
        self.buffer = text;
        self.cursor = self.char_len();
    }

    fn delete_at_cursor(&mut self) -> EditAction {
        if self.cursor >= self.char_len() {
            return EditAction::Ignore;
        }
        let at = self.byte_index(self.cursor);
        self.buffer.remove(at);
        EditAction::Redraw
    }

    fn move_to(&mut self, cursor: usize) -> EditAction {
        if cursor == self.cursor {
            return EditAction::Ignore;
        }
        self.cursor = cursor;
        EditAction::Redraw
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(cursor)
            .map_or(self.buffer.len(), |(index, _)| index)
    }
}

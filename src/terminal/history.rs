//! Bounded history of submitted operator lines.

use std::collections::VecDeque;

/// Oldest-first record of submitted lines, capped at `limit` entries.
#[derive(Debug, Clone)]
pub struct InputHistory {
    limit: usize,
    lines: VecDeque<String>,
}

impl InputHistory {
    /// Empty history holding at most `limit` lines; `0` disables it.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            lines: VecDeque::new(),
        }
    }

    /// Append `line`, evicting the oldest entry when full. Empty lines and
    /// immediate repeats are not recorded.
    pub fn push(&mut self, line: &str) {
        if self.limit == 0 || line.is_empty() {
            return;
        }
        if self.lines.back().is_some_and(|last| last == line) {
            return;
        }
        if self.lines.len() == self.limit {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_owned());
    }

    /// Entry at `index`, oldest first.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Number of stored lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Copy of the stored lines, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

//! Terminal side of the relay: rendering, styling, and operator input.

pub mod editor;
pub mod history;
pub mod input;
pub mod sink;
pub mod style;

pub use editor::{EditAction, LineEditor};
pub use history::InputHistory;
pub use input::{classify_input, InputAction, LocalCommand};
pub use sink::TerminalSink;

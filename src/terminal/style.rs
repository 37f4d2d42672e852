//! Style table mapping severities to terminal colors.

use crossterm::style::Color;

use crate::protocol::LogType;

/// Visual class of a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    /// Default white text.
    Info,
    /// Yellow.
    Warning,
    /// Bright red.
    Error,
    /// Green; relay status lines.
    System,
    /// Muted red; producer exception traces.
    Exception,
}

impl LineStyle {
    /// Style for a severity. Unknown severities fall back to `Info`.
    #[must_use]
    pub fn for_log_type(log_type: LogType) -> Self {
        match log_type {
            LogType::Warning => Self::Warning,
            LogType::Error => Self::Error,
            LogType::System => Self::System,
            LogType::Exception => Self::Exception,
            LogType::Info | LogType::Other(_) => Self::Info,
        }
    }

    /// Foreground color for this style.
    #[must_use]
    pub fn color(self) -> Color {
        match self {
            Self::Info => rgb(0xff, 0xff, 0xff),
            Self::Warning => rgb(0xff, 0xff, 0x00),
            Self::Error => rgb(0xff, 0x44, 0x44),
            Self::System => rgb(0x00, 0xff, 0x00),
            Self::Exception => rgb(0xf2, 0x47, 0x47),
        }
    }
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}

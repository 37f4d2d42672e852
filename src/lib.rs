#![forbid(unsafe_code)]

//! `cli-relay`: terminal bridge for a producer process.
//!
//! A producer (typically a running game or app in development) connects over
//! TCP and streams newline-delimited JSON records: log lines, exception
//! traces, a handshake, and a final disconnect. The relay renders them for the
//! operator and forwards whatever the operator types back as `Input` records.

pub mod cli;
pub mod config;
pub mod errors;
pub mod protocol;
pub mod relay;
pub mod terminal;

pub use config::RelayConfig;
pub use errors::{AppError, Result};

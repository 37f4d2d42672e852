//! Relay configuration parsing, validation, and CLI overrides.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Default bind address; the relay is a localhost-only convenience channel.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port the producer connects to.
pub const DEFAULT_PORT: u16 = 57679;

/// Default prefix marking operator input as a local command.
pub const DEFAULT_COMMAND_PREFIX: &str = "@";

/// Bounded timeouts used during teardown and on fatal exit.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Upper bound for flushing one outbound record to the peer.
    #[serde(default = "default_drain_ms")]
    pub drain_ms: u64,
    /// Upper bound for closing the peer transport.
    #[serde(default = "default_close_ms")]
    pub close_ms: u64,
    /// Pause before exiting after a fatal error so the message stays readable.
    #[serde(default = "default_fatal_exit_delay_ms")]
    pub fatal_exit_delay_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            drain_ms: default_drain_ms(),
            close_ms: default_close_ms(),
            fatal_exit_delay_ms: default_fatal_exit_delay_ms(),
        }
    }
}

fn default_drain_ms() -> u64 {
    200
}

fn default_close_ms() -> u64 {
    200
}

fn default_fatal_exit_delay_ms() -> u64 {
    5000
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_command_prefix() -> String {
    DEFAULT_COMMAND_PREFIX.into()
}

fn default_max_line_bytes() -> usize {
    1_048_576
}

fn default_outbound_queue() -> usize {
    64
}

fn default_history_limit() -> usize {
    500
}

fn default_true() -> bool {
    true
}

/// Relay configuration parsed from an optional `relay.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RelayConfig {
    /// IP address the listener binds to.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port the listener binds to; `0` picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Prefix that marks operator input as a local command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Longest inbound line accepted before it is discarded.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// Capacity of the queue between the input loop and the connection task.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Number of operator input lines kept in history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Whether to style output when stdout is a terminal.
    #[serde(default = "default_true")]
    pub color: bool,
    /// Teardown and exit timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            command_prefix: default_command_prefix(),
            max_line_bytes: default_max_line_bytes(),
            outbound_queue: default_outbound_queue(),
            history_limit: default_history_limit(),
            color: true,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `--ip` / `--port` overrides from the command line.
    pub fn apply_overrides(&mut self, host: Option<String>, port: Option<u16>) {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
    }

    /// `host:port` string handed to the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bound on flushing a single outbound record.
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.drain_ms)
    }

    /// Bound on closing the peer transport.
    #[must_use]
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.close_ms)
    }

    /// Pause applied before a non-zero exit.
    #[must_use]
    pub fn fatal_exit_delay(&self) -> Duration {
        Duration::from_millis(self.timeouts.fatal_exit_delay_ms)
    }

    /// Validate field ranges.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(AppError::Config("host must not be empty".into()));
        }
        if self.command_prefix.trim().is_empty() {
            return Err(AppError::Config(
                "command_prefix must contain a non-whitespace character".into(),
            ));
        }
        if self.max_line_bytes == 0 {
            return Err(AppError::Config("max_line_bytes must be > 0".into()));
        }
        if self.outbound_queue == 0 {
            return Err(AppError::Config("outbound_queue must be > 0".into()));
        }
        if self.timeouts.drain_ms == 0 || self.timeouts.close_ms == 0 {
            return Err(AppError::Config(
                "timeouts.drain_ms and timeouts.close_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

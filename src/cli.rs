//! Command-line surface of the `cli-relay` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::RelayConfig;
use crate::Result;

/// Flags that consume the following argument as their value.
const VALUE_FLAGS: &[&str] = &["--ip", "--port", "--config", "--log-format"];

/// Flags that stand alone.
const SWITCHES: &[&str] = &["--no-color", "--help", "-h", "--version", "-V"];

/// Diagnostic log format.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Startup arguments.
///
/// Use [`Cli::try_parse_lenient_from`] rather than the plain clap entry points:
/// unrecognised arguments are ignored, not rejected, so launchers can pass
/// their own flags through.
#[derive(Debug, Parser)]
#[command(
    name = "cli-relay",
    about = "Terminal bridge for a producer streaming logs over TCP",
    version,
    long_about = None
)]
pub struct Cli {
    /// Bind IP address (overrides the config file).
    #[arg(long)]
    pub ip: Option<String>,

    /// Bind port (overrides the config file).
    #[arg(long)]
    pub port: Option<u16>,

    /// Optional TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Diagnostic log format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Parse `args` (program name first), dropping anything unrecognised.
    ///
    /// Returns the parsed arguments and the ignored ones.
    ///
    /// # Errors
    ///
    /// Returns the clap error for a bad value of a known flag, and for
    /// `--help` / `--version` (call [`clap::Error::exit`] to print them).
    pub fn try_parse_lenient_from<I, T>(
        args: I,
    ) -> std::result::Result<(Self, Vec<String>), clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let (known, ignored) = split_known_args(args.into_iter().map(Into::into));
        let cli = Self::try_parse_from(known)?;
        Ok((cli, ignored))
    }

    /// Build the effective configuration: file (or defaults), then CLI
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be loaded or the result
    /// fails validation.
    pub fn resolve_config(&self) -> Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::load_from_path(path)?,
            None => RelayConfig::default(),
        };
        config.apply_overrides(self.ip.clone(), self.port);
        if self.no_color {
            config.color = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn split_known_args(mut args: impl Iterator<Item = String>) -> (Vec<String>, Vec<String>) {
    let mut known = Vec::new();
    let mut ignored = Vec::new();

    if let Some(program) = args.next() {
        known.push(program);
    }
    while let Some(arg) = args.next() {
        let flag = arg.split_once('=').map_or(arg.as_str(), |(flag, _)| flag);
        if SWITCHES.contains(&arg.as_str()) {
            known.push(arg);
        } else if VALUE_FLAGS.contains(&arg.as_str()) {
            known.push(arg);
            if let Some(value) = args.next() {
                known.push(value);
            }
        } else if VALUE_FLAGS.contains(&flag) {
            known.push(arg);
        } else {
            ignored.push(arg);
        }
    }
    (known, ignored)
}

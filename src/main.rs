#![forbid(unsafe_code)]

//! Entry point of the `cli-relay` terminal bridge.
//!
//! Parses startup arguments, binds the listener, and runs the session on a
//! single-threaded runtime. Fatal errors are printed to stderr and the process
//! pauses before exiting non-zero so a headless window stays readable.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use cli_relay::cli::{Cli, LogFormat};
use cli_relay::config::RelayConfig;
use cli_relay::relay::Session;
use cli_relay::terminal::input::{spawn_interactive_reader, spawn_stdin_reader};
use cli_relay::terminal::TerminalSink;
use cli_relay::{AppError, Result};
use crossterm::tty::IsTty;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    let (args, ignored) = match Cli::try_parse_lenient_from(std::env::args()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    };
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("{err}");
    }
    if !ignored.is_empty() {
        debug!(?ignored, "ignoring unrecognised arguments");
    }

    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(err) => return fatal(&err, RelayConfig::default().fatal_exit_delay()),
    };
    let exit_delay = config.fatal_exit_delay();

    println!("Starting relay on {}...", config.bind_address());

    let outcome = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Io(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(config)));

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fatal(&err, exit_delay),
    }
}

async fn run(config: RelayConfig) -> Result<()> {
    let sink = Arc::new(TerminalSink::stdout(config.color));
    let input_capacity = config.outbound_queue;
    let history_limit = config.history_limit;
    let session = Session::bind(config, Arc::clone(&sink)).await?;

    let stop = session.stop_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received");
                stop.trigger();
            }
            Err(err) => error!(%err, "ctrl-c handler failed"),
        }
    });

    if std::io::stdin().is_tty() && std::io::stdout().is_tty() {
        let (input, _raw_mode) = spawn_interactive_reader(sink, history_limit, input_capacity)?;
        session.run(input).await;
    } else {
        let input = spawn_stdin_reader(input_capacity)?;
        session.run(input).await;
    }
    Ok(())
}

fn fatal(err: &AppError, delay: Duration) -> ExitCode {
    error!(%err, "fatal error");
    eprintln!("Fatal Error: {err}");
    std::thread::sleep(delay);
    ExitCode::FAILURE
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}

//! Session controller: the top-level state machine.
//!
//! ```text
//! Starting ──run──▶ Running ──(interrupt | end of input | peer gone)──▶ Stopping ──▶ Stopped
//! ```
//!
//! [`Session::bind`] is the only fatal step. Once running, the accept loop
//! (a spawned task) and the operator input loop (the calling task) run
//! concurrently on the same runtime. Whichever side ends first fires the
//! shared [`StopHandle`]; shutdown then says goodbye to the peer, stops the
//! listener, and awaits the network task before returning.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::guard::{Admission, ConnectionGuard};
use super::peer::serve_peer;
use super::{RelayContext, StopHandle};
use crate::config::RelayConfig;
use crate::protocol::Record;
use crate::terminal::{classify_input, InputAction, LocalCommand, TerminalSink};
use crate::{AppError, Result};

/// Reason sent to the producer when the relay closes the connection.
pub const DISCONNECT_REASON: &str = "CLI closed";

/// Top-level lifecycle of one relay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Listener bound, loops not started yet.
    Starting,
    /// Accept loop and input loop active.
    Running,
    /// Shutdown in progress.
    Stopping,
    /// Everything torn down.
    Stopped,
}

/// A bound relay session.
pub struct Session {
    ctx: Arc<RelayContext>,
    listener: TcpListener,
    local_addr: SocketAddr,
    state: watch::Sender<SessionState>,
}

impl Session {
    /// Validate `config` and bind the listener.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an invalid configuration and
    /// `AppError::Bind` when the address is in use or cannot be bound; the
    /// session never reaches `Running` in either case.
    pub async fn bind(config: RelayConfig, sink: Arc<TerminalSink>) -> Result<Self> {
        config.validate()?;
        let address = config.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|err| {
            AppError::Bind(format!(
                "Port '{}' is occupied or cannot be bound: {err}",
                config.port
            ))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| AppError::Bind(format!("cannot read bound address: {err}")))?;
        info!(%local_addr, "listener bound");

        let (state, _) = watch::channel(SessionState::Starting);
        let guard = Arc::new(ConnectionGuard::new(config.outbound_queue));
        Ok(Self {
            ctx: Arc::new(RelayContext {
                config,
                guard,
                sink,
                stop: StopHandle::default(),
            }),
            listener,
            local_addr,
            state,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Observe lifecycle transitions.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Trigger used by the interrupt handler to stop the session.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.ctx.stop.clone()
    }

    /// The connection guard, for observing the peer state.
    #[must_use]
    pub fn guard(&self) -> Arc<ConnectionGuard> {
        Arc::clone(&self.ctx.guard)
    }

    /// Run until a stop trigger fires, then shut down.
    ///
    /// `input` carries operator lines; its closing is the end-of-input
    /// condition. Failures after startup are rendered on the terminal, not
    /// returned.
    pub async fn run(self, input: mpsc::Receiver<String>) {
        let Self {
            ctx,
            listener,
            local_addr,
            state,
        } = self;

        state.send_replace(SessionState::Running);
        ctx.sink.system(&format!("Serving on '{local_addr}'"));

        let network_cancel = CancellationToken::new();
        let network = tokio::spawn(
            accept_loop(listener, Arc::clone(&ctx), network_cancel.clone())
                .instrument(info_span!("accept_loop", %local_addr)),
        );

        input_loop(&ctx, input).await;
        shutdown(&ctx, &state, &network_cancel, network).await;
    }
}

/// Accept peers until cancelled, admitting one at a time.
async fn accept_loop(listener: TcpListener, ctx: Arc<RelayContext>, cancel: CancellationToken) {
    let mut peers = JoinSet::new();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("accept loop: cancellation received, stopping");
                break;
            }
            Some(joined) = peers.join_next(), if !peers.is_empty() => {
                if let Err(err) = joined {
                    warn!(%err, "peer task failed");
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => match ctx.guard.admit(addr).await {
                    Admission::Accepted(link) => {
                        ctx.sink.system(&format!("Connected by '{addr}'"));
                        peers.spawn(
                            serve_peer(stream, addr, link, Arc::clone(&ctx), cancel.clone())
                                .instrument(info_span!("peer", %addr)),
                        );
                    }
                    Admission::Rejected => {
                        ctx.sink.warning(&format!("Rejecting new connection from {addr}"));
                        reject(stream, &ctx).await;
                    }
                },
                Err(err) => warn!(%err, "accept failed"),
            },
        }
    }

    drop(listener);
    info!("listener closed");
    while let Some(joined) = peers.join_next().await {
        if let Err(err) = joined {
            warn!(%err, "peer task failed during shutdown");
        }
    }
}

async fn reject(mut stream: TcpStream, ctx: &RelayContext) {
    if timeout(ctx.config.close_timeout(), stream.shutdown())
        .await
        .is_err()
    {
        debug!("rejected transport close timed out");
    }
}

/// Read operator lines until end of input or a stop trigger.
async fn input_loop(ctx: &RelayContext, mut input: mpsc::Receiver<String>) {
    loop {
        tokio::select! {
            biased;

            () = ctx.stop.triggered() => {
                debug!("input loop: stop triggered");
                break;
            }
            line = input.recv() => match line {
                Some(line) => handle_input(ctx, &line).await,
                None => {
                    debug!("input loop: end of input");
                    break;
                }
            },
        }
    }
    ctx.stop.trigger();
}

/// Apply one operator line: local command, forward, or drop.
async fn handle_input(ctx: &RelayContext, line: &str) {
    match classify_input(line, &ctx.config.command_prefix) {
        InputAction::Skip => {}
        InputAction::Command(LocalCommand::Clear) => ctx.sink.clear(),
        InputAction::Command(LocalCommand::Unknown(command)) => {
            ctx.sink.system(&format!("Unknown command: '{command}'"));
        }
        InputAction::Forward(text) => match ctx.guard.peer().await {
            Some(peer) => {
                if let Err(err) = peer.enqueue(Record::input(text)) {
                    ctx.sink.error(&format!("Failed to send packet: {err}"));
                }
            }
            None => ctx.sink.error("No connection to producer."),
        },
    }
}

/// Tear everything down exactly once.
async fn shutdown(
    ctx: &RelayContext,
    state: &watch::Sender<SessionState>,
    network_cancel: &CancellationToken,
    network: JoinHandle<()>,
) {
    let entered = state.send_if_modified(|current| match current {
        SessionState::Stopping | SessionState::Stopped => false,
        _ => {
            *current = SessionState::Stopping;
            true
        }
    });
    if !entered {
        return;
    }
    let span = info_span!("shutdown");
    async {
        ctx.stop.trigger();

        if let Some(peer) = ctx.guard.begin_close().await {
            let closed = peer
                .farewell(
                    Record::disconnect(DISCONNECT_REASON),
                    ctx.config.drain_timeout(),
                    ctx.config.close_timeout(),
                )
                .await;
            debug!(peer = %peer.addr, closed, "farewell finished");
        }

        network_cancel.cancel();
        if let Err(err) = network.await {
            warn!(%err, "network task ended abnormally");
        }

        state.send_replace(SessionState::Stopped);
        info!("session stopped");
    }
    .instrument(span)
    .await;
}

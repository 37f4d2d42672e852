//! Connection task for the attached peer.
//!
//! Drives one [`Framed`] TCP stream: inbound lines are dispatched in arrival
//! order, outbound records queued through the [`ConnectionGuard`] are written
//! with a bounded drain timeout. Whatever ends the loop (EOF, a `Disconnect`
//! record, an I/O error, a farewell from shutdown, or cancellation), the guard
//! returns to `Idle`, the transport is closed within the close timeout, and
//! the session is asked to stop.
//!
//! [`ConnectionGuard`]: super::guard::ConnectionGuard

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::{dispatch_frame, DispatchOutcome};
use super::guard::{Outbound, PeerLink};
use super::RelayContext;
use crate::protocol::codec::RecordCodec;
use crate::protocol::Record;

/// Why the read loop ended.
#[derive(Debug)]
enum Exit {
    /// Peer closed the stream.
    Eof,
    /// Peer sent `Disconnect`.
    PeerDisconnect,
    /// Read failed.
    Failed,
    /// Shutdown asked us to say goodbye and close.
    Farewell(oneshot::Sender<()>),
    /// The network task was cancelled.
    Cancelled,
}

/// Serve `stream` until it ends, then tear the connection down.
pub(crate) async fn serve_peer(
    stream: TcpStream,
    addr: SocketAddr,
    link: PeerLink,
    ctx: Arc<RelayContext>,
    cancel: CancellationToken,
) {
    let PeerLink { id, mut outbound } = link;
    let mut framed = Framed::new(stream, RecordCodec::new(ctx.config.max_line_bytes));

    let exit = loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break Exit::Cancelled,

            queued = outbound.recv() => match queued {
                Some(Outbound::Record(record)) => send_record(&mut framed, record, &ctx).await,
                Some(Outbound::Farewell { record, done }) => {
                    if let Err(reason) = write_with_deadline(&mut framed, record, &ctx).await {
                        debug!(peer = %addr, %reason, "farewell record not delivered");
                    }
                    break Exit::Farewell(done);
                }
                // The guard dropped our handle; nothing can be sent any more.
                None => break Exit::Cancelled,
            },

            inbound = framed.next() => match inbound {
                None => break Exit::Eof,
                Some(Err(err)) => {
                    ctx.sink.error(&format!("Connection error: {err}"));
                    break Exit::Failed;
                }
                Some(Ok(frame)) => {
                    if dispatch_frame(&frame, &ctx.sink) == DispatchOutcome::Disconnect {
                        break Exit::PeerDisconnect;
                    }
                }
            },
        }
    };

    info!(peer = %addr, ?exit, "peer connection ending");
    ctx.guard.release(id).await;

    if timeout(ctx.config.close_timeout(), framed.get_mut().shutdown())
        .await
        .is_err()
    {
        debug!(peer = %addr, "transport close timed out");
    }
    drop(framed);

    // A peer-sent Disconnect has already been announced by the dispatcher.
    if !matches!(exit, Exit::PeerDisconnect) {
        ctx.sink.system(&format!("Disconnected {addr}"));
    }
    if let Exit::Farewell(done) = exit {
        let _ = done.send(());
    }

    ctx.stop.trigger();
}

/// Write one operator record; failures are reported locally, never returned.
async fn send_record(
    framed: &mut Framed<TcpStream, RecordCodec>,
    record: Record,
    ctx: &RelayContext,
) {
    if let Err(reason) = write_with_deadline(framed, record, ctx).await {
        warn!(%reason, "outbound record not delivered");
        ctx.sink.error(&format!("Failed to send packet: {reason}"));
    }
}

async fn write_with_deadline(
    framed: &mut Framed<TcpStream, RecordCodec>,
    record: Record,
    ctx: &RelayContext,
) -> std::result::Result<(), String> {
    match timeout(ctx.config.drain_timeout(), framed.send(record)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err("timed out".to_owned()),
    }
}

//! Single-peer connection guard.
//!
//! The relay serves exactly one producer at a time. The guard is the only
//! place that knows which peer is attached; the send path and the teardown
//! path both go through it, so the writer handle has a single auditable
//! owner.
//!
//! ```text
//! Idle ──admit──▶ Connected(peer) ──begin_close──▶ Closing
//!  ▲                   │                             │
//!  └──────release──────┴─────────────release─────────┘
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::timeout;
use tracing::debug;

use crate::protocol::Record;
use crate::{AppError, Result};

/// Work queued for the connection task.
#[derive(Debug)]
pub enum Outbound {
    /// Write one record to the peer.
    Record(Record),
    /// Write `record`, close the transport, then acknowledge on `done`.
    Farewell {
        /// Final record, normally a `Disconnect`.
        record: Record,
        /// Signalled once the transport has been closed.
        done: oneshot::Sender<()>,
    },
}

/// Handle to the attached peer's outbound queue.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    /// Guard-assigned connection identifier.
    pub id: u64,
    /// Remote address of the peer.
    pub addr: SocketAddr,
    outbound: mpsc::Sender<Outbound>,
}

impl PeerHandle {
    /// Queue a record without waiting.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` when the queue is full or the connection
    /// task has already gone away.
    pub fn enqueue(&self, record: Record) -> Result<()> {
        self.outbound
            .try_send(Outbound::Record(record))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    AppError::Transport("outbound queue full".into())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    AppError::Transport("connection closed".into())
                }
            })
    }

    /// Ask the connection task to send `record` and close the transport.
    ///
    /// Waits at most `drain` to hand the request over and `drain + close` for
    /// the acknowledgement. Returns whether the peer was closed in time.
    pub async fn farewell(&self, record: Record, drain: Duration, close: Duration) -> bool {
        let (done, acked) = oneshot::channel();
        let request = Outbound::Farewell { record, done };
        match timeout(drain, self.outbound.send(request)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                debug!(peer = %self.addr, "farewell: connection task already gone");
                return false;
            }
            Err(_) => {
                debug!(peer = %self.addr, "farewell: outbound queue stalled");
                return false;
            }
        }
        matches!(timeout(drain + close, acked).await, Ok(Ok(())))
    }
}

/// Lifecycle of the single allowed peer connection.
#[derive(Debug, Clone)]
pub enum ConnectionState {
    /// No peer attached.
    Idle,
    /// One peer attached; its handle is owned here.
    Connected(PeerHandle),
    /// Teardown of peer `id` in progress.
    Closing {
        /// Identifier of the peer being closed.
        id: u64,
    },
}

impl ConnectionState {
    /// Whether no peer is attached.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    fn id(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Connected(peer) => Some(peer.id),
            Self::Closing { id } => Some(*id),
        }
    }
}

/// Connection-task side of an accepted peer.
#[derive(Debug)]
pub struct PeerLink {
    /// Identifier to pass back to [`ConnectionGuard::release`].
    pub id: u64,
    /// Queue drained by the connection task.
    pub outbound: mpsc::Receiver<Outbound>,
}

/// Result of [`ConnectionGuard::admit`].
#[derive(Debug)]
pub enum Admission {
    /// The guard was idle; the caller now serves this peer.
    Accepted(PeerLink),
    /// Another peer is attached; the caller must close the new transport.
    Rejected,
}

/// Owner of the [`ConnectionState`].
#[derive(Debug)]
pub struct ConnectionGuard {
    state: Mutex<ConnectionState>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl ConnectionGuard {
    /// Create an idle guard whose outbound queues hold `queue_capacity`
    /// records.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            state: Mutex::new(ConnectionState::Idle),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Attach `addr` if no peer is attached, otherwise reject it without
    /// touching the current state.
    pub async fn admit(&self, addr: SocketAddr) -> Admission {
        let mut state = self.state.lock().await;
        if !state.is_idle() {
            return Admission::Rejected;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        *state = ConnectionState::Connected(PeerHandle {
            id,
            addr,
            outbound: tx,
        });
        Admission::Accepted(PeerLink { id, outbound: rx })
    }

    /// Handle of the attached peer, if one is `Connected`.
    pub async fn peer(&self) -> Option<PeerHandle> {
        match &*self.state.lock().await {
            ConnectionState::Connected(peer) => Some(peer.clone()),
            _ => None,
        }
    }

    /// Move the attached peer to `Closing` and hand its handle to the caller.
    pub async fn begin_close(&self) -> Option<PeerHandle> {
        let mut state = self.state.lock().await;
        let ConnectionState::Connected(peer) = &*state else {
            return None;
        };
        let peer = peer.clone();
        *state = ConnectionState::Closing { id: peer.id };
        Some(peer)
    }

    /// Return to `Idle` if peer `id` is still the one attached.
    pub async fn release(&self, id: u64) {
        let mut state = self.state.lock().await;
        if state.id() == Some(id) {
            *state = ConnectionState::Idle;
        }
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> ConnectionState {
        self.state.lock().await.clone()
    }
}

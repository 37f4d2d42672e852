//! Network side of the relay: connection guard, dispatcher, peer task, and
//! the session controller that ties them to the operator input loop.

pub mod dispatcher;
pub mod guard;
pub mod peer;
pub mod session;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::terminal::TerminalSink;

pub use guard::{Admission, ConnectionGuard, ConnectionState, PeerHandle};
pub use session::{Session, SessionState};

/// Cloneable trigger that moves the session to `Stopping`.
///
/// Fired by the operator interrupt handler, by the peer task when the peer
/// goes away, and by the input loop on end of input. Firing more than once
/// is harmless.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    /// Request shutdown.
    pub fn trigger(&self) {
        self.0.cancel();
    }

    /// Whether shutdown was requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolve once shutdown is requested.
    pub async fn triggered(&self) {
        self.0.cancelled().await;
    }
}

/// State shared by the accept loop, peer tasks, and the input loop.
pub(crate) struct RelayContext {
    pub(crate) config: RelayConfig,
    pub(crate) guard: Arc<ConnectionGuard>,
    pub(crate) sink: Arc<TerminalSink>,
    pub(crate) stop: StopHandle,
}

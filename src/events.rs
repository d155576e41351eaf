//! Server lifecycle event delivery.
//!
//! The listener and sessions report lifecycle transitions through a closed
//! set of [`ServerEvent`] variants delivered over a bounded
//! `tokio::sync::mpsc` channel. Delivery is non-blocking: a slow or absent
//! consumer (the UI shell rendering a log) never stalls an accept loop or a
//! session read loop. Events that cannot be queued are dropped with a
//! warning.

use tokio::sync::mpsc;
use tracing::warn;

/// Number of events buffered before the sink starts dropping.
pub const EVENT_BUFFER: usize = 256;

/// Lifecycle notifications emitted by the server and its sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The listening socket is bound and the accept loop is running.
    Started {
        /// Actual bound port (resolved when the configured port was 0).
        port: u16,
    },
    /// The accept loop has exited. Emitted exactly once per run.
    Stopped,
    /// A client connection was accepted.
    ClientConnected {
        /// Remote peer address.
        addr: String,
    },
    /// A client connection was torn down.
    ClientDisconnected {
        /// Remote peer address.
        addr: String,
    },
    /// A transport-level failure that did not stop the server.
    Error {
        /// Human-readable failure description.
        message: String,
    },
    /// An inbound line was read and parsed on a connection.
    MessageReceived {
        /// The raw line as received, without the newline.
        message: String,
        /// Remote peer address.
        addr: String,
    },
}

/// Cloneable non-blocking sender side of the event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<ServerEvent>,
}

impl EventSink {
    /// Create a sink/receiver pair with the default buffer size.
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (Self { tx }, rx)
    }

    /// Queue an event without blocking.
    ///
    /// Drops the event (with a warning) when the buffer is full or the
    /// receiver is gone; lifecycle reporting is fire-and-forget.
    pub fn emit(&self, event: ServerEvent) {
        if let Err(err) = self.tx.try_send(event) {
            warn!(%err, "lifecycle event dropped");
        }
    }
}

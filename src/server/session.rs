//! Per-connection session: read, dispatch, reply, teardown.
//!
//! Each accepted connection gets one session running on its own task. The
//! read loop is the single writer to the connection: job completions are
//! never pushed through a session, they are observed by polling, so no write
//! lock is needed. Requests on one connection are processed and replied to
//! in the order received.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::commands::Dispatcher;
use crate::events::{EventSink, ServerEvent};
use crate::protocol::LineCodec;

/// Server-side handler for one client connection's lifetime.
#[derive(Debug)]
pub struct Session {
    addr: String,
    dispatcher: Arc<Dispatcher>,
    events: EventSink,
    cancel: CancellationToken,
    max_line_bytes: usize,
}

impl Session {
    /// Construct a session for an accepted connection.
    #[must_use]
    pub fn new(
        addr: String,
        dispatcher: Arc<Dispatcher>,
        events: EventSink,
        cancel: CancellationToken,
        max_line_bytes: usize,
    ) -> Self {
        Self {
            addr,
            dispatcher,
            events,
            cancel,
            max_line_bytes,
        }
    }

    /// Run the read/dispatch/write loop until the peer closes, an I/O error
    /// occurs, or stop is requested; then tear down exactly once.
    pub async fn run(self, stream: TcpStream) {
        let span = info_span!("session", addr = %self.addr);
        async move {
            let (read_half, write_half) = stream.into_split();
            let mut reader =
                FramedRead::new(read_half, LineCodec::with_max_length(self.max_line_bytes));
            let mut writer =
                FramedWrite::new(write_half, LineCodec::with_max_length(self.max_line_bytes));

            loop {
                let line = tokio::select! {
                    () = self.cancel.cancelled() => {
                        debug!("session cancelled by server stop");
                        break;
                    }
                    next = reader.next() => match next {
                        None => break, // peer closed
                        Some(Ok(line)) => line,
                        Some(Err(err)) => {
                            warn!(%err, "failed to read message");
                            self.events.emit(ServerEvent::Error {
                                message: format!("read failed: {err}"),
                            });
                            break;
                        }
                    },
                };

                debug!(%line, "message received");

                if let Some(reply) = self.dispatcher.handle_line(&line).await {
                    // FramedWrite::send flushes, so the peer sees one reply
                    // per request with no buffering delay.
                    if let Err(err) = writer.send(reply).await {
                        warn!(%err, "failed to write response");
                        self.events.emit(ServerEvent::Error {
                            message: format!("write failed: {err}"),
                        });
                        break;
                    }
                }

                self.events.emit(ServerEvent::MessageReceived {
                    message: line,
                    addr: self.addr.clone(),
                });
            }

            // Dropping the framed halves closes the socket. Runs once.
            info!("connection closed");
            self.events.emit(ServerEvent::ClientDisconnected {
                addr: self.addr.clone(),
            });
        }
        .instrument(span)
        .await;
    }
}

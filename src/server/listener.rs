//! Listening socket ownership and the accept loop.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::commands::Dispatcher;
use crate::events::{EventSink, ServerEvent};
use crate::server::session::Session;
use crate::{AppError, Result};

/// TCP bridge server: binds the listening socket, accepts connections, and
/// spawns one [`Session`] task per connection with no admission control.
///
/// At most one accept loop is active per server. `stop` is idempotent and
/// reports `Stopped` exactly once per run, after the accept loop exits —
/// including the run where the bind never succeeded.
#[derive(Debug)]
pub struct BridgeServer {
    port: AtomicU16,
    max_line_bytes: usize,
    running: Arc<AtomicBool>,
    /// Incremented per `start`; an exiting accept loop may only touch shared
    /// state while its run is still the current one.
    generation: Arc<AtomicU64>,
    cancel: Mutex<CancellationToken>,
    events: EventSink,
    dispatcher: Arc<Dispatcher>,
}

impl BridgeServer {
    /// Construct a server; `start` must be called to bind and listen.
    ///
    /// Port 0 is accepted here (the OS assigns a port, reported through the
    /// `Started` event); configuration-level validation restricts operator
    /// input to 1–65535.
    #[must_use]
    pub fn new(
        port: u16,
        max_line_bytes: usize,
        dispatcher: Arc<Dispatcher>,
        events: EventSink,
    ) -> Self {
        Self {
            port: AtomicU16::new(port),
            max_line_bytes,
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            cancel: Mutex::new(CancellationToken::new()),
            events,
            dispatcher,
        }
    }

    /// Bind the listening socket and start the accept loop.
    ///
    /// Returns the actual bound port. The accept loop runs on its own task,
    /// so the caller is not blocked; `Started` is reported before the first
    /// accept.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` when the server is already running,
    /// or `AppError::Bind` when the socket cannot be bound (port in use,
    /// permission denied). A bind failure also reports `Error` and `Stopped`
    /// through the event sink.
    pub async fn start(&self) -> Result<u16> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("start requested while server is already running");
            return Err(AppError::InvalidState("server is already running".into()));
        }

        // Invalidate any still-exiting previous run, then re-assert the flag
        // in case its epilogue cleared it before the bump landed.
        let run = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.running.store(true, Ordering::SeqCst);

        let port = self.port.load(Ordering::SeqCst);
        let listener = match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => listener,
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                warn!(port, %err, "failed to bind listening socket");
                self.events.emit(ServerEvent::Error {
                    message: format!("failed to start server: {err}"),
                });
                self.events.emit(ServerEvent::Stopped);
                return Err(AppError::Bind(format!("port {port}: {err}")));
            }
        };

        let bound_port = listener.local_addr().map_or(port, |addr| addr.port());

        let cancel = CancellationToken::new();
        *self.cancel.lock().await = cancel.clone();

        info!(port = bound_port, "server started");
        self.events.emit(ServerEvent::Started { port: bound_port });

        let running = Arc::clone(&self.running);
        let generation = Arc::clone(&self.generation);
        let events = self.events.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        let max_line_bytes = self.max_line_bytes;
        tokio::spawn(
            accept_loop(AcceptLoop {
                listener,
                cancel,
                run,
                generation,
                running,
                events,
                dispatcher,
                max_line_bytes,
            })
            .instrument(info_span!("accept_loop", port = bound_port)),
        );

        Ok(bound_port)
    }

    /// Request a stop: flip the running flag and unblock the accept loop.
    ///
    /// Idempotent; calling it on a stopped server is a no-op. In-flight
    /// sessions finish their current read/dispatch before tearing down; the
    /// `Stopped` event is reported by the accept loop as it exits.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("server stopping");
        self.cancel.lock().await.cancel();
    }

    /// Non-blocking snapshot of the running flag.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The configured listening port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::SeqCst)
    }

    /// Change the listening port for the next start.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` while the server is running.
    pub fn set_port(&self, port: u16) -> Result<()> {
        if self.is_running() {
            return Err(AppError::InvalidState(
                "cannot change port while server is running".into(),
            ));
        }
        self.port.store(port, Ordering::SeqCst);
        Ok(())
    }
}

/// Everything one run of the accept loop owns.
struct AcceptLoop {
    listener: TcpListener,
    cancel: CancellationToken,
    /// This run's generation number.
    run: u64,
    generation: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    events: EventSink,
    dispatcher: Arc<Dispatcher>,
    max_line_bytes: usize,
}

impl AcceptLoop {
    fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.run
    }
}

/// Accept connections until cancelled, then report `Stopped` exactly once.
async fn accept_loop(task: AcceptLoop) {
    loop {
        tokio::select! {
            () = task.cancel.cancelled() => {
                debug!("accept loop cancelled");
                break;
            }
            accepted = task.listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let addr = addr.to_string();
                    info!(%addr, "client connected");

                    let session = Session::new(
                        addr.clone(),
                        Arc::clone(&task.dispatcher),
                        task.events.clone(),
                        task.cancel.child_token(),
                        task.max_line_bytes,
                    );

                    // Connected is reported before the session starts reading.
                    task.events.emit(ServerEvent::ClientConnected { addr });
                    tokio::spawn(session.run(stream));
                }
                Err(err) => {
                    // Accept errors after stop are expected from the socket
                    // close and are swallowed.
                    if task.is_current() && task.running.load(Ordering::SeqCst) {
                        let err = AppError::Accept(err.to_string());
                        warn!(%err, "failed to accept connection");
                        task.events.emit(ServerEvent::Error {
                            message: err.to_string(),
                        });
                    }
                }
            }
        }
    }

    // A restart may already own the running flag; only the current run's
    // epilogue is allowed to clear it.
    if task.is_current() {
        task.running.store(false, Ordering::SeqCst);
    }
    info!("server stopped");
    task.events.emit(ServerEvent::Stopped);
}

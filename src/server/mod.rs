//! TCP server: the listener/accept loop and per-connection sessions.

pub mod listener;
pub mod session;

pub use listener::BridgeServer;
pub use session::Session;

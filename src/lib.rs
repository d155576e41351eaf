#![forbid(unsafe_code)]

//! Local TCP command/response bridge for device automation.
//!
//! Accepts concurrent connections, reads newline-delimited messages (JSON
//! envelope with plain-text fallback), dispatches them to a command table,
//! and backs the `voice_*` command family with a single-slot asynchronous
//! job engine that callers poll for completion.

pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod protocol;
pub mod server;
pub mod voice;

pub use config::BridgeConfig;
pub use errors::{AppError, Result};

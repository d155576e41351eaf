#![forbid(unsafe_code)]

//! `adb-bridge` — local TCP command/response bridge binary.
//!
//! Bootstraps configuration, starts the TCP listener, initializes the voice
//! test engine, and renders lifecycle events as log lines until a shutdown
//! signal arrives.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use adb_bridge::commands::Dispatcher;
use adb_bridge::config::BridgeConfig;
use adb_bridge::events::{EventSink, ServerEvent};
use adb_bridge::server::BridgeServer;
use adb_bridge::voice::VoiceTestEngine;
use adb_bridge::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "adb-bridge", about = "Local TCP command/response bridge", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listening port.
    #[arg(long)]
    port: Option<u16>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("adb-bridge server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match args.config {
        Some(path) => BridgeConfig::load_from_path(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(port) = args.port {
        if port == 0 {
            return Err(AppError::Config("port must be in range 1-65535".into()));
        }
        config.port = port;
    }
    info!(port = config.port, "configuration loaded");

    // ── Lifecycle event consumer (log-rendering shell) ──
    let (events, rx) = EventSink::channel();
    let event_handle = tokio::spawn(render_events(rx));

    // ── Voice test engine ───────────────────────────────
    let engine = Arc::new(VoiceTestEngine::new(Duration::from_millis(
        config.voice.init_delay_ms,
    )));
    if config.voice.auto_init {
        engine.init().await;
    } else {
        info!("voice engine auto-init disabled; voice commands gated until init");
    }

    // ── Start the server ────────────────────────────────
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&engine), config.device.clone()));
    let server = BridgeServer::new(config.port, config.max_line_bytes, dispatcher, events);
    let bound_port = server.start().await?;
    info!(port = bound_port, "bridge ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");

    server.stop().await;
    engine.release().await;

    // Give the accept loop a moment to exit and its Stopped event to drain.
    tokio::time::sleep(Duration::from_millis(200)).await;
    drop(server);
    let _ = event_handle.await;

    info!("adb-bridge shut down");
    Ok(())
}

/// Render lifecycle events as log lines.
///
/// Stands in for the graphical shell at its listener boundary: consumes the
/// event channel without ever blocking the producers.
async fn render_events(mut rx: mpsc::Receiver<ServerEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            ServerEvent::Started { port } => info!(port, "event: server started"),
            ServerEvent::Stopped => info!("event: server stopped"),
            ServerEvent::ClientConnected { addr } => info!(%addr, "event: client connected"),
            ServerEvent::ClientDisconnected { addr } => {
                info!(%addr, "event: client disconnected");
            }
            ServerEvent::Error { message } => warn!(%message, "event: server error"),
            ServerEvent::MessageReceived { message, addr } => {
                debug!(%addr, %message, "event: message received");
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

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

//! Touchlink agent entry point.
//!
//! Loads the configuration, wires the host adapters into the command router,
//! and serves the WebSocket command channel until Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! touchlink-agent [OPTIONS]
//!
//! Options:
//!   --config    <PATH>   Configuration file [default: touchlink.toml]
//!   --bind      <IP>     Override server.bind_address
//!   --port      <PORT>   Override server.port
//!   --log-level <LEVEL>  Override logging.level
//! ```
//!
//! Every option can also be set through an environment variable
//! (`TOUCHLINK_CONFIG`, `TOUCHLINK_BIND`, `TOUCHLINK_PORT`,
//! `TOUCHLINK_LOG_LEVEL`).  `RUST_LOG`, when set, wins over the configured
//! log level.
//!
//! # Host adapters
//!
//! The in-memory adapters from `infrastructure::host::mock` stand in for the
//! device's input-injection, text-field and clipboard services.  They record
//! everything they receive, which makes the agent usable for protocol testing
//! on any machine.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use touchlink_agent::application::route_command::CommandRouter;
use touchlink_agent::application::text_sync::TextReconciler;
use touchlink_agent::infrastructure::host::mock::{
    MockClipboard, MockStrokeExecutor, MockTextField,
};
use touchlink_agent::infrastructure::network::ws_server::run_server;
use touchlink_agent::infrastructure::storage::config::{
    load_config, AgentConfig, DEFAULT_CONFIG_FILE,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Touchlink remote input agent.
#[derive(Debug, Parser)]
#[command(
    name = "touchlink-agent",
    about = "Replays remote touch gestures and text edits on this device",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.  A missing file means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, env = "TOUCHLINK_CONFIG")]
    config: PathBuf,

    /// IP address to bind the command channel to.
    #[arg(long, env = "TOUCHLINK_BIND")]
    bind: Option<String>,

    /// Port for the command channel.
    #[arg(long, env = "TOUCHLINK_PORT")]
    port: Option<u16>,

    /// Log level when `RUST_LOG` is not set.
    #[arg(long, env = "TOUCHLINK_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    fn into_agent_config(self) -> anyhow::Result<AgentConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(self, config: &mut AgentConfig) {
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_agent_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let addr = config.server.socket_addr()?;
    info!("Touchlink agent starting on {addr}");

    // ── Host adapters ─────────────────────────────────────────────────────────
    let executor = Arc::new(MockStrokeExecutor::new());
    let field = Arc::new(MockTextField::new());
    let clipboard = Arc::new(MockClipboard::new());

    let text = TextReconciler::new(field, clipboard, config.text.to_sync_config());
    let router = Arc::new(CommandRouter::new(
        executor,
        text,
        config.gesture.to_gesture_config(),
    ));

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    run_server(addr, Arc::clone(&router), running).await?;

    router.shutdown().await?;
    info!("Touchlink agent stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

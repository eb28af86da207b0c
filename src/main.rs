//! Form submission guard.
//!
//! # Architecture Overview
//!
//! ```text
//!   Browser form / dashboard
//!        │
//!        ▼
//!   http (axum router, middleware)
//!        │
//!        ├─▶ pipeline::contact   sanitize → validate → CSRF → rate limit → relay
//!        ├─▶ pipeline::login     validate → lockout → identity → session
//!        └─▶ dashboard           documents behind a session
//!
//!   Cross-cutting: config (reload), observability, lifecycle (maintenance,
//!   shutdown)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use form_guard::config::watcher::ConfigWatcher;
use form_guard::config::{load_config, GuardConfig};
use form_guard::lifecycle::{self, Shutdown};
use form_guard::net::load_tls_config;
use form_guard::GuardServer;

#[derive(Parser)]
#[command(name = "form-guard", about = "Form submission guard", version)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "FORM_GUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address override.
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.listener.bind_address = listen;
    }

    lifecycle::start_observability(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "form-guard starting");

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let state = lifecycle::build_state(config)?;

    let shutdown = Shutdown::new();
    lifecycle::spawn_signal_listener(shutdown.clone());

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let maintenance = tokio::spawn(lifecycle::run_maintenance(
        state.clone(),
        shutdown.subscribe(),
    ));

    let server = GuardServer::new(state);
    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            let rustls = load_tls_config(&tls).await?;
            server
                .run_tls(addr, rustls, config_updates, shutdown.subscribe())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            server
                .run(listener, config_updates, shutdown.subscribe())
                .await?;
        }
    }

    if let Err(e) = maintenance.await {
        tracing::error!(error = %e, "Maintenance task failed");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

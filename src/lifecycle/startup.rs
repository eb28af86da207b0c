//! Startup orchestration.
//!
//! Logging comes up first so every later step is visible. The state is
//! built last because it loads persisted lockout and document files.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::GuardConfig;
use crate::observability::{logging, metrics};
use crate::state::{GuardState, StateError};

/// Initialise logging and, when enabled, the metrics exporter.
pub fn start_observability(config: &GuardConfig) {
    logging::init_logging(&config.observability);

    if !config.observability.metrics_enabled {
        return;
    }
    match config.observability.metrics_address.parse::<SocketAddr>() {
        Ok(addr) => metrics::init_metrics(addr),
        Err(e) => tracing::error!(
            metrics_address = %config.observability.metrics_address,
            error = %e,
            "Failed to parse metrics address"
        ),
    }
}

/// Build the shared state from configuration.
pub fn build_state(config: GuardConfig) -> Result<Arc<GuardState>, StateError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        relay_enabled = config.relay.enabled,
        accounts = config.auth.users.len(),
        environment = ?config.observability.environment,
        "Configuration loaded"
    );

    let state = GuardState::builder(config).build()?;
    tracing::info!(
        tracked_lockouts = state.lockout.len(),
        "Guard state ready"
    );
    Ok(Arc::new(state))
}

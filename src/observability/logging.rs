//! Structured logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to
//! this crate and `tower_http`. Production uses the compact formatter
//! without targets.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Environment, ObservabilityConfig};

pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "form_guard={level},tower_http={level}",
            level = config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.environment {
        Environment::Production => registry
            .with(tracing_subscriber::fmt::layer().compact().with_target(false))
            .init(),
        Environment::Development => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

//! Shared application state.
//!
//! Every store the guard consults lives here as an owned object, so two
//! `GuardState`s never share limits, tokens or sessions. Collaborators
//! that talk to the outside world are trait objects chosen at build time.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::auth::{IdentityProvider, SessionManager, StaticIdentityProvider};
use crate::config::GuardConfig;
use crate::observability::ErrorReporter;
use crate::relay::{
    DisabledRelay, DocumentStore, EmailJsRelay, EmailRelay, MemoryDocumentStore, RelayError,
};
use crate::security::{CsrfGuard, InputValidator, LockoutTracker, RateLimiter};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to load persisted state: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("failed to build email relay: {0}")]
    Relay(#[from] RelayError),

    #[error("failed to build error reporter: {0}")]
    Reporter(#[from] reqwest::Error),
}

pub struct GuardState {
    config: ArcSwap<GuardConfig>,
    validator: ArcSwap<InputValidator>,
    pub rate_limiter: RateLimiter,
    pub csrf: CsrfGuard,
    pub lockout: LockoutTracker,
    pub sessions: SessionManager,
    pub relay: Arc<dyn EmailRelay>,
    pub identity: Arc<dyn IdentityProvider>,
    pub documents: Arc<dyn DocumentStore>,
    pub reporter: ErrorReporter,
}

impl GuardState {
    pub fn builder(config: GuardConfig) -> GuardStateBuilder {
        GuardStateBuilder {
            config,
            relay: None,
            identity: None,
            documents: None,
        }
    }

    pub fn config(&self) -> Arc<GuardConfig> {
        self.config.load_full()
    }

    pub fn validator(&self) -> Arc<InputValidator> {
        self.validator.load_full()
    }

    /// Swap in a reloaded configuration. Policies apply to the next request;
    /// tracked attempts, tokens and sessions are kept.
    pub fn apply_config(&self, config: GuardConfig) {
        self.rate_limiter.set_policy(config.rate_limit.clone());
        self.lockout.set_policy(config.lockout.clone());
        self.sessions.set_policy(config.session.clone());
        self.validator
            .store(Arc::new(InputValidator::new(config.validation.clone())));
        self.config.store(Arc::new(config));
        tracing::info!("Configuration applied");
    }

    /// Write durable stores to disk.
    pub async fn flush(&self) {
        if let Err(e) = self.lockout.save() {
            tracing::error!(error = %e, "Failed to persist login attempts");
        }
        if let Err(e) = self.documents.flush().await {
            tracing::error!(error = %e, "Failed to persist documents");
        }
    }
}

pub struct GuardStateBuilder {
    config: GuardConfig,
    relay: Option<Arc<dyn EmailRelay>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    documents: Option<Arc<dyn DocumentStore>>,
}

impl GuardStateBuilder {
    pub fn relay(mut self, relay: Arc<dyn EmailRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn documents(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Fill unset collaborators from the configuration and load persisted
    /// lockout and document state.
    pub fn build(self) -> Result<GuardState, StateError> {
        let config = self.config;

        let outbound_timeout = Duration::from_secs(config.timeouts.relay_secs);
        let relay: Arc<dyn EmailRelay> = match self.relay {
            Some(relay) => relay,
            None if config.relay.enabled => {
                Arc::new(EmailJsRelay::new(&config.relay, outbound_timeout)?)
            }
            None => {
                tracing::warn!("Email relay disabled; contact submissions will fail");
                Arc::new(DisabledRelay)
            }
        };

        let identity: Arc<dyn IdentityProvider> = match self.identity {
            Some(identity) => identity,
            None => Arc::new(StaticIdentityProvider::from_config(&config.auth)),
        };

        let documents: Arc<dyn DocumentStore> = match self.documents {
            Some(documents) => documents,
            None => Arc::new(MemoryDocumentStore::load(
                config.documents.snapshot_path.as_ref().map(PathBuf::from),
            )?),
        };

        Ok(GuardState {
            validator: ArcSwap::from_pointee(InputValidator::new(config.validation.clone())),
            rate_limiter: RateLimiter::new(config.rate_limit.clone()),
            csrf: CsrfGuard::new(),
            lockout: LockoutTracker::load(config.lockout.clone())?,
            sessions: SessionManager::new(config.session.clone()),
            relay,
            identity,
            documents,
            reporter: ErrorReporter::new(outbound_timeout)?,
            config: ArcSwap::from_pointee(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_defaults() {
        let state = GuardState::builder(GuardConfig::default()).build().unwrap();
        assert_eq!(state.config().rate_limit.max_attempts, 3);
        assert!(state.csrf.is_empty());
    }

    #[test]
    fn test_apply_config_swaps_policies() {
        let state = GuardState::builder(GuardConfig::default()).build().unwrap();
        let mut next = GuardConfig::default();
        next.rate_limit.max_attempts = 10;
        next.validation.min_message_length = 2;
        state.apply_config(next);

        assert_eq!(state.rate_limiter.policy().max_attempts, 10);
        assert!(state.validator().is_valid_message("ok"));
    }
}

//! Background maintenance.
//!
//! On every tick: drop idle rate-limit clients, purge expired sessions
//! along with their CSRF tokens, drop stale anonymous CSRF tokens, purge
//! elapsed lockout records and persist the lockout table. On shutdown the
//! durable stores are flushed once more before the task exits.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time;

use crate::security::csrf::{scope_session, session_scope};
use crate::state::GuardState;

/// What one maintenance pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub clients: usize,
    pub sessions: usize,
    pub csrf_tokens: usize,
    pub lockouts: usize,
}

pub fn sweep(state: &GuardState) -> SweepReport {
    sweep_at(state, Utc::now())
}

pub fn sweep_at(state: &GuardState, now: DateTime<Utc>) -> SweepReport {
    let clients = state.rate_limiter.cleanup();

    let ended = state.sessions.drain_expired_at(now);
    for token in &ended {
        state.csrf.revoke(&session_scope(token));
    }

    let ttl = chrono::Duration::seconds(state.config().security.csrf_token_ttl_secs as i64);
    let csrf_tokens = state.csrf.purge_older_than_at(ttl, now, |scope| {
        scope_session(scope).is_some_and(|token| state.sessions.contains(token))
    });

    let lockouts = state.lockout.purge_expired_at(now);
    if let Err(e) = state.lockout.save() {
        tracing::error!(error = %e, "Failed to persist login attempts");
    }

    SweepReport {
        clients,
        sessions: ended.len(),
        csrf_tokens,
        lockouts,
    }
}

pub async fn run_maintenance(state: Arc<GuardState>, mut shutdown: broadcast::Receiver<()>) {
    let secs = state.config().rate_limit.cleanup_interval_secs.max(1);
    let mut ticker = time::interval(Duration::from_secs(secs));
    // The first tick completes immediately.
    ticker.tick().await;

    tracing::info!(interval_secs = secs, "Maintenance task starting");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = sweep(&state);
                tracing::debug!(
                    clients = report.clients,
                    sessions = report.sessions,
                    csrf_tokens = report.csrf_tokens,
                    lockouts = report.lockouts,
                    "Maintenance sweep"
                );
            }
            _ = shutdown.recv() => {
                tracing::info!("Maintenance task received shutdown signal, flushing");
                state.flush().await;
                break;
            }
        }
    }
}

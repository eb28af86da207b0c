//! CSRF token issuance and checking.
//!
//! One live token per scope. A scope is [`session_scope`] for signed-in
//! callers and the client fingerprint otherwise. Callers rotate the token
//! after every submission attempt, successful or not.
//!
//! Tokens carry their issue time so the maintenance sweep can drop the
//! ones nobody came back for.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::security::token::{constant_time_eq, random_hex};

/// Length of a CSRF token in random bytes.
pub const CSRF_TOKEN_BYTES: usize = 32;

/// Header carrying the token on API requests (the page's `csrfToken`).
pub const CSRF_HEADER: &str = "x-csrf-token";

const SESSION_SCOPE_PREFIX: &str = "session:";

/// Scope for a signed-in caller's tokens.
pub fn session_scope(session_token: &str) -> String {
    format!("{}{}", SESSION_SCOPE_PREFIX, session_token)
}

/// The session token behind a session scope, `None` for client scopes.
pub fn scope_session(scope: &str) -> Option<&str> {
    scope.strip_prefix(SESSION_SCOPE_PREFIX)
}

#[derive(Debug, Clone)]
struct IssuedToken {
    value: String,
    issued_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct CsrfGuard {
    tokens: DashMap<String, IssuedToken>,
}

impl CsrfGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for `scope`, replacing any previous one.
    pub fn generate_token(&self, scope: &str) -> String {
        self.generate_token_at(scope, Utc::now())
    }

    pub fn generate_token_at(&self, scope: &str, now: DateTime<Utc>) -> String {
        let value = random_hex(CSRF_TOKEN_BYTES);
        self.tokens.insert(
            scope.to_string(),
            IssuedToken {
                value: value.clone(),
                issued_at: now,
            },
        );
        value
    }

    /// Check a submitted token against the live token for `scope`.
    pub fn validate_token(&self, scope: &str, submitted: &str) -> bool {
        if submitted.is_empty() {
            return false;
        }
        match self.tokens.get(scope) {
            Some(stored) => constant_time_eq(&stored.value, submitted),
            None => false,
        }
    }

    /// Drop the token for `scope`, e.g. on logout.
    pub fn revoke(&self, scope: &str) {
        self.tokens.remove(scope);
    }

    /// Drop tokens issued more than `max_age` before `now`, except those
    /// whose scope `keep` still vouches for.
    pub fn purge_older_than_at<F>(&self, max_age: Duration, now: DateTime<Utc>, keep: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let before = self.tokens.len();
        self.tokens
            .retain(|scope, token| now - token.issued_at <= max_age || keep(scope.as_str()));
        before.saturating_sub(self.tokens.len())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

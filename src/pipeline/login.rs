//! Login and logout flow.
//!
//! Sanitize and validate the identifier, reserve an attempt against the
//! account's lockout counter, then ask the identity provider. A success
//! starts a session, issues a session-scoped CSRF token and writes a
//! `login` activity entry for the dashboard feed.

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{IdentityError, SessionRecord};
use crate::dashboard::into_document;
use crate::observability::metrics;
use crate::security::csrf::session_scope;
use crate::security::{sanitize, FieldError, FieldKind};
use crate::state::GuardState;

pub const LOGIN_SUCCESS_MESSAGE: &str = "Login successful! Welcome back.";
pub const LOGIN_UNAVAILABLE_MESSAGE: &str = "Login failed. Please try again.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub remember_me: bool,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated {
        session: SessionRecord,
        csrf_token: String,
    },
    Rejected {
        errors: Vec<FieldError>,
    },
    LockedOut {
        retry_after_secs: u64,
        message: String,
    },
    InvalidCredentials {
        remaining_attempts: u32,
        message: String,
    },
    Unavailable {
        message: String,
    },
}

fn lockout_message(retry_after_secs: u64) -> String {
    let minutes = retry_after_secs.div_ceil(60).max(1);
    format!(
        "Too many failed login attempts. Please try again in {} minute{}.",
        minutes,
        if minutes == 1 { "" } else { "s" }
    )
}

fn invalid_credentials_message(remaining: u32) -> String {
    match remaining {
        0 => "Invalid credentials. Account is now locked.".to_string(),
        1 => "Invalid credentials. Account will be locked after next failed attempt.".to_string(),
        n => format!("Invalid credentials. {} attempts remaining.", n),
    }
}

pub async fn login(state: &GuardState, request: LoginRequest) -> LoginOutcome {
    let validator = state.validator();
    let username = sanitize(&request.username, FieldKind::Text);

    // The password is compared, never displayed or stored, so it is not
    // sanitized.
    let mut errors = Vec::new();
    if !validator.is_valid_username(&username) {
        errors.push(FieldError::new(
            "username",
            "Please enter a valid username or email",
        ));
    }
    if !validator.is_valid_password(&request.password) {
        errors.push(FieldError::new(
            "password",
            format!(
                "Password must be at least {} characters long",
                validator.config().min_password_length
            ),
        ));
    }
    if !errors.is_empty() {
        metrics::record_login("invalid");
        return LoginOutcome::Rejected { errors };
    }

    // One counter per account. The attempt counts as failed until the
    // provider says otherwise.
    let key = state.identity.account_key(&username);
    if let Err(retry_after_secs) = state.lockout.try_begin_attempt(&key) {
        tracing::warn!(username = %username, retry_after_secs, "Login refused: locked out");
        metrics::record_lockout();
        metrics::record_login("locked_out");
        return LoginOutcome::LockedOut {
            retry_after_secs,
            message: lockout_message(retry_after_secs),
        };
    }

    match state
        .identity
        .authenticate(&username, &request.password)
        .await
    {
        Ok(user) => {
            state.lockout.record_attempt(&key, true);
            let session = state.sessions.start(user, request.remember_me);
            let csrf_token = state.csrf.generate_token(&session_scope(&session.token));
            record_login_activity(state, &session).await;
            tracing::info!(user = %session.user.id, remember_me = request.remember_me, "Login succeeded");
            metrics::record_login("success");
            LoginOutcome::Authenticated {
                session,
                csrf_token,
            }
        }
        Err(err @ IdentityError::Unavailable(_)) => {
            state.lockout.release_attempt(&key);
            let config = state.config();
            state.reporter.report(&config.observability, &err, "/api/auth/login");
            metrics::record_login("unavailable");
            LoginOutcome::Unavailable {
                message: LOGIN_UNAVAILABLE_MESSAGE.to_string(),
            }
        }
        Err(_) => {
            let remaining_attempts = state.lockout.remaining_attempts(&key);
            tracing::info!(username = %username, remaining_attempts, "Login failed");
            metrics::record_login("failure");
            LoginOutcome::InvalidCredentials {
                remaining_attempts,
                message: invalid_credentials_message(remaining_attempts),
            }
        }
    }
}

async fn record_login_activity(state: &GuardState, session: &SessionRecord) {
    let entry = into_document(json!({
        "userId": session.user.id,
        "type": "login",
        "title": "Logged in",
        "description": "Signed in to the student portal",
        "timestamp": session.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    }));
    if let Err(e) = state.documents.add("activity", entry).await {
        tracing::warn!(error = %e, "Failed to record login activity");
    }
}

/// End the session behind `token` and drop its CSRF token.
pub fn logout(state: &GuardState, token: &str) -> bool {
    state.csrf.revoke(&session_scope(token));
    match state.sessions.end(token) {
        Some(session) => {
            tracing::info!(
                user = %session.user.id,
                duration_secs = (Utc::now() - session.created_at).num_seconds(),
                "Logged out"
            );
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_message_rounds_up_minutes() {
        assert_eq!(
            lockout_message(900),
            "Too many failed login attempts. Please try again in 15 minutes."
        );
        assert_eq!(
            lockout_message(30),
            "Too many failed login attempts. Please try again in 1 minute."
        );
    }

    #[test]
    fn test_invalid_credentials_message() {
        assert_eq!(
            invalid_credentials_message(3),
            "Invalid credentials. 3 attempts remaining."
        );
        assert!(invalid_credentials_message(1).contains("next failed attempt"));
        assert!(invalid_credentials_message(0).contains("locked"));
    }
}

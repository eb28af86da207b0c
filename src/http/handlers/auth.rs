//! Sign-in surface: login, logout, session lookup, password strength.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::validate_strength;
use crate::http::middleware::CurrentSession;
use crate::http::request::bearer_token;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::pipeline::login::LOGIN_SUCCESS_MESSAGE;
use crate::pipeline::{login as run_login, logout as run_logout, LoginOutcome, LoginRequest};

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    match run_login(&state.guard, request).await {
        LoginOutcome::Authenticated {
            session,
            csrf_token,
        } => Ok(Json(json!({
            "message": LOGIN_SUCCESS_MESSAGE,
            "token": session.token,
            "expiresAt": session.expires_at,
            "rememberMe": session.remember_me,
            "user": session.user,
            "csrfToken": csrf_token,
        }))),
        LoginOutcome::Rejected { errors } => Err(ApiError::Invalid(errors)),
        LoginOutcome::LockedOut {
            retry_after_secs,
            message,
        } => Err(ApiError::LockedOut {
            retry_after_secs,
            message,
        }),
        LoginOutcome::InvalidCredentials {
            remaining_attempts,
            message,
        } => Err(ApiError::InvalidCredentials {
            remaining_attempts,
            message,
        }),
        LoginOutcome::Unavailable { message } => Err(ApiError::Unavailable(message)),
    }
}

/// `POST /api/auth/logout`. Succeeds whether or not a session existed.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let ended = bearer_token(&headers)
        .map(|token| run_logout(&state.guard, &token))
        .unwrap_or(false);
    Json(json!({ "loggedOut": ended }))
}

/// `GET /api/auth/session`
pub async fn session(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .guard
        .sessions
        .session(&current.token)
        .ok_or_else(|| ApiError::Unauthorized("Your session has expired. Please sign in again.".to_string()))?;
    Ok(Json(json!({
        "user": record.user,
        "createdAt": record.created_at,
        "lastActivity": record.last_activity,
        "expiresAt": record.expires_at,
        "rememberMe": record.remember_me,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StrengthRequest {
    pub password: String,
}

/// `POST /api/auth/strength`
pub async fn strength(
    State(state): State<AppState>,
    Json(request): Json<StrengthRequest>,
) -> Json<Value> {
    let min_length = state.guard.validator().config().min_password_length;
    Json(json!(validate_strength(&request.password, min_length)))
}

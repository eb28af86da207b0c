//! Route handlers, grouped by surface.

pub mod auth;
pub mod contact;
pub mod dashboard;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::http::request::{bearer_token, ClientContext};
use crate::http::server::AppState;
use crate::security::csrf::session_scope;
use crate::state::GuardState;

pub async fn health() -> &'static str {
    "ok"
}

/// CSRF scope for a caller: the session scope when signed in, otherwise
/// the client fingerprint.
pub fn csrf_scope(guard: &GuardState, headers: &HeaderMap, client: &ClientContext) -> String {
    bearer_token(headers)
        .filter(|token| guard.sessions.is_valid(token))
        .map(|token| session_scope(&token))
        .unwrap_or_else(|| client.client_id.clone())
}

/// `GET /api/csrf`
pub async fn issue_csrf(
    State(state): State<AppState>,
    client: ClientContext,
    headers: HeaderMap,
) -> Json<Value> {
    let scope = csrf_scope(&state.guard, &headers, &client);
    Json(json!({ "csrfToken": state.guard.csrf.generate_token(&scope) }))
}

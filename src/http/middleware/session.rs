//! Session middleware for signed-in routes.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::AuthenticatedUser;
use crate::http::request::{bearer_token, header_value};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::pipeline::contact::CSRF_INVALID_MESSAGE;
use crate::security::csrf::{session_scope, CSRF_HEADER};

/// The caller's live session, attached by [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub user: AuthenticatedUser,
}

/// Reject requests without a live session. A valid request slides the
/// session's expiry forward; an ended one loses its CSRF token.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Please sign in to continue.".to_string()))?;

    let Some(session) = state.guard.sessions.session(&token) else {
        state.guard.csrf.revoke(&session_scope(&token));
        return Err(ApiError::Unauthorized(
            "Your session has expired. Please sign in again.".to_string(),
        ));
    };

    request.extensions_mut().insert(CurrentSession {
        token,
        user: session.user,
    });
    Ok(next.run(request).await)
}

/// Require the session-scoped CSRF token on state-changing requests.
/// Must run inside [`require_session`].
pub async fn require_csrf(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method().is_safe() {
        return Ok(next.run(request).await);
    }

    let scope = request
        .extensions()
        .get::<CurrentSession>()
        .map(|session| session_scope(&session.token))
        .ok_or_else(|| ApiError::Unauthorized("Please sign in to continue.".to_string()))?;
    let submitted = header_value(request.headers(), CSRF_HEADER).unwrap_or_default();

    if !state.guard.csrf.validate_token(&scope, &submitted) {
        tracing::warn!(path = %request.uri().path(), "CSRF check failed");
        return Err(ApiError::Forbidden(CSRF_INVALID_MESSAGE.to_string()));
    }
    Ok(next.run(request).await)
}

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::http::server::AppState;
use crate::security::headers::{apply_security_headers, https_redirect_target};

/// Redirect plain-HTTP traffic for public hosts and add security headers.
/// Reads the live configuration so a reload takes effect immediately.
pub async fn security_layer(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let config = state.guard.config();

    if config.security.enforce_https {
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        if let Some(target) = https_redirect_target(request.headers(), path_and_query) {
            tracing::debug!(target = %target, "Redirecting to HTTPS");
            return Redirect::permanent(&target).into_response();
        }
    }

    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut(), &config.security);
    response
}

//! Per-request context extracted from headers and the connection.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use crate::security::ClientHints;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Identity of an anonymous caller plus what the pipelines log about it.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub request_id: String,
    pub client_id: String,
    pub user_agent: String,
    /// Page the form was posted from, for error reports.
    pub page: String,
}

impl ClientContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let peer_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());
        let hints = ClientHints::from_headers(&parts.headers, peer_ip);

        Self {
            request_id: header_value(&parts.headers, X_REQUEST_ID)
                .unwrap_or_else(|| "unknown".to_string()),
            client_id: hints.client_id(),
            user_agent: hints.user_agent,
            page: header_value(&parts.headers, header::REFERER.as_str())
                .unwrap_or_else(|| parts.uri.path().to_string()),
        }
    }
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

pub fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc123"));
        headers.insert(header::AUTHORIZATION, "Basic abc123".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn test_context_uses_peer_and_referer() {
        let request = Request::builder()
            .uri("/api/contact")
            .header("user-agent", "Mozilla/5.0")
            .header(header::REFERER, "https://philtech.edu.ph/contact.html")
            .header(X_REQUEST_ID, "req-1")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let without_peer = ClientContext::from_parts(&parts);

        parts
            .extensions
            .insert(ConnectInfo::<SocketAddr>("10.1.2.3:5000".parse().unwrap()));
        let with_peer = ClientContext::from_parts(&parts);

        assert_eq!(with_peer.request_id, "req-1");
        assert_eq!(with_peer.page, "https://philtech.edu.ph/contact.html");
        assert_eq!(with_peer.user_agent, "Mozilla/5.0");
        assert_ne!(with_peer.client_id, without_peer.client_id);
    }
}

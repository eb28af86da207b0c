//! Security response headers and HTTPS enforcement rules.

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::SecurityConfig;

/// Add hardening headers to a response. Existing values are kept.
pub fn apply_security_headers(headers: &mut HeaderMap, config: &SecurityConfig) {
    if !config.enable_headers {
        return;
    }

    let fixed = [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
        (header::CACHE_CONTROL, "no-store"),
    ];
    for (name, value) in fixed {
        headers
            .entry(name)
            .or_insert_with(|| HeaderValue::from_static(value));
    }

    if let Ok(csp) = HeaderValue::from_str(&config.content_security_policy) {
        headers.entry(header::CONTENT_SECURITY_POLICY).or_insert(csp);
    }
}

/// Hosts that are never redirected to HTTPS.
pub fn is_local_host(host: &str) -> bool {
    let name = if host.starts_with('[') {
        host.split(']').next().map(|h| h.trim_start_matches('[')).unwrap_or(host)
    } else {
        host.split(':').next().unwrap_or(host)
    };
    matches!(name, "localhost" | "127.0.0.1" | "::1")
}

/// Compute the HTTPS redirect target for a plain-HTTP request, if one is
/// required. The scheme is taken from `X-Forwarded-Proto`, as the guard
/// normally sits behind a TLS-terminating proxy.
pub fn https_redirect_target(headers: &HeaderMap, path_and_query: &str) -> Option<String> {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())?;
    if !proto.eq_ignore_ascii_case("http") {
        return None;
    }
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok())?;
    if is_local_host(host) {
        return None;
    }
    Some(format!("https://{}{}", host, path_and_query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_added() {
        let mut headers = HeaderMap::new();
        apply_security_headers(&mut headers, &SecurityConfig::default());
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    }

    #[test]
    fn test_headers_disabled() {
        let mut headers = HeaderMap::new();
        let config = SecurityConfig {
            enable_headers: false,
            ..SecurityConfig::default()
        };
        apply_security_headers(&mut headers, &config);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_local_hosts() {
        assert!(is_local_host("localhost:8080"));
        assert!(is_local_host("127.0.0.1"));
        assert!(is_local_host("[::1]:3000"));
        assert!(!is_local_host("philtech.edu.ph"));
    }

    #[test]
    fn test_redirect_target() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
        headers.insert(header::HOST, HeaderValue::from_static("philtech.edu.ph"));
        assert_eq!(
            https_redirect_target(&headers, "/api/contact?x=1").as_deref(),
            Some("https://philtech.edu.ph/api/contact?x=1")
        );

        headers.insert(header::HOST, HeaderValue::from_static("localhost:8080"));
        assert!(https_redirect_target(&headers, "/").is_none());

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert(header::HOST, HeaderValue::from_static("philtech.edu.ph"));
        assert!(https_redirect_target(&headers, "/").is_none());
    }
}

//! Client fingerprinting for rate-limit keys.
//!
//! Anonymous submitters have no account identifier, so the limiter keys on
//! a hash of what the client exposes: user agent, language, screen size,
//! timezone offset and peer address. The page sends the screen and
//! timezone values as `x-screen-width`, `x-screen-height` and
//! `x-timezone-offset` headers.

use std::net::IpAddr;

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

/// Observable client characteristics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHints {
    pub user_agent: String,
    pub language: String,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub timezone_offset_minutes: Option<i32>,
    pub peer_ip: Option<IpAddr>,
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn header_parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

impl ClientHints {
    pub fn from_headers(headers: &HeaderMap, peer_ip: Option<IpAddr>) -> Self {
        Self {
            user_agent: header_str(headers, "user-agent"),
            language: header_str(headers, "accept-language"),
            screen_width: header_parse(headers, "x-screen-width"),
            screen_height: header_parse(headers, "x-screen-height"),
            timezone_offset_minutes: header_parse(headers, "x-timezone-offset"),
            peer_ip,
        }
    }

    /// Stable identifier of the form `client_<base36>`.
    pub fn client_id(&self) -> String {
        let joined = [
            self.user_agent.clone(),
            self.language.clone(),
            self.screen_width.map(|v| v.to_string()).unwrap_or_default(),
            self.screen_height.map(|v| v.to_string()).unwrap_or_default(),
            self.timezone_offset_minutes
                .map(|v| v.to_string())
                .unwrap_or_default(),
            self.peer_ip.map(|ip| ip.to_string()).unwrap_or_default(),
        ]
        .join("|");

        let digest = Sha256::digest(joined.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        format!("client_{}", to_base36(u64::from_be_bytes(prefix)))
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

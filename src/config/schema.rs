//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the form submission guard.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Field-level validation bounds.
    pub validation: ValidationConfig,

    /// Sliding-window rate limiting for form submissions.
    pub rate_limit: RateLimitConfig,

    /// Failed-login lockout policy.
    pub lockout: LockoutConfig,

    /// Session lifetime settings.
    pub session: SessionConfig,

    /// Submission lifecycle settings.
    pub submission: SubmissionConfig,

    /// Outbound email relay.
    pub relay: RelayConfig,

    /// Credential store for the built-in identity provider.
    pub auth: AuthConfig,

    /// Document store settings.
    pub documents: DocumentsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// HTTP hardening.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for an inbound request in seconds.
    pub request_secs: u64,

    /// Time allowed for a single outbound call (email relay or monitoring
    /// sink) in seconds.
    pub relay_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            relay_secs: 15,
        }
    }
}

/// Field validation bounds. Lengths are counted in characters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_name_length: usize,
    pub max_name_length: usize,
    pub min_email_length: usize,
    pub max_email_length: usize,
    pub min_message_length: usize,
    pub max_message_length: usize,
    pub min_username_length: usize,
    pub max_username_length: usize,
    pub min_password_length: usize,
    pub max_password_length: usize,

    /// Closed set of program codes accepted by the contact form.
    pub programs: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_name_length: 2,
            max_name_length: 50,
            min_email_length: 5,
            max_email_length: 254,
            min_message_length: 10,
            max_message_length: 1000,
            min_username_length: 3,
            max_username_length: 50,
            min_password_length: 8,
            max_password_length: 100,
            programs: [
                "bscs", "bsoa", "btvted", "humms", "abm", "he", "ict", "software", "ai",
                "consultancy",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum attempts allowed inside the trailing window.
    pub max_attempts: usize,

    /// Length of the trailing window in seconds.
    pub window_secs: u64,

    /// How often idle clients are swept from memory, in seconds.
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            window_secs: 60,
            cleanup_interval_secs: 60,
        }
    }
}

/// Failed-login lockout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Failures before an identifier is locked out.
    pub max_attempts: u32,

    /// Lockout window in seconds, measured from the last failure.
    pub lockout_secs: u64,

    /// JSON file the attempt table is persisted to.
    pub persistence_path: Option<String>,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_secs: 15 * 60,
            persistence_path: None,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inactivity timeout in seconds.
    pub timeout_secs: u64,

    /// Inactivity timeout for "remember me" sessions in seconds.
    pub remember_me_timeout_secs: u64,

    /// Random bytes in a session token (hex-encoded on the wire).
    pub token_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30 * 60,
            remember_me_timeout_secs: 7 * 24 * 60 * 60,
            token_bytes: 32,
        }
    }
}

/// Submission lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Seconds before a sent/failed submission reverts to idle.
    pub revert_delay_secs: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            revert_delay_secs: 5,
        }
    }
}

/// Email relay configuration (EmailJS-compatible REST endpoint).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Enable outbound delivery. When disabled every send fails.
    pub enabled: bool,

    /// REST endpoint receiving send requests.
    pub endpoint: String,

    /// Service identifier registered with the provider.
    pub service_id: String,

    /// Template identifier registered with the provider.
    pub template_id: String,

    /// Public key (EmailJS "user_id").
    pub public_key: String,

    /// Optional private access token.
    pub private_key: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.emailjs.com/api/v1.0/email/send".to_string(),
            service_id: "service_4e2so76".to_string(),
            template_id: "template_fhr48dd".to_string(),
            public_key: String::new(),
            private_key: None,
        }
    }
}

/// Built-in identity provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Salt appended by the legacy SHA-256 digest.
    pub legacy_salt: String,

    /// Known accounts.
    pub users: Vec<UserConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            legacy_salt: "philtech_salt_2025".to_string(),
            users: Vec::new(),
        }
    }
}

/// A single account entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,
    pub email: String,

    /// Argon2 PHC string, or `sha256:<hex>` for legacy rows.
    pub password_hash: String,

    #[serde(default = "default_role")]
    pub role: String,

    #[serde(default)]
    pub full_name: String,
}

fn default_role() -> String {
    "student".to_string()
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DocumentsConfig {
    /// JSON snapshot file loaded at startup and written on shutdown.
    pub snapshot_path: Option<String>,
}

/// Deployment environment; controls error verbosity.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Deployment environment.
    pub environment: Environment,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Optional monitoring sink receiving truncated error reports.
    pub monitoring_url: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            environment: Environment::Development,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            monitoring_url: None,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,

    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Redirect plain-HTTP requests for non-local hosts to HTTPS.
    pub enforce_https: bool,

    /// Content-Security-Policy header value.
    pub content_security_policy: String,

    /// Age in seconds after which an unused CSRF token is swept. Tokens
    /// of live sessions are kept regardless.
    pub csrf_token_ttl_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 64 * 1024,
            enforce_https: false,
            content_security_policy: "default-src 'self'; frame-ancestors 'none'".to_string(),
            csrf_token_ttl_secs: 60 * 60,
        }
    }
}

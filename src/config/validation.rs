//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! consistency. All errors are collected, not just the first.

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::GuardConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            "must be a socket address such as 0.0.0.0:8080",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.timeouts.relay_secs == 0 {
        errors.push(ValidationError::new("timeouts.relay_secs", "must be > 0"));
    }

    let v = &config.validation;
    let bounds = [
        ("validation.name_length", v.min_name_length, v.max_name_length),
        ("validation.email_length", v.min_email_length, v.max_email_length),
        ("validation.message_length", v.min_message_length, v.max_message_length),
        ("validation.username_length", v.min_username_length, v.max_username_length),
        ("validation.password_length", v.min_password_length, v.max_password_length),
    ];
    for (field, min, max) in bounds {
        if min == 0 || min > max {
            errors.push(ValidationError::new(field, "minimum must be > 0 and <= maximum"));
        }
    }
    if v.programs.is_empty() {
        errors.push(ValidationError::new("validation.programs", "must not be empty"));
    }

    if config.rate_limit.max_attempts == 0 {
        errors.push(ValidationError::new("rate_limit.max_attempts", "must be > 0"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
    }
    if config.rate_limit.cleanup_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.cleanup_interval_secs", "must be > 0"));
    }

    if config.lockout.max_attempts == 0 {
        errors.push(ValidationError::new("lockout.max_attempts", "must be > 0"));
    }
    if config.lockout.lockout_secs == 0 {
        errors.push(ValidationError::new("lockout.lockout_secs", "must be > 0"));
    }

    if config.session.timeout_secs == 0 {
        errors.push(ValidationError::new("session.timeout_secs", "must be > 0"));
    }
    if config.session.remember_me_timeout_secs < config.session.timeout_secs {
        errors.push(ValidationError::new(
            "session.remember_me_timeout_secs",
            "must be >= session.timeout_secs",
        ));
    }
    if config.session.token_bytes < 16 {
        errors.push(ValidationError::new("session.token_bytes", "must be >= 16"));
    }

    if config.relay.enabled {
        match Url::parse(&config.relay.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::new("relay.endpoint", "must be an http(s) URL")),
        }
        for (field, value) in [
            ("relay.service_id", &config.relay.service_id),
            ("relay.template_id", &config.relay.template_id),
            ("relay.public_key", &config.relay.public_key),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::new(field, "required when relay is enabled"));
            }
        }
    }

    for (i, user) in config.auth.users.iter().enumerate() {
        if user.username.trim().is_empty() || user.email.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("auth.users[{}]", i),
                "username and email are required",
            ));
        }
        if user.password_hash.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("auth.users[{}].password_hash", i),
                "must not be empty",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }
    if let Some(url) = &config.observability.monitoring_url {
        if Url::parse(url).is_err() {
            errors.push(ValidationError::new("observability.monitoring_url", "must be a URL"));
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be > 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::UserConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GuardConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.rate_limit.window_secs = 0;
        config.validation.min_message_length = 2000;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"rate_limit.window_secs"));
        assert!(fields.contains(&"validation.message_length"));
    }

    #[test]
    fn test_enabled_relay_requires_credentials() {
        let mut config = GuardConfig::default();
        config.relay.enabled = true;
        config.relay.endpoint = "ftp://mail.example".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"relay.endpoint"));
        assert!(fields.contains(&"relay.public_key"));
    }

    #[test]
    fn test_user_without_hash_is_rejected() {
        let mut config = GuardConfig::default();
        config.auth.users.push(UserConfig {
            username: "admin".into(),
            email: "admin@philtech.edu.ph".into(),
            password_hash: " ".into(),
            role: "admin".into(),
            full_name: "Administrator".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "auth.users[0].password_hash");
    }
}

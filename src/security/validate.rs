//! Field validation predicates.
//!
//! Every predicate is total: empty or malformed input returns `false`,
//! never an error. Lengths are counted in characters.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::ValidationConfig;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s\-']+$").expect("static name pattern"));

// Simplified RFC 5322: permissive local part, dot-separated hostname labels.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("static email pattern")
});

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._@-]+$").expect("static username pattern"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-() ]{7,20}$").expect("static phone pattern"));

static RESIDUAL_MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<script|javascript:|onerror=|onclick=").expect("static markup pattern")
});

/// A user-facing error attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Field validator bound to a set of length limits and program codes.
#[derive(Debug, Clone, Default)]
pub struct InputValidator {
    config: ValidationConfig,
}

fn within(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    len >= min && len <= max
}

impl InputValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn is_valid_name(&self, name: &str) -> bool {
        within(name, self.config.min_name_length, self.config.max_name_length)
            && NAME_RE.is_match(name)
    }

    pub fn is_valid_email(&self, email: &str) -> bool {
        within(email, self.config.min_email_length, self.config.max_email_length)
            && EMAIL_RE.is_match(email)
    }

    /// Length bounds plus a second check for script markup that must have
    /// been removed by sanitization already.
    pub fn is_valid_message(&self, message: &str) -> bool {
        within(message, self.config.min_message_length, self.config.max_message_length)
            && !RESIDUAL_MARKUP_RE.is_match(message)
    }

    pub fn is_valid_program(&self, program: &str) -> bool {
        self.config.programs.iter().any(|p| p == program)
    }

    pub fn is_valid_username(&self, username: &str) -> bool {
        within(
            username,
            self.config.min_username_length,
            self.config.max_username_length,
        ) && USERNAME_RE.is_match(username)
    }

    /// Length only. Complexity is advisory, see `auth::password::validate_strength`.
    pub fn is_valid_password(&self, password: &str) -> bool {
        within(
            password,
            self.config.min_password_length,
            self.config.max_password_length,
        )
    }

    pub fn is_valid_phone(&self, phone: &str) -> bool {
        PHONE_RE.is_match(phone)
    }

    pub fn name_message(&self) -> String {
        format!(
            "Please enter a valid name ({}-{} characters, letters only)",
            self.config.min_name_length, self.config.max_name_length
        )
    }

    pub fn message_message(&self) -> String {
        format!(
            "Message must be {}-{} characters",
            self.config.min_message_length, self.config.max_message_length
        )
    }
}

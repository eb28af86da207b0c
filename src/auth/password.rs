//! Password hashing and strength scoring.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::security::token::constant_time_eq;

/// Prefix marking a legacy salted SHA-256 credential row.
pub const LEGACY_PREFIX: &str = "sha256:";

/// Characters that count as "special" for strength scoring.
pub const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Hex SHA-256 of `password + salt`. Fast and unsuitable for new
/// credentials; only used to recognise rows stored this way.
pub fn legacy_digest(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password into an Argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored credential: an Argon2 PHC string or
/// a `sha256:<hex>` legacy row.
pub fn verify_password(password: &str, stored: &str, legacy_salt: &str) -> bool {
    if let Some(expected) = stored.strip_prefix(LEGACY_PREFIX) {
        return constant_time_eq(&legacy_digest(password, legacy_salt), expected);
    }
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored credential is not a valid PHC string");
            false
        }
    }
}

/// Which strength criteria a password meets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthRequirements {
    pub min_length: bool,
    pub has_upper_case: bool,
    pub has_lower_case: bool,
    pub has_numbers: bool,
    pub has_special_char: bool,
}

/// Advisory strength report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthReport {
    pub requirements: StrengthRequirements,
    pub strength: u8,
    pub is_strong: bool,
    pub feedback: Vec<String>,
}

/// Score a password against five criteria; strong at four or more.
pub fn validate_strength(password: &str, min_length: usize) -> StrengthReport {
    let requirements = StrengthRequirements {
        min_length: password.chars().count() >= min_length,
        has_upper_case: password.chars().any(|c| c.is_ascii_uppercase()),
        has_lower_case: password.chars().any(|c| c.is_ascii_lowercase()),
        has_numbers: password.chars().any(|c| c.is_ascii_digit()),
        has_special_char: password.chars().any(|c| SPECIAL_CHARS.contains(c)),
    };

    let strength = [
        requirements.min_length,
        requirements.has_upper_case,
        requirements.has_lower_case,
        requirements.has_numbers,
        requirements.has_special_char,
    ]
    .iter()
    .filter(|met| **met)
    .count() as u8;

    let mut feedback = Vec::new();
    if !requirements.min_length {
        feedback.push(format!("At least {} characters", min_length));
    }
    if !requirements.has_upper_case {
        feedback.push("One uppercase letter".to_string());
    }
    if !requirements.has_lower_case {
        feedback.push("One lowercase letter".to_string());
    }
    if !requirements.has_numbers {
        feedback.push("One number".to_string());
    }
    if !requirements.has_special_char {
        feedback.push("One special character".to_string());
    }

    StrengthReport {
        requirements,
        strength,
        is_strong: strength >= 4,
        feedback,
    }
}

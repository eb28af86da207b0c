//! Identity provider seam.
//!
//! Credential checks are delegated to an [`IdentityProvider`]. The
//! built-in [`StaticIdentityProvider`] verifies against accounts from the
//! configuration file using Argon2; deployments backed by a hosted
//! identity service implement the trait against that service instead.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::auth::password::{verify_password, LEGACY_PREFIX};
use crate::config::AuthConfig;

/// Account role. Unknown roles deserialize as `Guest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
    #[default]
    #[serde(other)]
    Guest,
}

impl Role {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "student" => Role::Student,
            _ => Role::Guest,
        }
    }
}

/// The authenticated principal stored in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub display_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Unknown account or wrong password; the two are not distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify `identifier` (username or email) and `password`.
    async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, IdentityError>;

    /// Change the display name of an account.
    async fn update_display_name(&self, user_id: &str, name: &str) -> Result<(), IdentityError>;

    /// Lockout key for `identifier`. Every alias of one account must map
    /// to the same key; unknown identifiers key on themselves.
    fn account_key(&self, identifier: &str) -> String {
        identifier.trim().to_lowercase()
    }
}

#[derive(Debug, Clone)]
struct StoredAccount {
    user: AuthenticatedUser,
    password_hash: String,
}

/// Accounts loaded from configuration, keyed by lowercased email.
pub struct StaticIdentityProvider {
    accounts: DashMap<String, StoredAccount>,
    legacy_salt: String,
}

impl StaticIdentityProvider {
    pub fn from_config(config: &AuthConfig) -> Self {
        let accounts = DashMap::new();
        for entry in &config.users {
            let email = entry.email.trim().to_lowercase();
            if entry.password_hash.starts_with(LEGACY_PREFIX) {
                tracing::warn!(
                    email = %email,
                    "Account uses a legacy SHA-256 credential; rehash with Argon2"
                );
            }
            let display_name = if entry.full_name.trim().is_empty() {
                entry.username.clone()
            } else {
                entry.full_name.clone()
            };
            accounts.insert(
                email.clone(),
                StoredAccount {
                    user: AuthenticatedUser {
                        id: email.clone(),
                        username: entry.username.trim().to_string(),
                        email,
                        role: Role::parse(&entry.role),
                        display_name,
                    },
                    password_hash: entry.password_hash.clone(),
                },
            );
        }
        Self {
            accounts,
            legacy_salt: config.legacy_salt.clone(),
        }
    }

    fn find(&self, identifier: &str) -> Option<StoredAccount> {
        let needle = identifier.trim().to_lowercase();
        if let Some(account) = self.accounts.get(&needle) {
            return Some(account.value().clone());
        }
        self.accounts
            .iter()
            .find(|a| a.user.username.to_lowercase() == needle)
            .map(|a| a.value().clone())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, IdentityError> {
        let Some(account) = self.find(identifier) else {
            return Err(IdentityError::InvalidCredentials);
        };

        // Argon2 is deliberately slow; keep it off the async workers.
        let salt = self.legacy_salt.clone();
        let password = password.to_string();
        let stored = account.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored, &salt))
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        if verified {
            Ok(account.user)
        } else {
            Err(IdentityError::InvalidCredentials)
        }
    }

    async fn update_display_name(&self, user_id: &str, name: &str) -> Result<(), IdentityError> {
        let key = user_id.trim().to_lowercase();
        match self.accounts.get_mut(&key) {
            Some(mut account) => {
                account.user.display_name = name.to_string();
                Ok(())
            }
            None => Err(IdentityError::UnknownUser(user_id.to_string())),
        }
    }

    fn account_key(&self, identifier: &str) -> String {
        match self.find(identifier) {
            Some(account) => account.user.id,
            None => identifier.trim().to_lowercase(),
        }
    }
}

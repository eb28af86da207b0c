//! Server-side session registry.
//!
//! A session is addressed by a random hex token handed to the client as a
//! bearer credential (the page's `userSession`). Sessions expire after a
//! period of inactivity; every successful validity check slides the expiry
//! forward. "Remember me" sessions use the longer configured timeout.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::auth::identity::AuthenticatedUser;
use crate::config::SessionConfig;
use crate::security::token::random_hex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(skip)]
    pub token: String,
    pub user: AuthenticatedUser,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// The page's `sessionExpiry`.
    pub expires_at: DateTime<Utc>,
    pub remember_me: bool,
}

pub struct SessionManager {
    sessions: DashMap<String, SessionRecord>,
    policy: ArcSwap<SessionConfig>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            policy: ArcSwap::from_pointee(config),
        }
    }

    /// Replace the timeouts. Live sessions pick them up on their next touch.
    pub fn set_policy(&self, config: SessionConfig) {
        self.policy.store(Arc::new(config));
    }

    fn timeout(&self, remember_me: bool) -> Duration {
        let policy = self.policy.load();
        let secs = if remember_me {
            policy.remember_me_timeout_secs
        } else {
            policy.timeout_secs
        };
        Duration::seconds(secs as i64)
    }

    pub fn start(&self, user: AuthenticatedUser, remember_me: bool) -> SessionRecord {
        self.start_at(user, remember_me, Utc::now())
    }

    pub fn start_at(
        &self,
        user: AuthenticatedUser,
        remember_me: bool,
        now: DateTime<Utc>,
    ) -> SessionRecord {
        let token = random_hex(self.policy.load().token_bytes);
        let record = SessionRecord {
            token: token.clone(),
            user,
            created_at: now,
            last_activity: now,
            expires_at: now + self.timeout(remember_me),
            remember_me,
        };
        self.sessions.insert(token, record.clone());
        tracing::debug!(user = %record.user.id, remember_me, "Session started");
        record
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.is_valid_at(token, Utc::now())
    }

    /// Expired sessions are removed; live ones have their activity refreshed.
    pub fn is_valid_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.session_at(token, now).is_some()
    }

    /// Look up and touch a session, returning a snapshot of it.
    pub fn session_at(&self, token: &str, now: DateTime<Utc>) -> Option<SessionRecord> {
        if token.is_empty() {
            return None;
        }
        if self
            .sessions
            .remove_if(token, |_, record| now >= record.expires_at)
            .is_some()
        {
            tracing::debug!("Session expired");
            return None;
        }

        let mut entry = self.sessions.get_mut(token)?;
        let timeout = self.timeout(entry.remember_me);
        entry.last_activity = now;
        entry.expires_at = now + timeout;
        Some(entry.clone())
    }

    pub fn session(&self, token: &str) -> Option<SessionRecord> {
        self.session_at(token, Utc::now())
    }

    pub fn touch(&self, token: &str) -> bool {
        self.is_valid(token)
    }

    pub fn current_user(&self, token: &str) -> Option<AuthenticatedUser> {
        self.session(token).map(|s| s.user)
    }

    /// Returns the ended session, if there was one.
    pub fn end(&self, token: &str) -> Option<SessionRecord> {
        self.sessions.remove(token).map(|(_, record)| record)
    }

    /// Refresh the cached display name in every session of `user_id`.
    pub fn update_display_name(&self, user_id: &str, name: &str) {
        for mut entry in self.sessions.iter_mut() {
            if entry.user.id == user_id {
                entry.user.display_name = name.to_string();
            }
        }
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        self.drain_expired_at(now).len()
    }

    /// Remove expired sessions and return their tokens.
    pub fn drain_expired_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut ended = Vec::new();
        self.sessions.retain(|token, record| {
            let live = now < record.expires_at;
            if !live {
                ended.push(token.clone());
            }
            live
        });
        ended
    }

    /// Whether `token` names a stored session. Does not touch it.
    pub fn contains(&self, token: &str) -> bool {
        self.sessions.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::Role;

    fn user() -> AuthenticatedUser {
        AuthenticatedUser {
            id: "student@philtech.edu.ph".into(),
            username: "student".into(),
            email: "student@philtech.edu.ph".into(),
            role: Role::Student,
            display_name: "John Student".into(),
        }
    }

    #[test]
    fn test_start_issues_hex_token() {
        let manager = SessionManager::new(SessionConfig::default());
        let session = manager.start(user(), false);
        assert_eq!(session.token.len(), 64);
        assert!(session.token.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(manager.is_valid(&session.token));
    }

    #[test]
    fn test_session_expires_after_inactivity() {
        let manager = SessionManager::new(SessionConfig::default());
        let t0 = Utc::now();
        let session = manager.start_at(user(), false, t0);

        assert!(manager.is_valid_at(&session.token, t0 + Duration::minutes(29)));
        // The check above slid the expiry forward.
        assert!(manager.is_valid_at(&session.token, t0 + Duration::minutes(58)));
        assert!(!manager.is_valid_at(&session.token, t0 + Duration::minutes(89)));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let manager = SessionManager::new(SessionConfig::default());
        let t0 = Utc::now();
        let session = manager.start_at(user(), false, t0);
        assert!(!manager.is_valid_at(&session.token, t0 + Duration::minutes(30)));
    }

    #[test]
    fn test_remember_me_uses_long_timeout() {
        let manager = SessionManager::new(SessionConfig::default());
        let t0 = Utc::now();
        let session = manager.start_at(user(), true, t0);
        assert!(manager.is_valid_at(&session.token, t0 + Duration::days(6)));
    }

    #[test]
    fn test_end_and_unknown_tokens() {
        let manager = SessionManager::new(SessionConfig::default());
        let session = manager.start(user(), false);
        assert!(manager.end(&session.token).is_some());
        assert!(!manager.is_valid(&session.token));
        assert!(manager.current_user("").is_none());
        assert!(manager.end("missing").is_none());
    }

    #[test]
    fn test_update_display_name_reaches_live_sessions() {
        let manager = SessionManager::new(SessionConfig::default());
        let session = manager.start(user(), false);
        manager.update_display_name("student@philtech.edu.ph", "Johnny");
        assert_eq!(
            manager.current_user(&session.token).unwrap().display_name,
            "Johnny"
        );
    }

    #[test]
    fn test_purge_expired() {
        let manager = SessionManager::new(SessionConfig::default());
        let t0 = Utc::now();
        manager.start_at(user(), false, t0);
        manager.start_at(user(), true, t0);
        assert_eq!(manager.purge_expired_at(t0 + Duration::hours(1)), 1);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_drain_expired_returns_tokens() {
        let manager = SessionManager::new(SessionConfig::default());
        let t0 = Utc::now();
        let short = manager.start_at(user(), false, t0);
        let long = manager.start_at(user(), true, t0);
        let ended = manager.drain_expired_at(t0 + Duration::hours(1));
        assert_eq!(ended, vec![short.token.clone()]);
        assert!(!manager.contains(&short.token));
        assert!(manager.contains(&long.token));
    }
}

//! Failed-login lockout tracking.
//!
//! Each identifier carries a failure count and the time of its last
//! failure. Reaching `max_attempts` locks the identifier until
//! `lockout_secs` have passed since that last failure; after that the
//! record clears itself. A successful login clears it immediately.
//!
//! The table is durable: it is written to a JSON file (top-level key
//! `loginAttempts`) and reloaded on startup.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::LockoutConfig;

/// Failure bookkeeping for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAttemptRecord {
    pub count: u32,
    pub last_attempt: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Default)]
struct LoginAttemptsFile {
    #[serde(rename = "loginAttempts", default)]
    login_attempts: HashMap<String, LoginAttemptRecord>,
}

pub struct LockoutTracker {
    records: DashMap<String, LoginAttemptRecord>,
    policy: ArcSwap<LockoutConfig>,
    persistence_path: Option<PathBuf>,
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

impl LockoutTracker {
    pub fn new(config: LockoutConfig) -> Self {
        let persistence_path = config.persistence_path.as_ref().map(PathBuf::from);
        Self {
            records: DashMap::new(),
            policy: ArcSwap::from_pointee(config),
            persistence_path,
        }
    }

    /// Create a tracker and load the persisted table if the file exists.
    pub fn load(config: LockoutConfig) -> std::io::Result<Self> {
        let tracker = Self::new(config);
        if let Some(path) = tracker.persistence_path.clone() {
            if path.exists() {
                tracker.load_from_file(&path)?;
            }
        }
        Ok(tracker)
    }

    fn load_from_file(&self, path: &Path) -> std::io::Result<()> {
        let reader = BufReader::new(File::open(path)?);
        let stored: LoginAttemptsFile = serde_json::from_reader(reader)?;
        for (id, record) in stored.login_attempts {
            self.records.insert(id, record);
        }
        tracing::info!(
            records = self.records.len(),
            path = ?path,
            "Loaded login attempt records"
        );
        Ok(())
    }

    /// Write the table to the configured file. No-op without a path.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let snapshot = LoginAttemptsFile {
            login_attempts: self
                .records
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect(),
        };
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &snapshot)?;
        tracing::debug!(records = snapshot.login_attempts.len(), "Saved login attempt records");
        Ok(())
    }

    pub fn set_policy(&self, config: LockoutConfig) {
        self.policy.store(Arc::new(config));
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.policy.load().lockout_secs as i64)
    }

    fn clear_if_elapsed(&self, key: &str, now: DateTime<Utc>) {
        let window = self.window();
        self.records
            .remove_if(key, |_, record| now - record.last_attempt > window);
    }

    pub fn record_attempt(&self, identifier: &str, success: bool) {
        self.record_attempt_at(identifier, success, Utc::now());
    }

    pub fn record_attempt_at(&self, identifier: &str, success: bool, now: DateTime<Utc>) {
        let key = normalize(identifier);
        if success {
            self.records.remove(&key);
            return;
        }

        self.clear_if_elapsed(&key, now);
        self.records
            .entry(key)
            .and_modify(|record| {
                record.count += 1;
                record.last_attempt = now;
            })
            .or_insert(LoginAttemptRecord {
                count: 1,
                last_attempt: now,
            });
    }

    pub fn try_begin_attempt(&self, identifier: &str) -> Result<(), u64> {
        self.try_begin_attempt_at(identifier, Utc::now())
    }

    /// Check the lockout and count a pending failure under one entry lock.
    ///
    /// Returns the seconds left on the lockout when the identifier is
    /// locked. Otherwise the attempt is counted as failed until
    /// [`record_attempt`](Self::record_attempt) clears it on success or
    /// [`release_attempt`](Self::release_attempt) hands it back.
    pub fn try_begin_attempt_at(&self, identifier: &str, now: DateTime<Utc>) -> Result<(), u64> {
        let window = self.window();
        let max = self.policy.load().max_attempts;
        let mut record = self
            .records
            .entry(normalize(identifier))
            .or_insert(LoginAttemptRecord {
                count: 0,
                last_attempt: now,
            });

        if now - record.last_attempt > window {
            record.count = 0;
        }
        if record.count >= max {
            let remaining = record.last_attempt + window - now;
            return Err(remaining.num_seconds().max(1) as u64);
        }
        record.count += 1;
        record.last_attempt = now;
        Ok(())
    }

    /// Undo a reservation whose outcome was neither success nor failure.
    pub fn release_attempt(&self, identifier: &str) {
        let key = normalize(identifier);
        if let Some(mut record) = self.records.get_mut(&key) {
            record.count = record.count.saturating_sub(1);
        }
        self.records.remove_if(&key, |_, record| record.count == 0);
    }

    pub fn is_locked_out(&self, identifier: &str) -> bool {
        self.is_locked_out_at(identifier, Utc::now())
    }

    pub fn is_locked_out_at(&self, identifier: &str, now: DateTime<Utc>) -> bool {
        let key = normalize(identifier);
        self.clear_if_elapsed(&key, now);
        let max = self.policy.load().max_attempts;
        self.records
            .get(&key)
            .map(|record| record.count >= max)
            .unwrap_or(false)
    }

    pub fn remaining_attempts(&self, identifier: &str) -> u32 {
        self.remaining_attempts_at(identifier, Utc::now())
    }

    pub fn remaining_attempts_at(&self, identifier: &str, now: DateTime<Utc>) -> u32 {
        let key = normalize(identifier);
        self.clear_if_elapsed(&key, now);
        let max = self.policy.load().max_attempts;
        match self.records.get(&key) {
            Some(record) => max.saturating_sub(record.count),
            None => max,
        }
    }

    /// Seconds until a locked identifier is released, `None` if not locked.
    pub fn remaining_lockout_secs_at(&self, identifier: &str, now: DateTime<Utc>) -> Option<u64> {
        if !self.is_locked_out_at(identifier, now) {
            return None;
        }
        let key = normalize(identifier);
        let record = self.records.get(&key)?;
        let remaining = record.last_attempt + self.window() - now;
        Some(remaining.num_seconds().max(1) as u64)
    }

    pub fn remaining_lockout_secs(&self, identifier: &str) -> Option<u64> {
        self.remaining_lockout_secs_at(identifier, Utc::now())
    }

    /// Drop every record whose window has elapsed.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let window = self.window();
        let before = self.records.len();
        self.records
            .retain(|_, record| now - record.last_attempt <= window);
        before.saturating_sub(self.records.len())
    }

    pub fn record(&self, identifier: &str) -> Option<LoginAttemptRecord> {
        self.records.get(&normalize(identifier)).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> LockoutTracker {
        LockoutTracker::new(LockoutConfig::default())
    }

    #[test]
    fn test_five_failures_lock_out() {
        let t = tracker();
        let now = Utc::now();
        for i in 0..4 {
            t.record_attempt_at("student", false, now);
            assert!(!t.is_locked_out_at("student", now), "locked after {} failures", i + 1);
        }
        t.record_attempt_at("student", false, now);
        assert!(t.is_locked_out_at("student", now));
        assert_eq!(t.remaining_attempts_at("student", now), 0);
    }

    #[test]
    fn test_success_clears_lockout() {
        let t = tracker();
        let now = Utc::now();
        for _ in 0..5 {
            t.record_attempt_at("student", false, now);
        }
        assert!(t.is_locked_out_at("student", now));
        t.record_attempt_at("student", true, now);
        assert!(!t.is_locked_out_at("student", now));
        assert_eq!(t.remaining_attempts_at("student", now), 5);
    }

    #[test]
    fn test_lockout_self_clears_after_window() {
        let t = tracker();
        let now = Utc::now();
        for _ in 0..5 {
            t.record_attempt_at("student", false, now);
        }
        let later = now + Duration::minutes(15) + Duration::seconds(1);
        assert!(!t.is_locked_out_at("student", later));
        assert!(t.record("student").is_none());
        assert_eq!(t.remaining_attempts_at("student", later), 5);
    }

    #[test]
    fn test_identifiers_are_case_insensitive() {
        let t = tracker();
        let now = Utc::now();
        for _ in 0..5 {
            t.record_attempt_at("Student@PhilTech.edu.ph", false, now);
        }
        assert!(t.is_locked_out_at("student@philtech.edu.ph", now));
    }

    #[test]
    fn test_remaining_lockout_secs() {
        let t = tracker();
        let now = Utc::now();
        assert!(t.remaining_lockout_secs_at("x", now).is_none());
        for _ in 0..5 {
            t.record_attempt_at("x", false, now);
        }
        let secs = t
            .remaining_lockout_secs_at("x", now + Duration::minutes(5))
            .unwrap();
        assert_eq!(secs, 600);
    }

    #[test]
    fn test_stale_failures_restart_count() {
        let t = tracker();
        let now = Utc::now();
        for _ in 0..4 {
            t.record_attempt_at("x", false, now);
        }
        let later = now + Duration::minutes(20);
        t.record_attempt_at("x", false, later);
        assert_eq!(t.record("x").unwrap().count, 1);
    }

    #[test]
    fn test_begin_attempt_reserves_until_locked() {
        let t = tracker();
        let now = Utc::now();
        for _ in 0..5 {
            assert!(t.try_begin_attempt_at("student", now).is_ok());
        }
        assert_eq!(t.try_begin_attempt_at("student", now), Err(900));
        assert_eq!(t.record("student").unwrap().count, 5);

        let later = now + Duration::minutes(16);
        assert!(t.try_begin_attempt_at("student", later).is_ok());
        assert_eq!(t.record("student").unwrap().count, 1);
    }

    #[test]
    fn test_release_attempt_returns_reservation() {
        let t = tracker();
        let now = Utc::now();
        t.try_begin_attempt_at("student", now).unwrap();
        t.try_begin_attempt_at("student", now).unwrap();
        t.release_attempt("student");
        assert_eq!(t.record("student").unwrap().count, 1);
        t.release_attempt("student");
        assert!(t.record("student").is_none());
    }

    #[test]
    fn test_purge_expired() {
        let t = tracker();
        let now = Utc::now();
        t.record_attempt_at("old", false, now - Duration::minutes(30));
        t.record_attempt_at("new", false, now);
        assert_eq!(t.purge_expired_at(now), 1);
        assert!(t.record("new").is_some());
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "form_guard_lockout_{}.json",
            uuid::Uuid::new_v4()
        ));
        let config = LockoutConfig {
            persistence_path: Some(path.to_string_lossy().into_owned()),
            ..LockoutConfig::default()
        };

        let t = LockoutTracker::new(config.clone());
        for _ in 0..5 {
            t.record_attempt("admin", false);
        }
        t.save().unwrap();

        let loaded = LockoutTracker::load(config).unwrap();
        assert!(loaded.is_locked_out("admin"));

        std::fs::remove_file(&path).unwrap_or_default();
    }
}

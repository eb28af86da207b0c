//! Sliding-window rate limiting keyed by client fingerprint.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Result of a limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Denied { retry_after_secs: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

/// Attempt timestamps per client, oldest first.
pub struct RateLimiter {
    attempts: DashMap<String, VecDeque<Instant>>,
    policy: ArcSwap<RateLimitConfig>,
}

fn evict(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while let Some(oldest) = window.front() {
        if now.saturating_duration_since(*oldest) >= span {
            window.pop_front();
        } else {
            break;
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            attempts: DashMap::new(),
            policy: ArcSwap::from_pointee(config),
        }
    }

    /// Replace the policy. Recorded attempts are kept.
    pub fn set_policy(&self, config: RateLimitConfig) {
        self.policy.store(Arc::new(config));
    }

    pub fn policy(&self) -> Arc<RateLimitConfig> {
        self.policy.load_full()
    }

    pub fn check_limit(&self, id: &str) -> RateLimitDecision {
        self.check_limit_at(id, Instant::now())
    }

    /// Count attempts inside the trailing window ending at `now`. Denies
    /// once the count reaches the maximum; otherwise records the attempt.
    pub fn check_limit_at(&self, id: &str, now: Instant) -> RateLimitDecision {
        let policy = self.policy.load();
        if !policy.enabled {
            return RateLimitDecision::Allowed;
        }
        let span = Duration::from_secs(policy.window_secs);

        // The entry guard holds the shard lock, so count-then-record is
        // atomic per client.
        let mut window = self.attempts.entry(id.to_string()).or_default();
        evict(&mut window, now, span);

        if window.len() >= policy.max_attempts {
            let oldest = window.front().copied().unwrap_or(now);
            let remaining = span.saturating_sub(now.saturating_duration_since(oldest));
            return RateLimitDecision::Denied {
                retry_after_secs: ceil_secs(remaining).max(1),
            };
        }

        window.push_back(now);
        RateLimitDecision::Allowed
    }

    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    /// Drop clients with no attempts left in the window. Returns how many
    /// were removed.
    pub fn cleanup_at(&self, now: Instant) -> usize {
        let span = Duration::from_secs(self.policy.load().window_secs);
        let before = self.attempts.len();
        self.attempts.retain(|_, window| {
            evict(window, now, span);
            !window.is_empty()
        });
        before.saturating_sub(self.attempts.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateLimitConfig::default())
    }

    #[test]
    fn test_allows_up_to_max_then_denies() {
        let limiter = limiter();
        let t0 = Instant::now();

        for i in 0..3 {
            let decision = limiter.check_limit_at("client", t0 + Duration::from_secs(i));
            assert_eq!(decision, RateLimitDecision::Allowed);
        }

        match limiter.check_limit_at("client", t0 + Duration::from_secs(10)) {
            RateLimitDecision::Denied { retry_after_secs } => assert_eq!(retry_after_secs, 50),
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[test]
    fn test_allows_again_after_window() {
        let limiter = limiter();
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_limit_at("client", t0).is_allowed());
        }
        assert!(!limiter.check_limit_at("client", t0).is_allowed());
        assert!(limiter
            .check_limit_at("client", t0 + Duration::from_secs(60))
            .is_allowed());
    }

    #[test]
    fn test_denied_attempts_are_not_recorded() {
        let limiter = limiter();
        let t0 = Instant::now();
        for _ in 0..3 {
            limiter.check_limit_at("client", t0);
        }
        for s in 1..30 {
            assert!(!limiter
                .check_limit_at("client", t0 + Duration::from_secs(s))
                .is_allowed());
        }
        assert!(limiter
            .check_limit_at("client", t0 + Duration::from_secs(61))
            .is_allowed());
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter();
        let t0 = Instant::now();
        for _ in 0..3 {
            limiter.check_limit_at("a", t0);
        }
        assert!(!limiter.check_limit_at("a", t0).is_allowed());
        assert!(limiter.check_limit_at("b", t0).is_allowed());
    }

    #[test]
    fn test_cleanup_drops_idle_clients() {
        let limiter = limiter();
        let t0 = Instant::now();
        limiter.check_limit_at("old", t0);
        limiter.check_limit_at("fresh", t0 + Duration::from_secs(50));

        let removed = limiter.cleanup_at(t0 + Duration::from_secs(70));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_disabled_policy_allows_everything() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        });
        let t0 = Instant::now();
        for _ in 0..10 {
            assert!(limiter.check_limit_at("client", t0).is_allowed());
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_policy_swap_takes_effect() {
        let limiter = limiter();
        let t0 = Instant::now();
        for _ in 0..3 {
            limiter.check_limit_at("client", t0);
        }
        limiter.set_policy(RateLimitConfig {
            max_attempts: 5,
            ..RateLimitConfig::default()
        });
        assert!(limiter.check_limit_at("client", t0).is_allowed());
    }
}

//! Submission lifecycle state machine.
//!
//! ```text
//! Idle → Validating → Blocked
//!                   → Rejected
//!                   → Sending → Sent   ─┐
//!                             → Failed ─┴→ Idle (after the revert delay)
//! ```
//!
//! Blocked and Rejected are terminal for the attempt; the caller may start
//! a new one straight away. Nothing is retried automatically.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::relay::RelayReceipt;
use crate::security::FieldError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Validating,
    Blocked { retry_after_secs: u64 },
    Rejected { errors: Vec<FieldError> },
    Sending,
    Sent { receipt: RelayReceipt },
    Failed { reason: String },
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Validating => "validating",
            SubmissionState::Blocked { .. } => "blocked",
            SubmissionState::Rejected { .. } => "rejected",
            SubmissionState::Sending => "sending",
            SubmissionState::Sent { .. } => "sent",
            SubmissionState::Failed { .. } => "failed",
        }
    }

    fn reverts(&self) -> bool {
        matches!(self, SubmissionState::Sent { .. } | SubmissionState::Failed { .. })
    }

    fn can_move_to(&self, next: &SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Blocked { .. }, Validating)
                | (Rejected { .. }, Validating)
                | (Validating, Blocked { .. })
                | (Validating, Rejected { .. })
                | (Validating, Sending)
                | (Sending, Sent { .. })
                | (Sending, Failed { .. })
                | (Sent { .. }, Idle)
                | (Failed { .. }, Idle)
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid submission transition from {from} to {to}")]
pub struct SubmissionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// One form instance moving through the lifecycle.
#[derive(Debug, Clone)]
pub struct Submission {
    state: SubmissionState,
    entered_at: Instant,
    revert_after: Duration,
}

impl Submission {
    pub fn new(revert_after: Duration) -> Self {
        Self {
            state: SubmissionState::Idle,
            entered_at: Instant::now(),
            revert_after,
        }
    }

    pub fn revert_after(&self) -> Duration {
        self.revert_after
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// The state as observed at `now`, applying the automatic revert.
    pub fn state_at(&mut self, now: Instant) -> &SubmissionState {
        if self.state.reverts() && now.saturating_duration_since(self.entered_at) >= self.revert_after {
            self.state = SubmissionState::Idle;
            self.entered_at = now;
        }
        &self.state
    }

    pub fn transition(&mut self, next: SubmissionState) -> Result<(), SubmissionError> {
        self.transition_at(next, Instant::now())
    }

    pub fn transition_at(&mut self, next: SubmissionState, now: Instant) -> Result<(), SubmissionError> {
        self.state_at(now);
        if !self.state.can_move_to(&next) {
            return Err(SubmissionError {
                from: self.state.name(),
                to: next.name(),
            });
        }
        tracing::trace!(from = self.state.name(), to = next.name(), "Submission transition");
        self.state = next;
        self.entered_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> RelayReceipt {
        RelayReceipt {
            status: 200,
            text: "OK".into(),
        }
    }

    #[test]
    fn test_happy_path_reverts_after_delay() {
        let t0 = Instant::now();
        let mut s = Submission::new(Duration::from_secs(5));
        s.transition_at(SubmissionState::Validating, t0).unwrap();
        s.transition_at(SubmissionState::Sending, t0).unwrap();
        s.transition_at(SubmissionState::Sent { receipt: receipt() }, t0).unwrap();

        assert_eq!(s.state_at(t0 + Duration::from_secs(4)).name(), "sent");
        assert_eq!(s.state_at(t0 + Duration::from_secs(5)), &SubmissionState::Idle);
    }

    #[test]
    fn test_failed_also_reverts() {
        let t0 = Instant::now();
        let mut s = Submission::new(Duration::from_secs(5));
        s.transition_at(SubmissionState::Validating, t0).unwrap();
        s.transition_at(SubmissionState::Sending, t0).unwrap();
        s.transition_at(SubmissionState::Failed { reason: "down".into() }, t0)
            .unwrap();
        assert_eq!(s.state_at(t0 + Duration::from_secs(6)), &SubmissionState::Idle);
    }

    #[test]
    fn test_cannot_skip_validation() {
        let mut s = Submission::new(Duration::from_secs(5));
        let err = s.transition(SubmissionState::Sending).unwrap_err();
        assert_eq!(err.from, "idle");
        assert_eq!(err.to, "sending");
    }

    #[test]
    fn test_no_resubmit_while_sent() {
        let t0 = Instant::now();
        let mut s = Submission::new(Duration::from_secs(5));
        s.transition_at(SubmissionState::Validating, t0).unwrap();
        s.transition_at(SubmissionState::Sending, t0).unwrap();
        s.transition_at(SubmissionState::Sent { receipt: receipt() }, t0).unwrap();
        assert!(s
            .transition_at(SubmissionState::Validating, t0 + Duration::from_secs(1))
            .is_err());
        // Once reverted a new attempt may begin.
        assert!(s
            .transition_at(SubmissionState::Validating, t0 + Duration::from_secs(5))
            .is_ok());
    }

    #[test]
    fn test_rejected_allows_immediate_retry() {
        let mut s = Submission::new(Duration::from_secs(5));
        s.transition(SubmissionState::Validating).unwrap();
        s.transition(SubmissionState::Rejected { errors: vec![] }).unwrap();
        assert!(s.transition(SubmissionState::Validating).is_ok());
    }
}

//! Security subsystem: the sanitizer, validator and submission gate.
//!
//! # Data Flow
//! ```text
//! Incoming form fields:
//!     → sanitize.rs (strip blocklisted markup, escape, per-kind cleanup)
//!     → validate.rs (field shape predicates)
//!     → csrf.rs (one live token per scope)
//!     → rate_limit.rs (sliding window per fingerprint.rs client id)
//!     → lockout.rs (login only: failure counting per identifier)
//!     → Pass to relay
//! ```
//!
//! # Design Decisions
//! - Escaping is the real XSS defense; the blocklist is a pre-filter
//! - Stores are owned objects, not globals, so instances are isolated
//! - Per-key updates go through DashMap entry guards

pub mod csrf;
pub mod fingerprint;
pub mod headers;
pub mod lockout;
pub mod rate_limit;
pub mod sanitize;
pub mod token;
pub mod validate;

pub use csrf::CsrfGuard;
pub use fingerprint::ClientHints;
pub use lockout::{LockoutTracker, LoginAttemptRecord};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use sanitize::{sanitize, FieldKind};
pub use validate::{FieldError, InputValidator};

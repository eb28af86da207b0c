//! Request pipelines built on the security, auth and relay stages.
//!
//! # Data Flow
//! ```text
//! contact.rs: sanitize → validate → CSRF → rate limit → email relay
//! login.rs:   sanitize → validate → lockout → identity provider → session
//! submission.rs tracks where a contact attempt ended up
//! ```

pub mod contact;
pub mod login;
pub mod submission;

pub use contact::{submit_contact, ContactContext, ContactOutcome, ContactSubmission};
pub use login::{login, logout, LoginOutcome, LoginRequest};
pub use submission::{Submission, SubmissionError, SubmissionState};

//! Student dashboard reads and writes.
//!
//! # Data Flow
//! ```text
//! Authenticated request (session bearer token)
//!     → feed.rs (announcements, schedule, recent activity)
//!     → grades.rs (grades with bands, grade requests)
//!     → profile.rs (display name, theme preference)
//!     → DocumentStore collections:
//!         announcements, grades, gradeRequests, schedule,
//!         activity, users, preferences
//! ```
//!
//! # Design Decisions
//! - Documents stay schemaless; views pick out the fields they need
//! - Timestamps are RFC 3339 UTC strings so they sort as text

pub mod feed;
pub mod grades;
pub mod profile;

use crate::auth::IdentityError;
use crate::relay::{Document, DocumentError};
use crate::security::FieldError;

pub use feed::{load_activity, load_announcements, load_schedule, time_ago, ActivityItem, ScheduleView};
pub use grades::{
    classify_grade, latest_grade_request, load_grades, request_grade, GradeBand, GradeEntry,
    GradeRequestStatus, GradeSummary,
};
pub use profile::{load_theme, set_theme, update_profile};

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Documents(#[from] DocumentError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("a grade request is already pending")]
    RequestPending,

    #[error("invalid input")]
    Invalid(Vec<FieldError>),
}

pub(crate) fn now_rfc3339(now: chrono::DateTime<chrono::Utc>) -> String {
    now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// The fields of a JSON object; anything else yields an empty document.
pub(crate) fn into_document(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Document::new(),
    }
}

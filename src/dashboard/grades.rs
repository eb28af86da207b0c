//! Grades and grade requests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::AuthenticatedUser;
use crate::dashboard::{into_document, now_rfc3339, DashboardError};
use crate::relay::{DocumentQuery, DocumentStore, SortOrder, StoredDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GradeBand {
    Excellent,
    Good,
    Average,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

pub fn classify_grade(grade: f64) -> GradeBand {
    if grade >= 90.0 {
        GradeBand::Excellent
    } else if grade >= 80.0 {
        GradeBand::Good
    } else if grade >= 75.0 {
        GradeBand::Average
    } else {
        GradeBand::NeedsImprovement
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeEntry {
    pub id: String,
    pub course: String,
    pub grade: f64,
    pub band: GradeBand,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub grades: Vec<GradeEntry>,
    /// Rounded mean, absent when there are no grades.
    pub average: Option<i64>,
}

/// Numbers and numeric strings are accepted; anything else counts as 0.
fn grade_value(doc: &StoredDocument) -> f64 {
    match doc.field("grade") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Newest first. `limit` is used for the overview's quick view.
pub async fn load_grades(
    documents: &dyn DocumentStore,
    user_id: &str,
    limit: Option<usize>,
) -> Result<GradeSummary, DashboardError> {
    let mut query = DocumentQuery::collection("grades")
        .where_eq("userId", user_id)
        .order_by("createdAt", SortOrder::Descending);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    let grades: Vec<GradeEntry> = documents
        .query(&query)
        .await?
        .into_iter()
        .map(|doc| {
            let grade = grade_value(&doc);
            GradeEntry {
                course: doc
                    .field("course")
                    .and_then(Value::as_str)
                    .unwrap_or("General Grade")
                    .to_string(),
                grade,
                band: classify_grade(grade),
                created_at: doc
                    .field("createdAt")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                id: doc.id,
            }
        })
        .collect();

    let average = if grades.is_empty() {
        None
    } else {
        let total: f64 = grades.iter().map(|g| g.grade).sum();
        Some((total / grades.len() as f64).round() as i64)
    };
    Ok(GradeSummary { grades, average })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequestStatus {
    pub id: String,
    pub status: String,
    pub requested_at: Option<String>,
}

pub async fn latest_grade_request(
    documents: &dyn DocumentStore,
    user_id: &str,
) -> Result<Option<GradeRequestStatus>, DashboardError> {
    let query = DocumentQuery::collection("gradeRequests")
        .where_eq("userId", user_id)
        .order_by("requestedAt", SortOrder::Descending)
        .limit(1);
    Ok(documents.query(&query).await?.into_iter().next().map(|doc| {
        GradeRequestStatus {
            status: doc
                .field("status")
                .and_then(Value::as_str)
                .unwrap_or("pending")
                .to_string(),
            requested_at: doc
                .field("requestedAt")
                .and_then(Value::as_str)
                .map(str::to_string),
            id: doc.id,
        }
    }))
}

/// File a new grade request. Refused while the latest one is pending.
pub async fn request_grade(
    documents: &dyn DocumentStore,
    user: &AuthenticatedUser,
    now: DateTime<Utc>,
) -> Result<GradeRequestStatus, DashboardError> {
    if let Some(latest) = latest_grade_request(documents, &user.id).await? {
        if latest.status == "pending" {
            return Err(DashboardError::RequestPending);
        }
    }

    let student_name = if user.display_name.trim().is_empty() {
        user.email.split('@').next().unwrap_or_default().to_string()
    } else {
        user.display_name.clone()
    };
    let requested_at = now_rfc3339(now);
    let data = into_document(json!({
        "userId": user.id,
        "studentName": student_name,
        "studentEmail": user.email,
        "status": "pending",
        "requestedAt": requested_at,
    }));

    let id = documents.add("gradeRequests", data).await?;
    tracing::info!(user = %user.id, request = %id, "Grade request filed");
    Ok(GradeRequestStatus {
        id,
        status: "pending".to_string(),
        requested_at: Some(requested_at),
    })
}

//! Announcements, schedule and activity feed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::dashboard::DashboardError;
use crate::relay::{DocumentQuery, DocumentStore, SortOrder, StoredDocument};

const ANNOUNCEMENT_LIMIT: usize = 5;
const ACTIVITY_LIMIT: usize = 5;

pub async fn load_announcements(
    documents: &dyn DocumentStore,
) -> Result<Vec<StoredDocument>, DashboardError> {
    let query = DocumentQuery::collection("announcements")
        .order_by("createdAt", SortOrder::Descending)
        .limit(ANNOUNCEMENT_LIMIT);
    Ok(documents.query(&query).await?)
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleView {
    pub current: StoredDocument,
    pub history: Vec<StoredDocument>,
}

/// The entry flagged `isCurrent`, falling back to the newest upload.
pub async fn load_schedule(
    documents: &dyn DocumentStore,
) -> Result<Option<ScheduleView>, DashboardError> {
    let query = DocumentQuery::collection("schedule").order_by("uploadedAt", SortOrder::Descending);
    let mut history = documents.query(&query).await?;
    if history.is_empty() {
        return Ok(None);
    }

    let index = history
        .iter()
        .position(|doc| doc.field("isCurrent") == Some(&Value::Bool(true)))
        .unwrap_or(0);
    let current = history.remove(index);
    Ok(Some(ScheduleView { current, history }))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub time_ago: String,
}

fn text_field(doc: &StoredDocument, name: &str, fallback: &str) -> String {
    doc.field(name)
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

/// Human label for how long ago `then` was.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    match seconds {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{} minutes ago", s / 60),
        s if s < 86_400 => format!("{} hours ago", s / 3_600),
        s if s < 604_800 => format!("{} days ago", s / 86_400),
        _ => then.format("%-m/%-d/%Y").to_string(),
    }
}

pub async fn load_activity(
    documents: &dyn DocumentStore,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<ActivityItem>, DashboardError> {
    let query = DocumentQuery::collection("activity")
        .where_eq("userId", user_id)
        .order_by("timestamp", SortOrder::Descending)
        .limit(ACTIVITY_LIMIT);

    let items = documents
        .query(&query)
        .await?
        .into_iter()
        .map(|doc| {
            let at = doc
                .field("timestamp")
                .and_then(Value::as_str)
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|ts| ts.with_timezone(&Utc))
                .unwrap_or(now);
            ActivityItem {
                kind: text_field(&doc, "type", "activity"),
                title: text_field(&doc, "title", "Activity"),
                description: text_field(&doc, "description", ""),
                time_ago: time_ago(at, now),
                id: doc.id,
            }
        })
        .collect();
    Ok(items)
}

//! Student dashboard endpoints. All routes run behind the session layer.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::dashboard::{
    latest_grade_request, load_activity, load_announcements, load_grades, load_schedule,
    load_theme, request_grade, set_theme, update_profile, ActivityItem, GradeRequestStatus,
    GradeSummary,
};
use crate::http::middleware::CurrentSession;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::relay::StoredDocument;

pub async fn announcements(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredDocument>>, ApiError> {
    Ok(Json(load_announcements(state.guard.documents.as_ref()).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct GradesQuery {
    pub limit: Option<usize>,
}

pub async fn grades(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Query(query): Query<GradesQuery>,
) -> Result<Json<GradeSummary>, ApiError> {
    let summary = load_grades(state.guard.documents.as_ref(), &current.user.id, query.limit).await?;
    Ok(Json(summary))
}

pub async fn schedule(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let view = load_schedule(state.guard.documents.as_ref()).await?;
    Ok(Json(json!({ "schedule": view })))
}

pub async fn activity(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<Vec<ActivityItem>>, ApiError> {
    let items = load_activity(state.guard.documents.as_ref(), &current.user.id, Utc::now()).await?;
    Ok(Json(items))
}

pub async fn latest_request(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<Value>, ApiError> {
    let latest = latest_grade_request(state.guard.documents.as_ref(), &current.user.id).await?;
    Ok(Json(json!({ "request": latest })))
}

pub async fn create_request(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<GradeRequestStatus>, ApiError> {
    let created = request_grade(state.guard.documents.as_ref(), &current.user, Utc::now()).await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: String,
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Value>, ApiError> {
    let user = update_profile(&state.guard, &current.user, &update.display_name, Utc::now()).await?;
    Ok(Json(json!({ "user": user })))
}

#[derive(Debug, Deserialize)]
pub struct ThemeUpdate {
    pub dark: bool,
}

pub async fn theme(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<Value>, ApiError> {
    let dark = load_theme(state.guard.documents.as_ref(), &current.user.id).await?;
    Ok(Json(json!({ "dark": dark })))
}

pub async fn set_theme_preference(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(update): Json<ThemeUpdate>,
) -> Result<Json<Value>, ApiError> {
    set_theme(state.guard.documents.as_ref(), &current.user.id, update.dark).await?;
    Ok(Json(json!({ "dark": update.dark })))
}

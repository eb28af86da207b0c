//! API error responses.
//!
//! Every failure leaves the service as JSON with an `error` message.
//! Field-scoped failures add a `fields` array, and timed denials add
//! `retryAfterSecs` plus a `Retry-After` header.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::auth::IdentityError;
use crate::dashboard::DashboardError;
use crate::pipeline::contact::INVALID_MESSAGE;
use crate::security::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{}", INVALID_MESSAGE)]
    Invalid(Vec<FieldError>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    InvalidCredentials { remaining_attempts: u32, message: String },

    #[error("{message}")]
    LockedOut { retry_after_secs: u64, message: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) | Self::InvalidCredentials { .. } => StatusCode::UNAUTHORIZED,
            Self::LockedOut { .. } => StatusCode::LOCKED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.to_string() });
        let mut retry_after = None;

        match &self {
            Self::Invalid(errors) => body["fields"] = json!(errors),
            Self::InvalidCredentials {
                remaining_attempts, ..
            } => body["remainingAttempts"] = json!(remaining_attempts),
            Self::LockedOut {
                retry_after_secs, ..
            } => {
                body["retryAfterSecs"] = json!(retry_after_secs);
                retry_after = Some(*retry_after_secs);
            }
            Self::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal error");
                body = json!({ "error": "Internal server error" });
            }
            _ => {}
        }

        let mut response = (status, Json::<Value>(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Invalid(errors) => Self::Invalid(errors),
            DashboardError::RequestPending => {
                Self::Conflict("You already have a pending grade request.".to_string())
            }
            DashboardError::Identity(IdentityError::Unavailable(detail)) => {
                tracing::warn!(detail = %detail, "Identity provider unavailable");
                Self::Unavailable("Service temporarily unavailable. Please try again.".to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_lists_fields() {
        let response =
            ApiError::Invalid(vec![FieldError::new("email", "Please enter a valid email address")])
                .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["fields"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_locked_out_sets_retry_after() {
        let response = ApiError::LockedOut {
            retry_after_secs: 840,
            message: "locked".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::LOCKED);
        assert_eq!(response.headers()[header::RETRY_AFTER], "840");
        assert_eq!(body_json(response).await["retryAfterSecs"], 840);
    }

    #[tokio::test]
    async fn test_internal_hides_detail() {
        let response = ApiError::Internal("snapshot write failed".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Internal server error");
    }

    #[test]
    fn test_pending_request_is_conflict() {
        let err: ApiError = DashboardError::RequestPending.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}

//! `POST /api/contact`

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::http::handlers::csrf_scope;
use crate::http::request::{header_value, ClientContext};
use crate::http::server::AppState;
use crate::pipeline::{submit_contact, ContactContext, ContactOutcome, ContactSubmission, SubmissionState};
use crate::security::csrf::CSRF_HEADER;

pub async fn submit(
    State(state): State<AppState>,
    client: ClientContext,
    headers: HeaderMap,
    Json(form): Json<ContactSubmission>,
) -> Response {
    let ctx = ContactContext {
        csrf_scope: csrf_scope(&state.guard, &headers, &client),
        csrf_header: header_value(&headers, CSRF_HEADER),
        client_id: client.client_id,
        user_agent: client.user_agent,
        page: client.page,
    };

    let outcome = submit_contact(&state.guard, form, &ctx).await;
    tracing::debug!(request_id = %client.request_id, state = outcome.state.name(), "Contact submission finished");
    outcome_response(outcome)
}

/// Relay failure details stay in the logs; the caller gets the message.
fn outcome_response(outcome: ContactOutcome) -> Response {
    let mut body = json!({
        "state": outcome.state.name(),
        "message": outcome.message,
        "csrfToken": outcome.csrf_token,
    });
    if let Some(secs) = outcome.revert_after_secs {
        body["revertAfterSecs"] = json!(secs);
    }

    let mut retry_after = None;
    let status = match &outcome.state {
        SubmissionState::Sent { receipt } => {
            body["relayStatus"] = json!(receipt.status);
            StatusCode::OK
        }
        SubmissionState::Rejected { errors } => {
            body["fields"] = json!(errors);
            if outcome.is_csrf_failure() {
                StatusCode::FORBIDDEN
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
        SubmissionState::Blocked { retry_after_secs } => {
            body["retryAfterSecs"] = json!(retry_after_secs);
            retry_after = Some(*retry_after_secs);
            StatusCode::TOO_MANY_REQUESTS
        }
        SubmissionState::Failed { .. } => StatusCode::BAD_GATEWAY,
        SubmissionState::Idle | SubmissionState::Validating | SubmissionState::Sending => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let mut response = (status, Json(body)).into_response();
    if let Some(secs) = retry_after {
        if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
    }
    response
}

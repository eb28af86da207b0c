//! Contact form pipeline.
//!
//! Runs one submission through Sanitize → Validate → Gate → Relay and
//! reports the lifecycle state it ended in. The CSRF token for the
//! caller's scope is rotated on every attempt whatever the outcome.

use std::time::{Duration, Instant};

use chrono::Local;
use serde::Deserialize;

use crate::observability::metrics;
use crate::pipeline::submission::{Submission, SubmissionState};
use crate::relay::TemplateParams;
use crate::security::{sanitize, FieldError, FieldKind, RateLimitDecision};
use crate::state::GuardState;

/// Body field carrying the CSRF token when it is not sent as a header.
pub const CSRF_FIELD: &str = "csrf_token";

pub const CSRF_INVALID_MESSAGE: &str = "Security token invalid. Please refresh and try again.";
pub const SENT_MESSAGE: &str =
    "Thank you! Your inquiry has been sent. We'll get back to you soon.";
pub const FAILED_MESSAGE: &str =
    "Failed to send message. Please try again or contact us directly.";
pub const INVALID_MESSAGE: &str = "Please correct the highlighted fields.";

const USER_AGENT_LIMIT: usize = 50;

/// Raw contact form fields as posted by the page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub program: String,
    pub message: String,
    pub phone: Option<String>,
    pub csrf_token: Option<String>,
}

/// Who is submitting.
#[derive(Debug, Clone)]
pub struct ContactContext {
    /// Rate-limit key (the page's `clientId`).
    pub client_id: String,
    /// Scope the CSRF token is bound to.
    pub csrf_scope: String,
    /// Token from the `x-csrf-token` header, preferred over the body field.
    pub csrf_header: Option<String>,
    pub user_agent: String,
    pub page: String,
}

#[derive(Debug, Clone)]
pub struct ContactOutcome {
    pub state: SubmissionState,
    pub message: String,
    /// Replacement token for the next attempt.
    pub csrf_token: String,
    /// Seconds until a sent or failed form returns to idle.
    pub revert_after_secs: Option<u64>,
}

impl ContactOutcome {
    pub fn is_csrf_failure(&self) -> bool {
        matches!(&self.state, SubmissionState::Rejected { errors }
            if errors.iter().any(|e| e.field == CSRF_FIELD))
    }
}

/// Sanitized copy of the form, as handed to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanContact {
    pub name: String,
    pub email: String,
    pub program: String,
    pub message: String,
    pub phone: Option<String>,
}

pub fn sanitize_contact(form: &ContactSubmission) -> CleanContact {
    CleanContact {
        name: sanitize(&form.name, FieldKind::Name),
        email: sanitize(&form.email, FieldKind::Email),
        program: form.program.trim().to_string(),
        message: sanitize(&form.message, FieldKind::Text),
        phone: form
            .phone
            .as_deref()
            .map(|p| sanitize(p, FieldKind::Text))
            .filter(|p| !p.is_empty()),
    }
}

/// Every field error, in form order.
pub fn validate_contact(state: &GuardState, form: &CleanContact) -> Vec<FieldError> {
    let validator = state.validator();
    let mut errors = Vec::new();
    if !validator.is_valid_name(&form.name) {
        errors.push(FieldError::new("name", validator.name_message()));
    }
    if !validator.is_valid_email(&form.email) {
        errors.push(FieldError::new("email", "Please enter a valid email address"));
    }
    if !validator.is_valid_program(&form.program) {
        errors.push(FieldError::new(
            "program",
            "Please select a valid program or service",
        ));
    }
    if !validator.is_valid_message(&form.message) {
        errors.push(FieldError::new("message", validator.message_message()));
    }
    if let Some(phone) = &form.phone {
        if !validator.is_valid_phone(phone) {
            errors.push(FieldError::new("phone", "Please enter a valid phone number"));
        }
    }
    errors
}

fn template_params(form: &CleanContact, user_agent: &str) -> TemplateParams {
    let mut params = TemplateParams::new();
    params.insert("name".into(), form.name.clone());
    params.insert("email".into(), form.email.clone());
    params.insert("program".into(), form.program.clone());
    params.insert("message".into(), form.message.clone());
    params.insert(
        "date".into(),
        Local::now().format("%A, %B %-d, %Y at %-I:%M %p").to_string(),
    );
    params.insert("ip".into(), "hidden".into());
    params.insert(
        "userAgent".into(),
        user_agent.chars().take(USER_AGENT_LIMIT).collect(),
    );
    if let Some(phone) = &form.phone {
        params.insert("phone".into(), phone.clone());
    }
    params
}

/// Run one contact submission to completion.
pub async fn submit_contact(
    state: &GuardState,
    form: ContactSubmission,
    ctx: &ContactContext,
) -> ContactOutcome {
    let config = state.config();
    let mut submission = Submission::new(Duration::from_secs(config.submission.revert_delay_secs));

    let submitted_token = ctx
        .csrf_header
        .clone()
        .or_else(|| form.csrf_token.clone())
        .unwrap_or_default();

    // Idle → Validating always succeeds on a fresh submission.
    let _ = submission.transition(SubmissionState::Validating);

    let clean = sanitize_contact(&form);
    let errors = validate_contact(state, &clean);

    let (next, message) = if !errors.is_empty() {
        tracing::debug!(client = %ctx.client_id, fields = errors.len(), "Contact form rejected");
        metrics::record_submission("invalid");
        (SubmissionState::Rejected { errors }, INVALID_MESSAGE.to_string())
    } else if !state.csrf.validate_token(&ctx.csrf_scope, &submitted_token) {
        tracing::warn!(client = %ctx.client_id, "Contact form CSRF check failed");
        metrics::record_submission("csrf_rejected");
        (
            SubmissionState::Rejected {
                errors: vec![FieldError::new(CSRF_FIELD, CSRF_INVALID_MESSAGE)],
            },
            CSRF_INVALID_MESSAGE.to_string(),
        )
    } else {
        match state.rate_limiter.check_limit(&ctx.client_id) {
            RateLimitDecision::Denied { retry_after_secs } => {
                tracing::info!(client = %ctx.client_id, retry_after_secs, "Contact form rate limited");
                metrics::record_rate_limited();
                metrics::record_submission("rate_limited");
                (
                    SubmissionState::Blocked { retry_after_secs },
                    format!("Too many requests. Please wait {} seconds.", retry_after_secs),
                )
            }
            RateLimitDecision::Allowed => relay(state, &mut submission, &clean, ctx).await,
        }
    };

    if let Err(e) = submission.transition(next.clone()) {
        tracing::error!(error = %e, "Contact submission left the lifecycle");
    }

    let revert_after_secs = matches!(
        next,
        SubmissionState::Sent { .. } | SubmissionState::Failed { .. }
    )
    .then(|| submission.revert_after().as_secs());

    ContactOutcome {
        state: next,
        message,
        csrf_token: state.csrf.generate_token(&ctx.csrf_scope),
        revert_after_secs,
    }
}

async fn relay(
    state: &GuardState,
    submission: &mut Submission,
    clean: &CleanContact,
    ctx: &ContactContext,
) -> (SubmissionState, String) {
    let config = state.config();
    if let Err(e) = submission.transition(SubmissionState::Sending) {
        tracing::error!(error = %e, "Contact submission could not start sending");
    }

    let params = template_params(clean, &ctx.user_agent);
    let start = Instant::now();
    let result = state
        .relay
        .send(&config.relay.service_id, &config.relay.template_id, &params)
        .await;
    metrics::record_relay_duration(start);

    match result {
        Ok(receipt) => {
            tracing::info!(client = %ctx.client_id, status = receipt.status, "Contact message relayed");
            metrics::record_submission("sent");
            (SubmissionState::Sent { receipt }, SENT_MESSAGE.to_string())
        }
        Err(e) => {
            state.reporter.report(&config.observability, &e, &ctx.page);
            metrics::record_submission("failed");
            (
                SubmissionState::Failed {
                    reason: e.to_string(),
                },
                FAILED_MESSAGE.to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_contact() {
        let form = ContactSubmission {
            name: "  Jane <b>Doe</b> ".into(),
            email: " JANE@Example.COM ".into(),
            program: " bscs ".into(),
            message: "Hello <script>alert(1)</script>there friend".into(),
            phone: Some("   ".into()),
            csrf_token: None,
        };
        let clean = sanitize_contact(&form);
        assert_eq!(clean.email, "jane@example.com");
        assert_eq!(clean.program, "bscs");
        assert!(!clean.message.contains("script"));
        assert!(!clean.name.contains('<'));
        assert!(clean.phone.is_none());
    }

    #[test]
    fn test_template_params() {
        let clean = CleanContact {
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            program: "bscs".into(),
            message: "I would like to enroll".into(),
            phone: None,
        };
        let params = template_params(&clean, &"A".repeat(80));
        assert_eq!(params["ip"], "hidden");
        assert_eq!(params["userAgent"].len(), 50);
        assert_eq!(params["name"], "Jane Doe");
        assert!(!params.contains_key("phone"));
        assert!(!params["date"].is_empty());
    }
}

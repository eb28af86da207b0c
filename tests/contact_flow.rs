//! End-to-end contact form flows through the HTTP router.

mod common;

use axum::http::{header, Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{app, app_with, request, test_config, RecordingRelay, TestApp, STUDENT_PASSWORD};
use form_guard::lifecycle::sweep_at;

fn valid_form() -> Value {
    json!({
        "name": "Jane Doe",
        "email": "jane@example.com",
        "program": "bscs",
        "message": "Enrollment info",
    })
}

async fn post_contact(app: &TestApp, form: Value, csrf: Option<&str>) -> common::TestResponse {
    app.send(request(Method::POST, "/api/contact", Some(form), None, csrf))
        .await
}

#[tokio::test]
async fn test_invalid_fields_never_reach_the_relay() {
    let app = app();
    let csrf = app.csrf_token().await;

    let form = json!({
        "name": "A",
        "email": "bad",
        "program": "bscs",
        "message": "hi",
    });
    let response = post_contact(&app, form, Some(&csrf)).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["state"], "rejected");
    let fields: Vec<&str> = response.body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["name", "email", "message"]);
    assert_eq!(app.relay.count(), 0);
}

#[tokio::test]
async fn test_valid_submission_is_relayed_once() {
    let app = app();
    let csrf = app.csrf_token().await;

    let response = post_contact(&app, valid_form(), Some(&csrf)).await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["state"], "sent");
    assert_eq!(response.body["revertAfterSecs"], 5);
    assert_eq!(app.relay.count(), 1);

    let sent = app.relay.sent.lock().unwrap();
    assert_eq!(sent[0]["name"], "Jane Doe");
    assert_eq!(sent[0]["email"], "jane@example.com");
    assert_eq!(sent[0]["message"], "Enrollment info");
    assert_eq!(sent[0]["ip"], "hidden");

    // The token rotates after every attempt.
    let next = response.body["csrfToken"].as_str().unwrap();
    assert_ne!(next, csrf);
}

#[tokio::test]
async fn test_markup_is_escaped_before_relay() {
    let app = app();
    let csrf = app.csrf_token().await;

    let mut form = valid_form();
    form["message"] = json!("Hello <script>alert('x')</script> I have a <b>question</b> about fees");
    let response = post_contact(&app, form, Some(&csrf)).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let sent = app.relay.sent.lock().unwrap();
    let message = &sent[0]["message"];
    assert!(!message.contains("<script"));
    assert!(!message.contains('<'));
    assert!(message.contains("question"));
}

#[tokio::test]
async fn test_csrf_token_required() {
    let app = app();
    app.csrf_token().await;

    let missing = post_contact(&app, valid_form(), None).await;
    assert_eq!(missing.status, StatusCode::FORBIDDEN);
    assert_eq!(missing.body["fields"][0]["field"], "csrf_token");

    let wrong = post_contact(&app, valid_form(), Some("deadbeef")).await;
    assert_eq!(wrong.status, StatusCode::FORBIDDEN);
    assert_eq!(app.relay.count(), 0);

    // The refreshed token from a failed attempt works.
    let fresh = wrong.body["csrfToken"].as_str().unwrap().to_string();
    let retry = post_contact(&app, valid_form(), Some(&fresh)).await;
    assert_eq!(retry.status, StatusCode::OK);
}

#[tokio::test]
async fn test_csrf_token_in_body() {
    let app = app();
    let csrf = app.csrf_token().await;

    let mut form = valid_form();
    form["csrf_token"] = json!(csrf);
    let response = post_contact(&app, form, None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_fourth_submission_in_window_is_blocked() {
    let app = app();
    let mut csrf = app.csrf_token().await;

    for _ in 0..3 {
        let response = post_contact(&app, valid_form(), Some(&csrf)).await;
        assert_eq!(response.status, StatusCode::OK);
        csrf = response.body["csrfToken"].as_str().unwrap().to_string();
    }

    let blocked = post_contact(&app, valid_form(), Some(&csrf)).await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(blocked.body["state"], "blocked");
    let retry_after = blocked.body["retryAfterSecs"].as_u64().unwrap();
    assert!(retry_after > 0 && retry_after <= 60);
    assert_eq!(
        blocked.headers[header::RETRY_AFTER].to_str().unwrap(),
        retry_after.to_string()
    );
    assert!(blocked.body["message"]
        .as_str()
        .unwrap()
        .starts_with("Too many requests"));
    assert_eq!(app.relay.count(), 3);
}

#[tokio::test]
async fn test_invalid_submissions_do_not_spend_rate_budget() {
    let app = app();
    let mut csrf = app.csrf_token().await;

    for _ in 0..5 {
        let response = post_contact(&app, json!({ "name": "J" }), Some(&csrf)).await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        csrf = response.body["csrfToken"].as_str().unwrap().to_string();
    }

    let response = post_contact(&app, valid_form(), Some(&csrf)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_relay_failure_is_generic() {
    let app = app_with(test_config(), RecordingRelay::failing());
    let csrf = app.csrf_token().await;

    let response = post_contact(&app, valid_form(), Some(&csrf)).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["state"], "failed");
    let message = response.body["message"].as_str().unwrap();
    assert!(message.starts_with("Failed to send message"));
    assert!(!response.body.to_string().contains("template not found"));
    assert_eq!(app.relay.count(), 1);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = app();
    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
    assert_eq!(response.headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(response.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_plain_http_redirected_when_enforced() {
    let mut config = test_config();
    config.security.enforce_https = true;
    let app = app_with(config, RecordingRelay::default());

    let request = axum::http::Request::builder()
        .uri("/api/csrf")
        .header(header::HOST, "philtech.edu.ph")
        .header("x-forwarded-proto", "http")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        response.headers[header::LOCATION],
        "https://philtech.edu.ph/api/csrf"
    );

    let local = app.get("/health", None).await;
    assert_eq!(local.status, StatusCode::OK);
}

#[tokio::test]
async fn test_reload_changes_rate_limit() {
    let app = app();
    let mut config = test_config();
    config.rate_limit.max_attempts = 1;
    app.state.apply_config(config);

    let csrf = app.csrf_token().await;
    let first = post_contact(&app, valid_form(), Some(&csrf)).await;
    assert_eq!(first.status, StatusCode::OK);
    let next = first.body["csrfToken"].as_str().unwrap().to_string();
    let second = post_contact(&app, valid_form(), Some(&next)).await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_sweep_forgets_stale_anonymous_csrf_tokens() {
    let app = app();
    for i in 0..50 {
        let request = axum::http::Request::builder()
            .uri("/api/csrf")
            .header(header::USER_AGENT, format!("agent/{}", i))
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(app.send(request).await.status, StatusCode::OK);
    }

    let body = json!({
        "username": "student",
        "password": STUDENT_PASSWORD,
        "rememberMe": true,
    });
    let login = app
        .send(request(Method::POST, "/api/auth/login", Some(body), None, None))
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["token"].as_str().unwrap().to_string();
    let csrf = login.body["csrfToken"].as_str().unwrap().to_string();
    assert_eq!(app.state.csrf.len(), 51);

    let report = sweep_at(&app.state, Utc::now() + Duration::hours(2));
    assert_eq!(report.csrf_tokens, 50);
    assert_eq!(app.state.csrf.len(), 1);

    // The remembered session keeps its token.
    let theme = app
        .send(request(
            Method::PUT,
            "/api/dashboard/theme",
            Some(json!({ "dark": true })),
            Some(&token),
            Some(&csrf),
        ))
        .await;
    assert_eq!(theme.status, StatusCode::OK);
}

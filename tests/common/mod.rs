//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use form_guard::auth::legacy_digest;
use form_guard::config::{GuardConfig, UserConfig};
use form_guard::relay::{EmailRelay, RelayError, RelayReceipt, TemplateParams};
use form_guard::{GuardServer, GuardState};

pub const USER_AGENT: &str = "Mozilla/5.0 (integration test)";
pub const STUDENT_PASSWORD: &str = "Student-Pass-1";

/// Relay that records every send and succeeds unless told to fail.
#[derive(Default)]
pub struct RecordingRelay {
    pub sent: Mutex<Vec<TemplateParams>>,
    fail: AtomicBool,
}

impl RecordingRelay {
    pub fn failing() -> Self {
        let relay = Self::default();
        relay.fail.store(true, Ordering::SeqCst);
        relay
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailRelay for RecordingRelay {
    async fn send(
        &self,
        _service_id: &str,
        _template_id: &str,
        params: &TemplateParams,
    ) -> Result<RelayReceipt, RelayError> {
        self.sent.lock().unwrap().push(params.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(RelayError::Rejected {
                status: 400,
                text: "template not found".into(),
            });
        }
        Ok(RelayReceipt {
            status: 200,
            text: "OK".into(),
        })
    }
}

/// Defaults plus one student account with a legacy credential row, which
/// keeps password checks fast.
pub fn test_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    let digest = legacy_digest(STUDENT_PASSWORD, &config.auth.legacy_salt);
    config.auth.users.push(UserConfig {
        username: "student".into(),
        email: "student@philtech.edu.ph".into(),
        password_hash: format!("sha256:{}", digest),
        role: "student".into(),
        full_name: "John Student".into(),
    });
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<GuardState>,
    pub relay: Arc<RecordingRelay>,
}

pub fn app_with(config: GuardConfig, relay: RecordingRelay) -> TestApp {
    let relay = Arc::new(relay);
    let state = Arc::new(
        GuardState::builder(config)
            .relay(relay.clone())
            .build()
            .expect("state builds"),
    );
    let router = GuardServer::new(state.clone()).router();
    TestApp {
        router,
        state,
        relay,
    }
}

pub fn app() -> TestApp {
    app_with(test_config(), RecordingRelay::default())
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, None, token, None)).await
    }

    /// Fetch a CSRF token for the anonymous test client.
    pub async fn csrf_token(&self) -> String {
        let response = self.get("/api/csrf", None).await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["csrfToken"].as_str().unwrap().to_string()
    }

    /// Sign in as the test student. Returns (session token, csrf token).
    pub async fn login(&self) -> (String, String) {
        let body = serde_json::json!({
            "username": "student",
            "password": STUDENT_PASSWORD,
        });
        let response = self
            .send(request(Method::POST, "/api/auth/login", Some(body), None, None))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        (
            response.body["token"].as_str().unwrap().to_string(),
            response.body["csrfToken"].as_str().unwrap().to_string(),
        )
    }
}

pub fn request(
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
    csrf: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("user-agent", USER_AGENT)
        .header("accept-language", "en-US");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    if let Some(csrf) = csrf {
        builder = builder.header("x-csrf-token", csrf);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

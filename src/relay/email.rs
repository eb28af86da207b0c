//! Outbound email delivery.
//!
//! The contact form hands its sanitized fields to an [`EmailRelay`]. The
//! production implementation speaks the EmailJS REST protocol; tests plug
//! in a recording relay instead.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::RelayConfig;

/// Named template variables, serialized in a stable order.
pub type TemplateParams = BTreeMap<String, String>;

/// Provider acknowledgement of a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayReceipt {
    pub status: u16,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("email relay is disabled")]
    Disabled,

    #[error("relay transport error: {0}")]
    Transport(String),

    #[error("relay rejected the message with status {status}: {text}")]
    Rejected { status: u16, text: String },

    #[error("relay timed out")]
    Timeout,
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::Timeout
        } else {
            RelayError::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait EmailRelay: Send + Sync {
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        params: &TemplateParams,
    ) -> Result<RelayReceipt, RelayError>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: &'a TemplateParams,
}

/// EmailJS-compatible REST relay.
pub struct EmailJsRelay {
    client: reqwest::Client,
    endpoint: String,
    public_key: String,
    private_key: Option<String>,
}

impl EmailJsRelay {
    pub fn new(config: &RelayConfig, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            public_key: config.public_key.clone(),
            private_key: config.private_key.clone(),
        })
    }
}

#[async_trait]
impl EmailRelay for EmailJsRelay {
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        params: &TemplateParams,
    ) -> Result<RelayReceipt, RelayError> {
        let body = SendRequest {
            service_id,
            template_id,
            user_id: &self.public_key,
            access_token: self.private_key.as_deref(),
            template_params: params,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        if (200..300).contains(&status) {
            Ok(RelayReceipt { status, text })
        } else {
            Err(RelayError::Rejected { status, text })
        }
    }
}

/// Relay used when delivery is switched off. Every send fails.
pub struct DisabledRelay;

#[async_trait]
impl EmailRelay for DisabledRelay {
    async fn send(
        &self,
        _service_id: &str,
        _template_id: &str,
        _params: &TemplateParams,
    ) -> Result<RelayReceipt, RelayError> {
        Err(RelayError::Disabled)
    }
}

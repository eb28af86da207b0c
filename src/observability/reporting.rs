//! Error reporting with environment-dependent detail.
//!
//! Every report is logged at error level. In development the line carries
//! the full error chain; in production only the top-level message. When a monitoring URL is configured a truncated
//! report is posted there in the background. Reports never carry stack
//! traces, paths or user input beyond the first 100 characters of the
//! message.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::config::{Environment, ObservabilityConfig};

const MAX_REPORT_MESSAGE_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    pub timestamp: String,
    pub page: String,
}

impl ErrorReport {
    pub fn new(message: &str, page: &str) -> Self {
        Self {
            kind: "client_error",
            message: message.chars().take(MAX_REPORT_MESSAGE_CHARS).collect(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            page: page.to_string(),
        }
    }
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

fn log_detail(environment: Environment, error: &(dyn std::error::Error + 'static)) -> String {
    match environment {
        Environment::Development => error_chain(error),
        Environment::Production => error.to_string(),
    }
}

#[derive(Clone)]
pub struct ErrorReporter {
    client: reqwest::Client,
}

impl ErrorReporter {
    /// `timeout` bounds each delivery to the monitoring sink.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Log `error` and forward a sanitized report if a sink is configured.
    pub fn report(
        &self,
        config: &ObservabilityConfig,
        error: &(dyn std::error::Error + 'static),
        page: &str,
    ) -> ErrorReport {
        tracing::error!(
            error = %log_detail(config.environment, error),
            page,
            "Error occurred"
        );

        let report = ErrorReport::new(&error.to_string(), page);
        if let Some(url) = config.monitoring_url.clone() {
            let reporter = self.clone();
            let body = report.clone();
            tokio::spawn(async move {
                if let Err(e) = reporter.deliver(&url, &body).await {
                    tracing::warn!(error = %e, "Failed to deliver error report");
                }
            });
        }
        report
    }

    /// Post one report to the monitoring sink.
    pub async fn deliver(&self, url: &str, report: &ErrorReport) -> Result<(), reqwest::Error> {
        self.client.post(url).json(report).send().await?;
        Ok(())
    }
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_submissions_total` (counter): contact submissions by outcome
//! - `guard_rate_limited_total` (counter): submissions denied by the limiter
//! - `guard_lockouts_total` (counter): logins refused by an active lockout
//! - `guard_relay_duration_seconds` (histogram): email relay latency
//! - `guard_logins_total` (counter): login attempts by outcome
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission(outcome: &'static str) {
    metrics::counter!("guard_submissions_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("guard_rate_limited_total").increment(1);
}

pub fn record_lockout() {
    metrics::counter!("guard_lockouts_total").increment(1);
}

pub fn record_relay_duration(start: Instant) {
    metrics::histogram!("guard_relay_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_login(outcome: &'static str) {
    metrics::counter!("guard_logins_total", "outcome" => outcome).increment(1);
}

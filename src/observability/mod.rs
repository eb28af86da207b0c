//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (tracing subscriber, env filter)
//!     → metrics.rs (counters, histograms)
//!     → reporting.rs (environment-aware error reports)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//!     → Optional monitoring sink
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every request span
//! - Metrics are cheap (atomic increments)
//! - Error detail depends on the configured environment

pub mod logging;
pub mod metrics;
pub mod reporting;

pub use reporting::{ErrorReport, ErrorReporter};

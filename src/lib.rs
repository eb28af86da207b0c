//! Form submission guard for the school website.
//!
//! Contact form submissions run Sanitize → Validate → Gate → Relay; the
//! student portal gets login with lockout, bearer sessions and the
//! dashboard reads and writes behind them.

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod relay;
pub mod security;
pub mod state;

pub use config::schema::GuardConfig;
pub use http::GuardServer;
pub use lifecycle::Shutdown;
pub use state::GuardState;

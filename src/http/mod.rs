//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum router, request ID, trace, timeout, body limit)
//!     → middleware/security.rs (HTTPS redirect, hardening headers)
//!     → middleware/session.rs (bearer session, CSRF on dashboard writes)
//!     → request.rs (client fingerprint, page, request ID)
//!     → handlers/* (pipelines and dashboard)
//!     → response.rs (ApiError → JSON + status)
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ClientContext, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, GuardServer};

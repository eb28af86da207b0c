//! Request middleware.
//!
//! - `security.rs`: HTTPS redirect and hardening headers on every response
//! - `session.rs`: bearer session check and CSRF check for signed-in routes

pub mod security;
pub mod session;

pub use security::security_layer;
pub use session::{require_csrf, require_session, CurrentSession};

//! Network layer.
//!
//! The guard normally sits behind a TLS-terminating proxy and listens on
//! plain TCP. When `listener.tls` is configured it terminates TLS itself
//! with rustls through `axum-server`.

pub mod tls;

pub use tls::load_tls_config;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → held by GuardState behind an ArcSwap
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → GuardState::apply_config swaps policies in place
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Listener and storage paths are read once at startup; reload only
//!   touches policies (limits, timeouts, relay, headers)

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuthConfig, DocumentsConfig, Environment, GuardConfig, ListenerConfig, LockoutConfig,
    ObservabilityConfig, RateLimitConfig, RelayConfig, SecurityConfig, SessionConfig,
    SubmissionConfig, TimeoutConfig, TlsConfig, UserConfig, ValidationConfig,
};

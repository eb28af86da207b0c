//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Logging → Metrics → Build GuardState
//!
//! Running:
//!     maintenance.rs: periodic sweep of limits, sessions and lockouts
//!     config watcher: reloads applied to GuardState
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/Ctrl+C → Shutdown::trigger → server drains,
//!     watcher loop stops, maintenance flushes durable stores
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - One broadcast channel reaches every background task

pub mod maintenance;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use maintenance::{run_maintenance, sweep, sweep_at, SweepReport};
pub use shutdown::Shutdown;
pub use signals::spawn_signal_listener;
pub use startup::{build_state, start_observability};

//! Authentication: credential checks, password scoring and sessions.
//!
//! # Data Flow
//! ```text
//! Login request:
//!     → identity.rs (IdentityProvider verifies username/email + password)
//!     → password.rs (Argon2 verify, legacy sha256 rows recognised)
//!     → session.rs (bearer token issued, inactivity expiry)
//! ```
//!
//! # Design Decisions
//! - Credentials never leave the server; the client only holds a token
//! - The identity backend is a trait so a hosted provider can replace it

pub mod identity;
pub mod password;
pub mod session;

pub use identity::{AuthenticatedUser, IdentityError, IdentityProvider, Role, StaticIdentityProvider};
pub use password::{hash_password, legacy_digest, validate_strength, verify_password, StrengthReport};
pub use session::{SessionManager, SessionRecord};

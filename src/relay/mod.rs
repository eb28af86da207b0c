//! Relay stage: hands validated data to external collaborators.
//!
//! # Data Flow
//! ```text
//! Validated contact form → email.rs (EmailRelay, EmailJS REST)
//! Dashboard reads/writes → documents.rs (DocumentStore, in-memory + snapshot)
//! ```
//!
//! # Design Decisions
//! - Collaborators sit behind traits so tests and deployments swap them
//! - One attempt per send; failures surface to the caller, never retried

pub mod documents;
pub mod email;

pub use documents::{
    Document, DocumentError, DocumentQuery, DocumentStore, MemoryDocumentStore, SortOrder,
    StoredDocument,
};
pub use email::{DisabledRelay, EmailJsRelay, EmailRelay, RelayError, RelayReceipt, TemplateParams};

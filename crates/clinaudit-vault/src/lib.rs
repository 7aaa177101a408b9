//! Identifier vault: encryption at rest, audit-scoped pseudonymisation, and
//! a justification-gated, fully logged resolve path.

pub mod access;
pub mod cipher;
pub mod keys;
pub mod pseudonym;
pub mod vault;

pub use access::{AccessEvent, AccessOutcome, AuditSink, MemorySink};
pub use keys::{AuditKey, KeyProvider, StaticKeyProvider};
pub use pseudonym::{derive_pseudonym, normalize_fields};
pub use vault::{PiiVault, RequesterContext};

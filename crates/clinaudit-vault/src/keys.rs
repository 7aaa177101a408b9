//! Per-audit key material.
//!
//! Keys and salts are supplied by a collaborator through [`KeyProvider`]
//! and threaded explicitly into vault calls; the vault never reads key
//! material from ambient process state.

use std::collections::BTreeMap;

/// Symmetric key material scoped to one audit.
///
/// The encryption key protects identifier records; the salt keys the
/// pseudonym digest so the same identifier yields different pseudonyms in
/// different audits.
#[derive(Clone)]
pub struct AuditKey {
    pub encryption_key: [u8; 32],
    pub pseudonym_salt: [u8; 32],
}

impl std::fmt::Debug for AuditKey {
    // Key bytes must never reach logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditKey").finish_non_exhaustive()
    }
}

/// Collaborator-supplied source of active key material per audit.
pub trait KeyProvider: Send + Sync {
    fn key_for(&self, audit_id: &str) -> Option<AuditKey>;
}

/// Fixed in-memory key provider for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct StaticKeyProvider {
    keys: BTreeMap<String, AuditKey>,
}

impl StaticKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, audit_id: &str, key: AuditKey) -> Self {
        self.keys.insert(audit_id.to_string(), key);
        self
    }
}

impl KeyProvider for StaticKeyProvider {
    fn key_for(&self, audit_id: &str) -> Option<AuditKey> {
        self.keys.get(audit_id).cloned()
    }
}

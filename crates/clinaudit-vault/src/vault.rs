//! The identifier vault.
//!
//! Episodes only ever carry the opaque pseudonym token; the plaintext to
//! pseudonym mapping lives here, encrypted at rest, and is read back
//! exclusively through [`PiiVault::resolve`] with a logged justification.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use clinaudit_model::{GovernanceConfig, VaultError};
use serde_json::json;
use tracing::{debug, warn};

use crate::access::{AccessEvent, AccessOutcome, AuditSink};
use crate::cipher;
use crate::keys::KeyProvider;
use crate::pseudonym::{derive_pseudonym, normalize_fields};

/// One encrypted identifier record. Plaintext exists only transiently
/// inside `store_identifier` and `resolve`.
#[derive(Debug, Clone)]
struct IdentifierRecord {
    audit_id: String,
    ciphertext: Vec<u8>,
    created_at: DateTime<Utc>,
    retention_deadline: DateTime<Utc>,
}

/// Who is asking for plaintext, and why. The justification is mandatory
/// and lands verbatim in the access log.
#[derive(Debug, Clone)]
pub struct RequesterContext {
    pub actor: String,
    pub justification: String,
}

pub struct PiiVault<K, S> {
    keys: K,
    sink: S,
    records: Mutex<BTreeMap<String, IdentifierRecord>>,
}

impl<K: KeyProvider, S: AuditSink> PiiVault<K, S> {
    pub fn new(keys: K, sink: S) -> Self {
        Self {
            keys,
            sink,
            records: Mutex::new(BTreeMap::new()),
        }
    }

    /// Encrypt and store identifier fields, returning the pseudonym.
    ///
    /// Idempotent: the same normalized fields for the same audit map to the
    /// same pseudonym and leave exactly one record behind, also under
    /// concurrent duplicate submission. Fields that normalize to nothing
    /// are rejected.
    pub fn store_identifier(
        &self,
        audit_id: &str,
        fields: &BTreeMap<String, String>,
        governance: &GovernanceConfig,
    ) -> Result<String, VaultError> {
        let key = self.keys.key_for(audit_id).ok_or_else(|| VaultError::MissingKey {
            audit_id: audit_id.to_string(),
        })?;

        let normalized = normalize_fields(fields);
        if normalized.is_empty() {
            return Err(VaultError::EmptyIdentifiers);
        }
        let pseudonym = derive_pseudonym(&key.pseudonym_salt, audit_id, &normalized)?;

        let plaintext = serde_json::to_vec(fields).map_err(|_| VaultError::Crypto)?;
        let ciphertext = cipher::encrypt(&key.encryption_key, &plaintext)?;

        let now = Utc::now();
        let record = IdentifierRecord {
            audit_id: audit_id.to_string(),
            ciphertext,
            created_at: now,
            retention_deadline: now + Duration::days(i64::from(governance.retention_days)),
        };

        let mut records = lock(&self.records);
        // First write wins; a duplicate keeps the original record intact.
        if !records.contains_key(&pseudonym) {
            records.insert(pseudonym.clone(), record);
            debug!(audit_id, "stored identifier record");
        }
        Ok(pseudonym)
    }

    /// Decrypt the identifier fields behind a pseudonym.
    ///
    /// Requires a non-empty justification. Every attempt, granted or
    /// denied, is appended to the audit sink. A purged or never-stored
    /// pseudonym resolves to [`VaultError::UnknownPseudonym`].
    pub fn resolve(
        &self,
        pseudonym: &str,
        requester: &RequesterContext,
    ) -> Result<BTreeMap<String, String>, VaultError> {
        if requester.justification.trim().is_empty() {
            self.log_access(pseudonym, requester, AccessOutcome::Denied, "missing justification");
            warn!(actor = %requester.actor, "identifier access denied: missing justification");
            return Err(VaultError::PermissionDenied);
        }

        let record = {
            let records = lock(&self.records);
            records.get(pseudonym).cloned()
        };
        let Some(record) = record else {
            self.log_access(pseudonym, requester, AccessOutcome::Denied, "unknown pseudonym");
            warn!(actor = %requester.actor, "identifier access denied: unknown pseudonym");
            return Err(VaultError::UnknownPseudonym);
        };

        let key = match self.keys.key_for(&record.audit_id) {
            Some(key) => key,
            None => {
                self.log_access(pseudonym, requester, AccessOutcome::Denied, "missing key");
                return Err(VaultError::MissingKey {
                    audit_id: record.audit_id.clone(),
                });
            }
        };

        let Ok(plaintext) = cipher::decrypt(&key.encryption_key, &record.ciphertext) else {
            self.log_access(pseudonym, requester, AccessOutcome::Denied, "record could not be decrypted");
            warn!(actor = %requester.actor, "identifier access denied: record could not be decrypted");
            return Err(VaultError::Crypto);
        };
        let Ok(fields) = serde_json::from_slice::<BTreeMap<String, String>>(&plaintext) else {
            self.log_access(pseudonym, requester, AccessOutcome::Denied, "record could not be decoded");
            return Err(VaultError::Crypto);
        };

        self.log_access(pseudonym, requester, AccessOutcome::Granted, "resolved");
        debug!(audit_id = %record.audit_id, actor = %requester.actor, "identifier access granted");
        Ok(fields)
    }

    /// Delete identifier records whose retention deadline has passed.
    ///
    /// Returns the number of records removed. Episodes referencing a purged
    /// pseudonym are untouched; their token simply stops resolving.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|_, record| record.retention_deadline > now);
        let purged = before - records.len();
        if purged > 0 {
            debug!(purged, "purged expired identifier records");
        }
        purged
    }

    /// Number of identifier records currently held.
    pub fn record_count(&self) -> usize {
        lock(&self.records).len()
    }

    /// The access log sink this vault writes to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn log_access(
        &self,
        pseudonym: &str,
        requester: &RequesterContext,
        outcome: AccessOutcome,
        detail: &str,
    ) {
        self.sink.record(AccessEvent {
            timestamp: Utc::now(),
            actor: requester.actor.clone(),
            action: "resolve_identifier".to_string(),
            resource: format!("pseudonym:{pseudonym}"),
            outcome,
            metadata: json!({
                "justification": requester.justification,
                "detail": detail,
            }),
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

//! Vault behaviour across store, resolve, and retention purge.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, Utc};
use clinaudit_model::{DataProtectionLevel, GovernanceConfig, VaultError};
use clinaudit_vault::{
    AccessOutcome, AuditKey, KeyProvider, MemorySink, PiiVault, RequesterContext,
    StaticKeyProvider,
};

fn keys() -> StaticKeyProvider {
    StaticKeyProvider::new()
        .with_key(
            "hip-fracture-2026",
            AuditKey {
                encryption_key: [1u8; 32],
                pseudonym_salt: [2u8; 32],
            },
        )
        .with_key(
            "copd-readmission-2026",
            AuditKey {
                encryption_key: [3u8; 32],
                pseudonym_salt: [4u8; 32],
            },
        )
}

fn governance(retention_days: u32) -> GovernanceConfig {
    GovernanceConfig {
        data_protection_level: DataProtectionLevel::Pseudonymised,
        retention_days,
    }
}

fn identifiers() -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("nhs_number".to_string(), "943 476 5919".to_string());
    fields.insert("date_of_birth".to_string(), "1944-05-01".to_string());
    fields
}

fn requester(justification: &str) -> RequesterContext {
    RequesterContext {
        actor: "audit.lead".to_string(),
        justification: justification.to_string(),
    }
}

#[test]
fn storing_the_same_identifier_twice_is_idempotent() {
    let vault = PiiVault::new(keys(), MemorySink::new());
    let governance = governance(3650);

    let first = vault
        .store_identifier("hip-fracture-2026", &identifiers(), &governance)
        .expect("store");
    let second = vault
        .store_identifier("hip-fracture-2026", &identifiers(), &governance)
        .expect("store again");

    assert_eq!(first, second);
    assert_eq!(vault.record_count(), 1);
}

#[test]
fn clerical_variants_map_to_one_pseudonym() {
    let vault = PiiVault::new(keys(), MemorySink::new());
    let governance = governance(3650);

    let mut variant = BTreeMap::new();
    variant.insert("nhs_number".to_string(), "  943  476 5919 ".to_string());
    variant.insert("date_of_birth".to_string(), "1944-05-01".to_string());

    let a = vault
        .store_identifier("hip-fracture-2026", &identifiers(), &governance)
        .expect("store");
    let b = vault
        .store_identifier("hip-fracture-2026", &variant, &governance)
        .expect("store variant");
    assert_eq!(a, b);
    assert_eq!(vault.record_count(), 1);
}

#[test]
fn concurrent_duplicate_stores_leave_one_record() {
    let vault = Arc::new(PiiVault::new(keys(), MemorySink::new()));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let vault = Arc::clone(&vault);
            std::thread::spawn(move || {
                vault.store_identifier("hip-fracture-2026", &identifiers(), &governance(3650))
            })
        })
        .collect();
    let pseudonyms: Vec<String> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread").expect("store"))
        .collect();

    assert_eq!(pseudonyms[0], pseudonyms[1]);
    assert_eq!(vault.record_count(), 1);
}

#[test]
fn blank_identifier_fields_are_rejected() {
    let vault = PiiVault::new(keys(), MemorySink::new());
    let governance = governance(3650);

    let err = vault
        .store_identifier("hip-fracture-2026", &BTreeMap::new(), &governance)
        .expect_err("empty map");
    assert_eq!(err, VaultError::EmptyIdentifiers);

    let mut blank = BTreeMap::new();
    blank.insert("nhs_number".to_string(), "   ".to_string());
    let err = vault
        .store_identifier("hip-fracture-2026", &blank, &governance)
        .expect_err("blank values");
    assert_eq!(err, VaultError::EmptyIdentifiers);
    assert_eq!(vault.record_count(), 0);
}

#[test]
fn same_patient_in_different_audits_gets_different_pseudonyms() {
    let vault = PiiVault::new(keys(), MemorySink::new());
    let governance = governance(3650);

    let hip = vault
        .store_identifier("hip-fracture-2026", &identifiers(), &governance)
        .expect("store");
    let copd = vault
        .store_identifier("copd-readmission-2026", &identifiers(), &governance)
        .expect("store");
    assert_ne!(hip, copd);
    assert_eq!(vault.record_count(), 2);
}

#[test]
fn resolve_with_justification_returns_plaintext_and_logs_grant() {
    let vault = PiiVault::new(keys(), MemorySink::new());
    let pseudonym = vault
        .store_identifier("hip-fracture-2026", &identifiers(), &governance(3650))
        .expect("store");

    let fields = vault
        .resolve(&pseudonym, &requester("case note review for outlier episode"))
        .expect("resolve");
    assert_eq!(fields, identifiers());

    let events = vault.sink().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, AccessOutcome::Granted);
    assert_eq!(events[0].action, "resolve_identifier");
    assert_eq!(events[0].resource, format!("pseudonym:{pseudonym}"));
}

#[test]
fn resolve_without_justification_is_denied_and_logged() {
    let vault = PiiVault::new(keys(), MemorySink::new());
    let pseudonym = vault
        .store_identifier("hip-fracture-2026", &identifiers(), &governance(3650))
        .expect("store");

    let err = vault
        .resolve(&pseudonym, &requester(""))
        .expect_err("denied");
    assert_eq!(err, VaultError::PermissionDenied);

    let events = vault.sink().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, AccessOutcome::Denied);
}

/// Hands out a fresh encryption key on every lookup, as if the audit's key
/// had been rotated between store and resolve.
struct RotatingKeyProvider {
    calls: AtomicUsize,
}

impl KeyProvider for RotatingKeyProvider {
    fn key_for(&self, _audit_id: &str) -> Option<AuditKey> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as u8;
        Some(AuditKey {
            encryption_key: [call.wrapping_add(1); 32],
            pseudonym_salt: [9u8; 32],
        })
    }
}

#[test]
fn undecryptable_record_is_denied_and_logged() {
    let keys = RotatingKeyProvider {
        calls: AtomicUsize::new(0),
    };
    let vault = PiiVault::new(keys, MemorySink::new());
    let pseudonym = vault
        .store_identifier("hip-fracture-2026", &identifiers(), &governance(3650))
        .expect("store");

    // The next key lookup returns different material, so the stored
    // ciphertext no longer authenticates.
    let err = vault
        .resolve(&pseudonym, &requester("case note review"))
        .expect_err("stale key");
    assert_eq!(err, VaultError::Crypto);

    let events = vault.sink().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, AccessOutcome::Denied);
    assert_eq!(events[0].resource, format!("pseudonym:{pseudonym}"));
}

#[test]
fn purge_removes_expired_records_and_breaks_resolution() {
    let vault = PiiVault::new(keys(), MemorySink::new());
    // Zero-day retention expires immediately.
    let pseudonym = vault
        .store_identifier("hip-fracture-2026", &identifiers(), &governance(0))
        .expect("store");

    let purged = vault.purge_expired(Utc::now() + Duration::seconds(1));
    assert_eq!(purged, 1);
    assert_eq!(vault.record_count(), 0);

    // The token survives as an opaque value but no longer resolves.
    let err = vault
        .resolve(&pseudonym, &requester("retention check"))
        .expect_err("purged");
    assert_eq!(err, VaultError::UnknownPseudonym);
}

#[test]
fn purge_leaves_unexpired_records_alone() {
    let vault = PiiVault::new(keys(), MemorySink::new());
    vault
        .store_identifier("hip-fracture-2026", &identifiers(), &governance(3650))
        .expect("store");

    assert_eq!(vault.purge_expired(Utc::now()), 0);
    assert_eq!(vault.record_count(), 1);
}

mod properties {
    use clinaudit_vault::{derive_pseudonym, normalize_fields};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    proptest! {
        /// Pseudonym derivation is deterministic and always 64 hex chars.
        #[test]
        fn pseudonyms_are_stable_hex(normalized in ".{0,64}") {
            let a = derive_pseudonym(&[5u8; 32], "hip-fracture-2026", &normalized)
                .expect("derive");
            let b = derive_pseudonym(&[5u8; 32], "hip-fracture-2026", &normalized)
                .expect("derive");
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.len(), 64);
            prop_assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        }

        /// Normalization is idempotent: re-normalizing its own output
        /// changes nothing, so retries cannot drift.
        #[test]
        fn normalization_is_idempotent(value in "[ a-zA-Z0-9]{0,32}") {
            let mut fields = BTreeMap::new();
            fields.insert("nhs_number".to_string(), value);
            let once = normalize_fields(&fields);

            let renormalized: BTreeMap<String, String> = once
                .lines()
                .filter_map(|line| line.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            prop_assert_eq!(normalize_fields(&renormalized), once);
        }
    }
}

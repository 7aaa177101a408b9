//! Audit-scoped pseudonym derivation.
//!
//! A pseudonym is a keyed one-way digest of the normalized identifier
//! fields: HMAC-SHA256 keyed with the audit's salt, hex-encoded. Without
//! the salt the mapping is irreversible, and the salt differs per audit,
//! so pseudonym equality across audits carries no signal.

use std::collections::BTreeMap;

use clinaudit_model::VaultError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derive the stable pseudonym for one audit's identifier fields.
pub fn derive_pseudonym(
    salt: &[u8],
    audit_id: &str,
    normalized_fields: &str,
) -> Result<String, VaultError> {
    let mut mac = HmacSha256::new_from_slice(salt).map_err(|_| VaultError::Crypto)?;
    mac.update(audit_id.as_bytes());
    mac.update(b"\x1f");
    mac.update(normalized_fields.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Canonical form of the identifier fields before digesting.
///
/// Field order is fixed by name; values are trimmed, inner whitespace
/// collapsed, and uppercased so clerical variants of the same identifier
/// ("ab 123" vs "AB123 ") map to one pseudonym. Empty fields are dropped.
pub fn normalize_fields(fields: &BTreeMap<String, String>) -> String {
    let mut parts = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let collapsed: String = value.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            continue;
        }
        parts.push(format!("{}={}", name.trim().to_lowercase(), collapsed.to_uppercase()));
    }
    parts.join("\n")
}

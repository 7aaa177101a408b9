use serde::{Deserialize, Serialize};

/// Data protection classification for an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProtectionLevel {
    /// No direct identifiers captured anywhere.
    NoPii,
    /// Identifiers captured into the vault and replaced by pseudonyms.
    Pseudonymised,
    /// Identifiers mandatory on every submission.
    PiiRequired,
}

/// Per-audit governance configuration threaded explicitly into the capture
/// pipeline and vault (never read from ambient process state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    pub data_protection_level: DataProtectionLevel,
    /// Identifier retention period; episodes outlive their identifiers.
    pub retention_days: u32,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            data_protection_level: DataProtectionLevel::NoPii,
            retention_days: 3650,
        }
    }
}

impl GovernanceConfig {
    /// Returns true if submissions may carry identifier fields.
    pub fn accepts_identifiers(&self) -> bool {
        !matches!(self.data_protection_level, DataProtectionLevel::NoPii)
    }

    /// Returns true if submissions must carry identifier fields.
    pub fn requires_identifiers(&self) -> bool {
        matches!(self.data_protection_level, DataProtectionLevel::PiiRequired)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::response::ResponseSet;

/// Validation lifecycle state of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    /// First validated submission.
    Validated,
    /// Re-validated through the amend operation at least once.
    Amended,
}

/// A superseded submission retained for auditability.
///
/// Amendments never overwrite in place; the prior responses and metrics are
/// appended here with their original submission timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amendment {
    pub submitted_at: DateTime<Utc>,
    pub responses: ResponseSet,
    pub derived: BTreeMap<String, f64>,
}

/// One validated, stored patient-encounter record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub audit_id: String,
    /// Immutable reference to the questionnaire version validated against.
    pub questionnaire_version: u32,
    pub site_id: String,
    /// Caller-chosen idempotency key (e.g. a site-scoped episode code).
    pub episode_key: String,
    /// Pseudonym token linking to the PII vault, if identifiers were
    /// captured. Never a direct foreign key into clinical tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pseudonym: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub responses: ResponseSet,
    /// Metric values computed from the validated responses on write.
    pub derived: BTreeMap<String, f64>,
    pub status: EpisodeStatus,
    /// Append-only amendment history, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Amendment>,
}

impl Episode {
    /// Total number of submissions recorded for this encounter.
    pub fn submission_count(&self) -> usize {
        self.history.len() + 1
    }
}

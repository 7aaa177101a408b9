//! The capture pipeline.
//!
//! One entry point for everything a capture client does: publish
//! questionnaire versions, submit episodes, amend them. A submission runs
//! governance checks, validation, metric derivation, and identifier
//! vaulting in that order, so nothing unvalidated or governance-violating
//! ever reaches the episode store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use clinaudit_metrics::MetricSet;
use clinaudit_model::{
    Episode, GovernanceConfig, InvalidDefinition, QuestionDefinition, RawResponses, SubmitError,
};
use clinaudit_validate::CompiledQuestionnaire;
use clinaudit_vault::{AuditSink, KeyProvider, PiiVault};
use tracing::debug;

use crate::episodes::{EpisodeDraft, EpisodeStore};
use crate::versions::VersionStore;

/// Per-audit capture configuration.
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    pub governance: GovernanceConfig,
    pub metrics: MetricSet,
}

/// One incoming episode submission.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub audit_id: String,
    /// The questionnaire version the client captured against. Must be the
    /// audit's current published version.
    pub version: u32,
    pub site_id: String,
    /// Caller-chosen idempotency key, stable across retries.
    pub episode_key: String,
    pub responses: RawResponses,
    /// Direct identifiers, when governance allows or requires them. Stored
    /// only in the vault; the episode carries the pseudonym.
    pub identifiers: Option<BTreeMap<String, String>>,
}

pub struct CaptureEngine<K, S> {
    versions: VersionStore,
    episodes: EpisodeStore,
    vault: PiiVault<K, S>,
    audits: RwLock<BTreeMap<String, AuditConfig>>,
}

impl<K: KeyProvider, S: AuditSink> CaptureEngine<K, S> {
    pub fn new(vault: PiiVault<K, S>) -> Self {
        Self {
            versions: VersionStore::new(),
            episodes: EpisodeStore::new(),
            vault,
            audits: RwLock::new(BTreeMap::new()),
        }
    }

    /// Set an audit's governance level and metric rule set. Unregistered
    /// audits default to no-PII governance and no metrics.
    pub fn register_audit(&self, audit_id: &str, config: AuditConfig) {
        let mut audits = write_lock(&self.audits);
        audits.insert(audit_id.to_string(), config);
    }

    pub fn publish(
        &self,
        audit_id: &str,
        questions: Vec<QuestionDefinition>,
    ) -> Result<CompiledQuestionnaire, InvalidDefinition> {
        self.versions.publish(audit_id, questions)
    }

    /// Validate and store one episode submission.
    pub fn submit(&self, request: SubmissionRequest) -> Result<Episode, SubmitError> {
        let config = self.audit_config(&request.audit_id);
        check_governance(&request, &config.governance)?;

        let compiled = self
            .versions
            .latest(&request.audit_id)
            .ok_or_else(|| SubmitError::UnknownAudit {
                audit_id: request.audit_id.clone(),
            })?;
        let current = compiled.version().version;
        if request.version != current {
            return Err(SubmitError::VersionMismatch {
                submitted: request.version,
                current,
            });
        }

        let responses = compiled.validate(&request.responses)?;
        let derived = config.metrics.apply(&responses);

        let pseudonym = match &request.identifiers {
            Some(fields) => Some(self.vault.store_identifier(
                &request.audit_id,
                fields,
                &config.governance,
            )?),
            None => None,
        };

        self.episodes.submit(EpisodeDraft {
            audit_id: request.audit_id,
            questionnaire_version: current,
            site_id: request.site_id,
            episode_key: request.episode_key,
            pseudonym,
            responses,
            derived,
        })
    }

    /// Re-validate a full replacement response set for an existing episode.
    ///
    /// Validation runs against the version the episode was originally
    /// captured with, even if the audit has since published newer versions;
    /// the episode's version reference never moves.
    pub fn amend(
        &self,
        audit_id: &str,
        episode_key: &str,
        responses: &RawResponses,
    ) -> Result<Episode, SubmitError> {
        let episode = self.episodes.get(audit_id, episode_key).ok_or_else(|| {
            SubmitError::UnknownEpisode {
                audit_id: audit_id.to_string(),
                episode_key: episode_key.to_string(),
            }
        })?;

        let compiled = self
            .versions
            .get(audit_id, episode.questionnaire_version)
            .ok_or_else(|| SubmitError::UnknownAudit {
                audit_id: audit_id.to_string(),
            })?;

        let validated = compiled.validate(responses)?;
        let config = self.audit_config(audit_id);
        let derived = config.metrics.apply(&validated);
        debug!(audit_id, episode_key, "amendment validated");
        self.episodes.amend(audit_id, episode_key, validated, derived)
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    pub fn episodes(&self) -> &EpisodeStore {
        &self.episodes
    }

    pub fn vault(&self) -> &PiiVault<K, S> {
        &self.vault
    }

    fn audit_config(&self, audit_id: &str) -> AuditConfig {
        let audits = read_lock(&self.audits);
        audits.get(audit_id).cloned().unwrap_or_default()
    }
}

fn check_governance(
    request: &SubmissionRequest,
    governance: &GovernanceConfig,
) -> Result<(), SubmitError> {
    let has_identifiers = request
        .identifiers
        .as_ref()
        .is_some_and(|fields| !fields.is_empty());

    if governance.requires_identifiers() && !has_identifiers {
        return Err(SubmitError::IdentifiersRequired {
            audit_id: request.audit_id.clone(),
        });
    }
    if !governance.accepts_identifiers() && has_identifiers {
        return Err(SubmitError::IdentifiersNotAllowed {
            audit_id: request.audit_id.clone(),
        });
    }
    Ok(())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

//! Episode persistence with idempotent submission.
//!
//! Episodes are keyed per audit by a caller-chosen episode key so a
//! retried submission (flaky ward wifi, double-clicked save) lands exactly
//! once. The key check and insert happen under one write lock, so two
//! concurrent duplicates cannot both insert.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use clinaudit_model::{Amendment, Episode, EpisodeStatus, ResponseSet, SubmitError};
use tracing::{debug, info};
use uuid::Uuid;

/// A prepared, already-validated episode candidate.
#[derive(Debug, Clone)]
pub struct EpisodeDraft {
    pub audit_id: String,
    pub questionnaire_version: u32,
    pub site_id: String,
    pub episode_key: String,
    pub pseudonym: Option<String>,
    pub responses: ResponseSet,
    pub derived: BTreeMap<String, f64>,
}

impl EpisodeDraft {
    /// Two drafts with identical content are the same submission retried.
    fn matches(&self, episode: &Episode) -> bool {
        self.questionnaire_version == episode.questionnaire_version
            && self.site_id == episode.site_id
            && self.pseudonym == episode.pseudonym
            && self.responses == episode.responses
    }
}

#[derive(Debug, Default)]
pub struct EpisodeStore {
    // Per audit, keyed by episode key.
    episodes: RwLock<BTreeMap<String, BTreeMap<String, Episode>>>,
}

impl EpisodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new episode, or return the existing one for an identical
    /// retry. A resubmission with the same key but different content is a
    /// conflict; amendments go through [`EpisodeStore::amend`].
    pub fn submit(&self, draft: EpisodeDraft) -> Result<Episode, SubmitError> {
        let mut episodes = write_lock(&self.episodes);
        let audit = episodes.entry(draft.audit_id.clone()).or_default();

        if let Some(existing) = audit.get(&draft.episode_key) {
            if draft.matches(existing) {
                debug!(
                    audit_id = %draft.audit_id,
                    episode_key = %draft.episode_key,
                    "duplicate submission, returning existing episode"
                );
                return Ok(existing.clone());
            }
            return Err(SubmitError::ConflictingResubmission {
                episode_key: draft.episode_key,
            });
        }

        let episode = Episode {
            id: Uuid::new_v4(),
            audit_id: draft.audit_id,
            questionnaire_version: draft.questionnaire_version,
            site_id: draft.site_id,
            episode_key: draft.episode_key,
            pseudonym: draft.pseudonym,
            submitted_at: Utc::now(),
            responses: draft.responses,
            derived: draft.derived,
            status: EpisodeStatus::Validated,
            history: Vec::new(),
        };
        info!(
            audit_id = %episode.audit_id,
            episode_key = %episode.episode_key,
            version = episode.questionnaire_version,
            "stored episode"
        );
        audit.insert(episode.episode_key.clone(), episode.clone());
        Ok(episode)
    }

    /// Replace an episode's responses, retaining the prior submission in
    /// append-only history. The questionnaire version reference never
    /// changes; validation against it happens in the capture engine.
    pub fn amend(
        &self,
        audit_id: &str,
        episode_key: &str,
        responses: ResponseSet,
        derived: BTreeMap<String, f64>,
    ) -> Result<Episode, SubmitError> {
        let mut episodes = write_lock(&self.episodes);
        let episode = episodes
            .get_mut(audit_id)
            .and_then(|audit| audit.get_mut(episode_key))
            .ok_or_else(|| SubmitError::UnknownEpisode {
                audit_id: audit_id.to_string(),
                episode_key: episode_key.to_string(),
            })?;

        episode.history.push(Amendment {
            submitted_at: episode.submitted_at,
            responses: std::mem::take(&mut episode.responses),
            derived: std::mem::take(&mut episode.derived),
        });
        episode.responses = responses;
        episode.derived = derived;
        episode.submitted_at = Utc::now();
        episode.status = EpisodeStatus::Amended;

        info!(
            audit_id,
            episode_key,
            submissions = episode.submission_count(),
            "amended episode"
        );
        Ok(episode.clone())
    }

    pub fn get(&self, audit_id: &str, episode_key: &str) -> Option<Episode> {
        let episodes = read_lock(&self.episodes);
        episodes.get(audit_id)?.get(episode_key).cloned()
    }

    pub fn get_by_id(&self, audit_id: &str, id: Uuid) -> Option<Episode> {
        let episodes = read_lock(&self.episodes);
        episodes
            .get(audit_id)?
            .values()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Page through an audit's episodes in episode-key order.
    pub fn list(&self, audit_id: &str, offset: usize, limit: usize) -> Vec<Episode> {
        let episodes = read_lock(&self.episodes);
        match episodes.get(audit_id) {
            Some(audit) => audit.values().skip(offset).take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn count(&self, audit_id: &str) -> usize {
        let episodes = read_lock(&self.episodes);
        episodes.get(audit_id).map_or(0, BTreeMap::len)
    }

    /// Retention-expiry deletion: remove episodes last submitted before the
    /// cutoff. The only way episodes leave the store.
    pub fn delete_submitted_before(&self, audit_id: &str, cutoff: DateTime<Utc>) -> usize {
        let mut episodes = write_lock(&self.episodes);
        let Some(audit) = episodes.get_mut(audit_id) else {
            return 0;
        };
        let before = audit.len();
        audit.retain(|_, episode| episode.submitted_at >= cutoff);
        let removed = before - audit.len();
        if removed > 0 {
            info!(audit_id, removed, "deleted episodes past retention");
        }
        removed
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use clinaudit_model::ResponseValue;

    fn draft(key: &str) -> EpisodeDraft {
        let mut responses = ResponseSet::new();
        responses.insert(
            "Q1".to_string(),
            ResponseValue::Choice("Yes".to_string()),
        );
        EpisodeDraft {
            audit_id: "hip-fracture-2026".to_string(),
            questionnaire_version: 1,
            site_id: "SITE1".to_string(),
            episode_key: key.to_string(),
            pseudonym: None,
            responses,
            derived: BTreeMap::new(),
        }
    }

    #[test]
    fn identical_retry_returns_the_same_episode() {
        let store = EpisodeStore::new();
        let first = store.submit(draft("SITE1-001")).expect("stored");
        let second = store.submit(draft("SITE1-001")).expect("idempotent");
        assert_eq!(first.id, second.id);
        assert_eq!(store.count("hip-fracture-2026"), 1);
    }

    #[test]
    fn concurrent_identical_submissions_store_one_episode() {
        let store = std::sync::Arc::new(EpisodeStore::new());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || store.submit(draft("SITE1-001")))
            })
            .collect();
        let stored: Vec<Episode> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread").expect("stored"))
            .collect();

        assert_eq!(stored[0].id, stored[1].id);
        assert_eq!(store.count("hip-fracture-2026"), 1);
    }

    #[test]
    fn changed_content_with_same_key_conflicts() {
        let store = EpisodeStore::new();
        store.submit(draft("SITE1-001")).expect("stored");

        let mut changed = draft("SITE1-001");
        changed.responses.insert(
            "Q1".to_string(),
            ResponseValue::Choice("No".to_string()),
        );
        let err = store.submit(changed).expect_err("conflict");
        assert!(matches!(
            err,
            SubmitError::ConflictingResubmission { episode_key } if episode_key == "SITE1-001"
        ));
    }

    #[test]
    fn amend_keeps_history_and_version() {
        let store = EpisodeStore::new();
        let original = store.submit(draft("SITE1-001")).expect("stored");

        let mut responses = ResponseSet::new();
        responses.insert("Q1".to_string(), ResponseValue::Choice("No".to_string()));
        let amended = store
            .amend("hip-fracture-2026", "SITE1-001", responses, BTreeMap::new())
            .expect("amended");

        assert_eq!(amended.id, original.id);
        assert_eq!(amended.questionnaire_version, original.questionnaire_version);
        assert_eq!(amended.status, EpisodeStatus::Amended);
        assert_eq!(amended.submission_count(), 2);
        assert_eq!(amended.history[0].responses, original.responses);
    }

    #[test]
    fn amending_an_unknown_episode_fails() {
        let store = EpisodeStore::new();
        let err = store
            .amend("hip-fracture-2026", "SITE1-404", ResponseSet::new(), BTreeMap::new())
            .expect_err("unknown");
        assert!(matches!(err, SubmitError::UnknownEpisode { .. }));
    }

    #[test]
    fn listing_pages_in_key_order() {
        let store = EpisodeStore::new();
        for key in ["SITE1-003", "SITE1-001", "SITE1-002"] {
            store.submit(draft(key)).expect("stored");
        }
        let page = store.list("hip-fracture-2026", 1, 1);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].episode_key, "SITE1-002");
        assert!(store.list("other-audit", 0, 10).is_empty());
    }

    #[test]
    fn retention_deletion_removes_old_episodes() {
        let store = EpisodeStore::new();
        store.submit(draft("SITE1-001")).expect("stored");
        assert_eq!(
            store.delete_submitted_before("hip-fracture-2026", Utc::now() - chrono::Duration::days(1)),
            0
        );
        assert_eq!(
            store.delete_submitted_before("hip-fracture-2026", Utc::now() + chrono::Duration::seconds(1)),
            1
        );
        assert_eq!(store.count("hip-fracture-2026"), 0);
    }
}

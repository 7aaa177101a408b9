//! Published questionnaire versions.
//!
//! Versions are immutable once published: editing an audit's questionnaire
//! publishes a new version with the next number, and historic versions stay
//! readable so old episodes can always be interpreted against the exact
//! question set they answered.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;
use clinaudit_model::{InvalidDefinition, QuestionDefinition, QuestionnaireVersion};
use clinaudit_validate::CompiledQuestionnaire;
use tracing::info;

#[derive(Debug, Default)]
pub struct VersionStore {
    // Per audit, versions in publication order; index i holds version i+1.
    versions: RwLock<BTreeMap<String, Vec<CompiledQuestionnaire>>>,
}

impl VersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new questionnaire version for an audit.
    ///
    /// Runs the full definition checks; the returned compiled questionnaire
    /// carries the assigned version number and the resolved conditional
    /// plan. A rejected definition changes nothing.
    pub fn publish(
        &self,
        audit_id: &str,
        questions: Vec<QuestionDefinition>,
    ) -> Result<CompiledQuestionnaire, InvalidDefinition> {
        let mut versions = write_lock(&self.versions);
        let history = versions.entry(audit_id.to_string()).or_default();

        let version = QuestionnaireVersion {
            audit_id: audit_id.to_string(),
            version: history.len() as u32 + 1,
            questions,
            published_at: Utc::now(),
        };
        let compiled = CompiledQuestionnaire::compile(version)?;
        history.push(compiled.clone());

        let published = compiled.version();
        info!(
            audit_id,
            version = published.version,
            questions = published.question_count(),
            "published questionnaire version"
        );
        Ok(compiled)
    }

    /// Fetch one historic version.
    pub fn get(&self, audit_id: &str, version: u32) -> Option<CompiledQuestionnaire> {
        let versions = read_lock(&self.versions);
        let history = versions.get(audit_id)?;
        history.get(version.checked_sub(1)? as usize).cloned()
    }

    /// The audit's current published version, if any.
    pub fn latest(&self, audit_id: &str) -> Option<CompiledQuestionnaire> {
        let versions = read_lock(&self.versions);
        versions.get(audit_id)?.last().cloned()
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
    use clinaudit_model::{QuestionType, ValidationRules, VariableType};

    fn question(code: &str) -> QuestionDefinition {
        QuestionDefinition {
            code: code.to_string(),
            text: format!("Question {code}"),
            question_type: QuestionType::Boolean,
            required: false,
            help_text: None,
            options: Vec::new(),
            rules: ValidationRules::default(),
            condition: None,
            variable_name: code.to_lowercase(),
            variable_type: VariableType::Boolean,
            validated_instrument: None,
            free_text_justification: None,
        }
    }

    #[test]
    fn versions_number_from_one_per_audit() {
        let store = VersionStore::new();
        let v1 = store.publish("copd", vec![question("Q1")]).expect("v1");
        let v2 = store
            .publish("copd", vec![question("Q1"), question("Q2")])
            .expect("v2");
        let other = store.publish("sepsis", vec![question("Q1")]).expect("v1");

        assert_eq!(v1.version().version, 1);
        assert_eq!(v2.version().version, 2);
        assert_eq!(other.version().version, 1);
    }

    #[test]
    fn historic_versions_stay_readable() {
        let store = VersionStore::new();
        store.publish("copd", vec![question("Q1")]).expect("v1");
        store
            .publish("copd", vec![question("Q1"), question("Q2")])
            .expect("v2");

        let v1 = store.get("copd", 1).expect("still readable");
        assert_eq!(v1.version().question_count(), 1);
        let latest = store.latest("copd").expect("latest");
        assert_eq!(latest.version().version, 2);
    }

    #[test]
    fn rejected_definition_publishes_nothing() {
        let store = VersionStore::new();
        let err = store
            .publish("copd", vec![question("Q1"), question("Q1")])
            .expect_err("duplicate code");
        assert!(!err.issues.is_empty());
        assert!(store.latest("copd").is_none());
    }

    #[test]
    fn version_zero_is_never_found() {
        let store = VersionStore::new();
        store.publish("copd", vec![question("Q1")]).expect("v1");
        assert!(store.get("copd", 0).is_none());
    }
}

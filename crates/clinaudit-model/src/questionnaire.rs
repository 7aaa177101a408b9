use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::question::QuestionDefinition;

/// An immutable, numbered question-set snapshot for one audit.
///
/// Published versions are never mutated or renumbered; editing a
/// questionnaire produces a new version with a strictly greater number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireVersion {
    pub audit_id: String,
    /// Monotonically increasing within one audit, starting at 1.
    pub version: u32,
    /// Questions in presentation order.
    pub questions: Vec<QuestionDefinition>,
    pub published_at: DateTime<Utc>,
}

impl QuestionnaireVersion {
    /// Look up a question by its code.
    pub fn question(&self, code: &str) -> Option<&QuestionDefinition> {
        self.questions.iter().find(|q| q.code == code)
    }

    /// Position of a question code in presentation order.
    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.code == code)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{QuestionType, ValidationRules, VariableType};

    fn q(code: &str) -> QuestionDefinition {
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
    fn lookup_by_code() {
        let version = QuestionnaireVersion {
            audit_id: "hip-fracture".to_string(),
            version: 1,
            questions: vec![q("Q1"), q("Q2")],
            published_at: Utc::now(),
        };
        assert_eq!(version.index_of("Q2"), Some(1));
        assert!(version.question("Q3").is_none());
    }
}

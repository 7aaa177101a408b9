//! Methodological quality scoring and design feedback.
//!
//! Pure functions over a question list: no storage, no clock, no I/O.
//! Scores weight structure (non-free-text fraction), validation coverage,
//! validated-instrument use, and machine-safe naming; domain coverage is a
//! fixed keyword heuristic over question text. The same questions always
//! produce the same score, so drafts can be re-scored on every edit.

use clinaudit_model::QuestionDefinition;
use serde::{Deserialize, Serialize};

mod feedback;
mod instruments;

pub use feedback::{QuestionFeedback, analyze_question};
pub use instruments::{Instrument, VALIDATED_INSTRUMENTS, matching_instruments};

/// The five domains a complete clinical audit questionnaire covers, with
/// the keywords that signal each.
const DOMAINS: [(&str, &[&str]); 5] = [
    ("demographics", &["age", "sex", "gender", "ethnicity"]),
    (
        "clinical_presentation",
        &["diagnosis", "symptom", "presentation"],
    ),
    (
        "intervention",
        &["treatment", "surgery", "procedure", "intervention"],
    ),
    (
        "outcomes",
        &["outcome", "complication", "mortality", "readmission"],
    ),
    ("process_metrics", &["time", "delay", "waiting", "duration"]),
];

/// Quality summary for a questionnaire draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Weighted overall score: 0.4 structure + 0.3 validation +
    /// 0.2 instrument + 0.1 naming.
    pub methodological_quality: f64,
    /// How readily the captured data will analyse: 0.6 structure +
    /// 0.3 validation + 0.1 naming.
    pub analysability: f64,
    pub structure_pct: f64,
    pub validation_pct: f64,
    pub instrument_pct: f64,
    pub naming_pct: f64,
    pub completeness_pct: f64,
    pub missing_domains: Vec<String>,
}

/// Score a question list. An empty questionnaire scores zero everywhere
/// and misses every domain.
pub fn score(questions: &[QuestionDefinition]) -> QualityScore {
    let total = questions.len();
    let (completeness_pct, missing_domains) = domain_coverage(questions);
    if total == 0 {
        return QualityScore {
            methodological_quality: 0.0,
            analysability: 0.0,
            structure_pct: 0.0,
            validation_pct: 0.0,
            instrument_pct: 0.0,
            naming_pct: 0.0,
            completeness_pct,
            missing_domains,
        };
    }

    let structured = questions.iter().filter(|q| !q.question_type.is_text()).count();
    let validated = questions.iter().filter(|q| !q.rules.is_empty()).count();
    let instrumented = questions
        .iter()
        .filter(|q| q.validated_instrument.is_some())
        .count();
    let named = questions
        .iter()
        .filter(|q| !q.variable_name.trim().is_empty())
        .count();

    let pct = |count: usize| count as f64 / total as f64 * 100.0;
    let structure_pct = pct(structured);
    let validation_pct = pct(validated);
    let instrument_pct = pct(instrumented);
    let naming_pct = pct(named);

    QualityScore {
        methodological_quality: round2(
            structure_pct * 0.4 + validation_pct * 0.3 + instrument_pct * 0.2 + naming_pct * 0.1,
        ),
        analysability: round2(structure_pct * 0.6 + validation_pct * 0.3 + naming_pct * 0.1),
        structure_pct: round2(structure_pct),
        validation_pct: round2(validation_pct),
        instrument_pct: round2(instrument_pct),
        naming_pct: round2(naming_pct),
        completeness_pct,
        missing_domains,
    }
}

fn domain_coverage(questions: &[QuestionDefinition]) -> (f64, Vec<String>) {
    let mut missing = Vec::new();
    let mut covered = 0usize;
    for (domain, keywords) in DOMAINS {
        let hit = questions.iter().any(|q| {
            let text = q.text.to_lowercase();
            keywords.iter().any(|kw| text.contains(kw))
        });
        if hit {
            covered += 1;
        } else {
            missing.push(domain.to_string());
        }
    }
    let pct = covered as f64 / DOMAINS.len() as f64 * 100.0;
    (round2(pct), missing)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinaudit_model::{QuestionType, ValidationRules, VariableType};

    fn question(code: &str, question_type: QuestionType, text: &str) -> QuestionDefinition {
        QuestionDefinition {
            code: code.to_string(),
            text: text.to_string(),
            question_type,
            required: false,
            help_text: None,
            options: Vec::new(),
            rules: ValidationRules::default(),
            condition: None,
            variable_name: code.to_lowercase(),
            variable_type: VariableType::String,
            validated_instrument: None,
            free_text_justification: None,
        }
    }

    #[test]
    fn empty_questionnaire_scores_zero() {
        let result = score(&[]);
        assert_eq!(result.methodological_quality, 0.0);
        assert_eq!(result.analysability, 0.0);
        assert_eq!(result.missing_domains.len(), 5);
    }

    #[test]
    fn weighted_scores_from_counts() {
        // 10 questions: 8 structured, 5 with validation rules, 0 with
        // instruments, all named.
        let mut questions = Vec::new();
        for i in 0..8 {
            let mut q = question(&format!("Q{i}"), QuestionType::Numeric, "Numeric item");
            if i < 5 {
                q.rules.min = Some(0.0);
            }
            questions.push(q);
        }
        questions.push(question("Q8", QuestionType::TextShort, "Free text item"));
        questions.push(question("Q9", QuestionType::TextLong, "Free text item"));

        let result = score(&questions);
        assert_eq!(result.structure_pct, 80.0);
        assert_eq!(result.validation_pct, 50.0);
        assert_eq!(result.instrument_pct, 0.0);
        assert_eq!(result.naming_pct, 100.0);
        // 80*0.4 + 50*0.3 + 0*0.2 + 100*0.1
        assert_eq!(result.methodological_quality, 57.0);
        // 80*0.6 + 50*0.3 + 100*0.1
        assert_eq!(result.analysability, 73.0);
    }

    #[test]
    fn domain_coverage_over_question_text() {
        let questions = vec![
            question("Q1", QuestionType::Numeric, "Patient age at admission"),
            question("Q2", QuestionType::CategoricalSingle, "Primary diagnosis"),
            question("Q3", QuestionType::Date, "Date of surgery"),
        ];
        let result = score(&questions);
        assert_eq!(result.completeness_pct, 60.0);
        assert_eq!(
            result.missing_domains,
            vec!["outcomes".to_string(), "process_metrics".to_string()]
        );
    }
}

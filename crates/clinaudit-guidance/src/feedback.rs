//! Per-question design feedback.

use clinaudit_model::{QuestionDefinition, QuestionType};
use serde::{Deserialize, Serialize};

use crate::instruments::matching_instruments;

/// Wording that invites inconsistent interpretation between data clerks.
const AMBIGUOUS_WORDS: [&str; 4] = ["sometimes", "usually", "often", "rarely"];

/// Methodological warnings and suggestions for one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl QuestionFeedback {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Review one question draft for methodological weaknesses.
///
/// Feedback is advisory; none of it blocks publication (hard authoring
/// defects are rejected at publish time instead).
pub fn analyze_question(question: &QuestionDefinition) -> QuestionFeedback {
    let mut feedback = QuestionFeedback::default();
    let text_lower = question.text.to_lowercase();

    if question.question_type.is_text() {
        feedback
            .warnings
            .push("Free text is difficult to analyse quantitatively".to_string());
        feedback
            .suggestions
            .push("Consider using categorical options or validated scales instead".to_string());
        if question.free_text_justification.is_none() {
            feedback
                .warnings
                .push("Free text requires a justification".to_string());
        }
    }

    if matches!(
        question.question_type,
        QuestionType::CategoricalSingle | QuestionType::CategoricalMultiple
    ) {
        if question.options.len() < 2 {
            feedback
                .warnings
                .push("Categorical questions need at least 2 options".to_string());
        }
        if question.options.len() > 10 {
            feedback
                .warnings
                .push("Too many options may confuse respondents".to_string());
            feedback
                .suggestions
                .push("Consider grouping options or using hierarchical questions".to_string());
        }
        if question
            .options
            .iter()
            .any(|opt| opt.to_lowercase().contains(" to ") || opt.contains('-'))
        {
            feedback
                .suggestions
                .push("Ensure numeric ranges don't overlap".to_string());
        }
    }

    if question.question_type == QuestionType::Numeric
        && question.rules.min.is_none()
        && question.rules.max.is_none()
    {
        feedback
            .warnings
            .push("Numeric questions should have min/max validation".to_string());
        feedback
            .suggestions
            .push("Set plausible clinical ranges to catch data entry errors".to_string());
    }

    for instrument in matching_instruments(&question.text) {
        feedback.suggestions.push(format!(
            "Consider using the validated {} instrument for {}",
            instrument.name,
            instrument.description.to_lowercase()
        ));
    }

    if question.text.chars().count() < 10 {
        feedback
            .suggestions
            .push("Question text is very short, consider adding more context".to_string());
    }
    if question.text.chars().count() > 200 {
        feedback
            .suggestions
            .push("Question text is very long, consider breaking it up".to_string());
    }
    if AMBIGUOUS_WORDS.iter().any(|word| text_lower.contains(word)) {
        feedback.suggestions.push(
            "Avoid ambiguous frequency words, use specific timeframes instead".to_string(),
        );
    }
    if text_lower.contains(" and ") {
        feedback.suggestions.push(
            "This may be a double-barreled question, consider splitting it".to_string(),
        );
    }
    if question.help_text.is_none() {
        feedback
            .suggestions
            .push("Add help text to guide data entry".to_string());
    }

    feedback
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinaudit_model::{ValidationRules, VariableType};

    fn question(question_type: QuestionType, text: &str) -> QuestionDefinition {
        QuestionDefinition {
            code: "Q1".to_string(),
            text: text.to_string(),
            question_type,
            required: false,
            help_text: Some("Record as documented in the notes".to_string()),
            options: Vec::new(),
            rules: ValidationRules::default(),
            condition: None,
            variable_name: "q1".to_string(),
            variable_type: VariableType::String,
            validated_instrument: None,
            free_text_justification: None,
        }
    }

    #[test]
    fn unjustified_free_text_gets_two_warnings() {
        let q = question(QuestionType::TextLong, "Describe the complication in detail");
        let feedback = analyze_question(&q);
        assert!(feedback.has_warnings());
        assert_eq!(feedback.warnings.len(), 2);

        let mut justified = q.clone();
        justified.free_text_justification =
            Some("Narrative needed for morbidity review".to_string());
        assert_eq!(analyze_question(&justified).warnings.len(), 1);
    }

    #[test]
    fn unbounded_numeric_is_flagged() {
        let q = question(QuestionType::Numeric, "Serum sodium at admission in mmol/L");
        let feedback = analyze_question(&q);
        assert!(
            feedback
                .warnings
                .iter()
                .any(|w| w.contains("min/max validation"))
        );

        let mut bounded = q.clone();
        bounded.rules.min = Some(100.0);
        bounded.rules.max = Some(180.0);
        assert!(!analyze_question(&bounded).has_warnings());
    }

    #[test]
    fn instrument_names_in_text_are_suggested() {
        let q = question(QuestionType::Numeric, "PHQ-9 total score at baseline?");
        let mut q = q;
        q.rules.min = Some(0.0);
        q.rules.max = Some(27.0);
        let feedback = analyze_question(&q);
        assert!(feedback.suggestions.iter().any(|s| s.contains("PHQ-9")));
    }

    #[test]
    fn ambiguous_and_double_barreled_wording() {
        let q = question(
            QuestionType::Boolean,
            "Does the patient usually mobilise and eat independently?",
        );
        let feedback = analyze_question(&q);
        assert!(
            feedback
                .suggestions
                .iter()
                .any(|s| s.contains("ambiguous frequency"))
        );
        assert!(
            feedback
                .suggestions
                .iter()
                .any(|s| s.contains("double-barreled"))
        );
    }

    #[test]
    fn option_heavy_categorical_is_flagged() {
        let mut q = question(QuestionType::CategoricalSingle, "Admission source for this episode");
        q.options = (0..12).map(|i| format!("Source {i}")).collect();
        let feedback = analyze_question(&q);
        assert!(
            feedback
                .warnings
                .iter()
                .any(|w| w.contains("Too many options"))
        );
    }
}

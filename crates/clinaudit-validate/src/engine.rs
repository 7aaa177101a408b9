//! Submission validation engine.
//!
//! Validates a raw response payload against a published questionnaire
//! version: conditional activity first, then per-question type and
//! constraint checks. All violations across all active questions are
//! collected before returning, so a capture client can report the complete
//! error list in one round trip.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clinaudit_model::response::{
    DATE_FORMAT, DATETIME_FORMAT, TIME_FORMAT, TIME_FORMAT_NO_SECONDS,
};
use clinaudit_model::{
    InvalidDefinition, QuestionDefinition, QuestionType, QuestionnaireVersion, RawResponses,
    ResponseSet, ResponseValue, ValidationFailure, ValidationIssue, ValidationRules,
};
use serde_json::Value;
use tracing::debug;

use crate::conditional::EvaluationPlan;
use crate::definition::check_definition;

/// A published questionnaire version with its conditional-logic plan
/// resolved once at publish time.
#[derive(Debug, Clone)]
pub struct CompiledQuestionnaire {
    version: Arc<QuestionnaireVersion>,
    plan: EvaluationPlan,
}

impl CompiledQuestionnaire {
    /// Run the publish-time definition checks and resolve the plan.
    pub fn compile(version: QuestionnaireVersion) -> Result<Self, InvalidDefinition> {
        let plan = check_definition(&version.questions)?;
        Ok(Self {
            version: Arc::new(version),
            plan,
        })
    }

    pub fn version(&self) -> &Arc<QuestionnaireVersion> {
        &self.version
    }

    /// Active question codes for a partial raw submission.
    pub fn active_questions(&self, raw: &RawResponses) -> BTreeSet<String> {
        self.plan.active_questions(&self.version.questions, raw)
    }

    /// Validate a raw submission into a canonical typed ResponseSet.
    ///
    /// Values for inactive or unknown codes are dropped silently (the
    /// source UI may not have hidden a field in time); required active
    /// questions without an answer and every constraint violation are
    /// reported together.
    pub fn validate(&self, raw: &RawResponses) -> Result<ResponseSet, ValidationFailure> {
        let active = self.active_questions(raw);
        let mut issues = Vec::new();
        let mut responses = ResponseSet::new();

        for question in &self.version.questions {
            if !active.contains(&question.code) {
                continue;
            }
            match raw.get(&question.code) {
                None | Some(Value::Null) => {
                    if question.required {
                        issues.push(ValidationIssue::MissingRequired {
                            code: question.code.clone(),
                        });
                    }
                }
                Some(value) => match check_value(question, value) {
                    Ok(validated) => {
                        responses.insert(question.code.clone(), validated);
                    }
                    Err(reason) => issues.push(ValidationIssue::InvalidValue {
                        code: question.code.clone(),
                        reason,
                    }),
                },
            }
        }

        if issues.is_empty() {
            Ok(responses)
        } else {
            debug!(
                version = self.version.version,
                issue_count = issues.len(),
                "submission rejected"
            );
            Err(ValidationFailure { issues })
        }
    }
}

/// Type-check and constrain one answer; returns the canonical typed value
/// or a human-readable reason.
fn check_value(question: &QuestionDefinition, value: &Value) -> Result<ResponseValue, String> {
    match question.question_type {
        QuestionType::CategoricalSingle => check_choice(question, value),
        QuestionType::CategoricalMultiple => check_choices(question, value),
        QuestionType::Ordinal => {
            if question.is_multi_select() {
                check_choices(question, value)
            } else {
                check_choice(question, value)
            }
        }
        QuestionType::Numeric => check_number(&question.rules, value),
        QuestionType::Date => check_date(value),
        QuestionType::Time => check_time(value),
        QuestionType::DateTime => check_datetime(value),
        QuestionType::TextShort | QuestionType::TextLong => check_text(&question.rules, value),
        QuestionType::Boolean => match value {
            Value::Bool(b) => Ok(ResponseValue::Bool(*b)),
            _ => Err("must be exactly true or false".to_string()),
        },
    }
}

fn check_choice(question: &QuestionDefinition, value: &Value) -> Result<ResponseValue, String> {
    let Value::String(label) = value else {
        return Err("expected a single option label".to_string());
    };
    if question.has_option(label) {
        Ok(ResponseValue::Choice(label.clone()))
    } else {
        Err(format!("'{label}' is not a defined option"))
    }
}

fn check_choices(question: &QuestionDefinition, value: &Value) -> Result<ResponseValue, String> {
    let Value::Array(items) = value else {
        return Err("expected a list of option labels".to_string());
    };

    let mut labels = Vec::with_capacity(items.len());
    let mut seen = BTreeSet::new();
    for item in items {
        let Value::String(label) = item else {
            return Err("expected a list of option labels".to_string());
        };
        if !question.has_option(label) {
            return Err(format!("'{label}' is not a defined option"));
        }
        if !seen.insert(label.as_str()) {
            return Err(format!("duplicate selection '{label}'"));
        }
        labels.push(label.clone());
    }

    if let Some(min) = question.rules.min_selections
        && labels.len() < min
    {
        return Err(format!("requires at least {min} selection(s)"));
    }
    if let Some(max) = question.rules.max_selections
        && labels.len() > max
    {
        return Err(format!("allows at most {max} selection(s)"));
    }
    Ok(ResponseValue::Choices(labels))
}

fn check_number(rules: &ValidationRules, value: &Value) -> Result<ResponseValue, String> {
    // Keep the lexical form for precision checking: "36.50" is finer than
    // one decimal place even though it equals 36.5.
    let lexical = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err("must be a number".to_string()),
    };
    let number: f64 = lexical
        .parse()
        .map_err(|_| format!("'{lexical}' is not a number"))?;
    if !number.is_finite() {
        return Err("must be a finite number".to_string());
    }

    if let Some(min) = rules.min
        && number < min
    {
        return Err(format!("below min {min}"));
    }
    if let Some(max) = rules.max
        && number > max
    {
        return Err(format!("exceeds max {max}"));
    }
    if let Some(places) = rules.decimal_places
        && decimal_places(&lexical) > places
    {
        return Err(format!("more than {places} decimal place(s)"));
    }
    Ok(ResponseValue::Number(number))
}

/// Number of digits after the decimal point in the submitted form.
fn decimal_places(lexical: &str) -> u32 {
    match lexical.split_once('.') {
        Some((_, frac)) => frac.chars().take_while(|c| c.is_ascii_digit()).count() as u32,
        None => 0,
    }
}

// chrono parsing tolerates unpadded components ("2026-2-28"); only inputs
// that re-render byte-identical through the same format are canonical.

fn check_date(value: &Value) -> Result<ResponseValue, String> {
    let Value::String(s) = value else {
        return Err("expected an ISO 8601 date string".to_string());
    };
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .filter(|d| d.format(DATE_FORMAT).to_string() == *s)
        .map(ResponseValue::Date)
        .ok_or_else(|| format!("'{s}' is not a valid ISO 8601 date (YYYY-MM-DD)"))
}

fn check_time(value: &Value) -> Result<ResponseValue, String> {
    let Value::String(s) = value else {
        return Err("expected an ISO 8601 time string".to_string());
    };
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .ok()
        .filter(|t| t.format(TIME_FORMAT).to_string() == *s)
        .or_else(|| {
            NaiveTime::parse_from_str(s, TIME_FORMAT_NO_SECONDS)
                .ok()
                .filter(|t| t.format(TIME_FORMAT_NO_SECONDS).to_string() == *s)
        })
        .map(ResponseValue::Time)
        .ok_or_else(|| format!("'{s}' is not a valid ISO 8601 time (HH:MM[:SS])"))
}

fn check_datetime(value: &Value) -> Result<ResponseValue, String> {
    let Value::String(s) = value else {
        return Err("expected an ISO 8601 datetime string".to_string());
    };
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .filter(|dt| dt.format(DATETIME_FORMAT).to_string() == *s)
        .map(ResponseValue::DateTime)
        .ok_or_else(|| format!("'{s}' is not a valid ISO 8601 datetime (YYYY-MM-DDTHH:MM:SS)"))
}

fn check_text(rules: &ValidationRules, value: &Value) -> Result<ResponseValue, String> {
    let Value::String(text) = value else {
        return Err("expected text".to_string());
    };

    if let Some(max_length) = rules.max_length {
        let length = text.chars().count();
        if length > max_length {
            return Err(format!("length {length} exceeds max length {max_length}"));
        }
    }
    if let Some(pattern) = &rules.pattern {
        // The pattern compiled at publish time; a failure here means the
        // anchored wrapper itself, so treat it as a non-match.
        let anchored = format!("^(?:{pattern})$");
        match regex::Regex::new(&anchored) {
            Ok(re) if re.is_match(text) => {}
            _ => return Err(format!("does not match required pattern {pattern}")),
        }
    }
    Ok(ResponseValue::Text(text.clone()))
}

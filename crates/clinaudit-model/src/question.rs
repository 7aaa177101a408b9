use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Question types for structured clinical data capture.
///
/// Every stored answer carries one of these tags; the validation engine
/// dispatches over the tag rather than inspecting raw payload shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Exactly one choice from a fixed option list.
    CategoricalSingle,
    /// Zero or more choices from a fixed option list.
    CategoricalMultiple,
    /// Ordered choice scale (e.g. severity grades).
    Ordinal,
    Numeric,
    Date,
    Time,
    DateTime,
    /// Short free text (single line).
    TextShort,
    /// Long free text (narrative).
    TextLong,
    Boolean,
}

impl QuestionType {
    /// Returns true for free-text types, which resist quantitative analysis.
    pub fn is_text(&self) -> bool {
        matches!(self, QuestionType::TextShort | QuestionType::TextLong)
    }

    /// Returns true if the type requires a non-empty option list.
    pub fn needs_options(&self) -> bool {
        matches!(
            self,
            QuestionType::CategoricalSingle
                | QuestionType::CategoricalMultiple
                | QuestionType::Ordinal
        )
    }

    /// Returns true for the temporal types validated as strict ISO 8601.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            QuestionType::Date | QuestionType::Time | QuestionType::DateTime
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::CategoricalSingle => "categorical_single",
            QuestionType::CategoricalMultiple => "categorical_multiple",
            QuestionType::Ordinal => "ordinal",
            QuestionType::Numeric => "numeric",
            QuestionType::Date => "date",
            QuestionType::Time => "time",
            QuestionType::DateTime => "datetime",
            QuestionType::TextShort => "text_short",
            QuestionType::TextLong => "text_long",
            QuestionType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "categorical_single" => Ok(QuestionType::CategoricalSingle),
            "categorical_multiple" => Ok(QuestionType::CategoricalMultiple),
            "ordinal" => Ok(QuestionType::Ordinal),
            "numeric" => Ok(QuestionType::Numeric),
            "date" => Ok(QuestionType::Date),
            "time" => Ok(QuestionType::Time),
            "datetime" => Ok(QuestionType::DateTime),
            "text_short" => Ok(QuestionType::TextShort),
            "text_long" => Ok(QuestionType::TextLong),
            "boolean" => Ok(QuestionType::Boolean),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// Analysis-output variable type for the data dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    Categorical,
    Numeric,
    String,
    Date,
    Boolean,
}

/// Type-specific validation constraints for a question.
///
/// Only the fields relevant to the question's type are consulted; the rest
/// are ignored by the validation engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Inclusive lower bound for numeric answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Maximum number of decimal places for numeric answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,
    /// Maximum character length for text answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regex a text answer must match in full.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Minimum number of selections for multi-choice answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_selections: Option<usize>,
    /// Maximum number of selections for multi-choice answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_selections: Option<usize>,
}

impl ValidationRules {
    /// Returns true when no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.decimal_places.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.min_selections.is_none()
            && self.max_selections.is_none()
    }
}

/// Conditional display logic: the question is active only when the
/// referenced question's current answer satisfies the comparison.
///
/// The `in` operator carries an explicit value list, so option labels
/// containing commas stay unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum Condition {
    Equals { depends_on: String, value: String },
    NotEquals { depends_on: String, value: String },
    In { depends_on: String, values: Vec<String> },
}

impl Condition {
    /// Code of the question this condition reads.
    pub fn depends_on(&self) -> &str {
        match self {
            Condition::Equals { depends_on, .. }
            | Condition::NotEquals { depends_on, .. }
            | Condition::In { depends_on, .. } => depends_on,
        }
    }

    /// Evaluates the comparison against the referenced question's answer,
    /// rendered in its canonical string form.
    pub fn matches(&self, answer: &str) -> bool {
        match self {
            Condition::Equals { value, .. } => answer == value,
            Condition::NotEquals { value, .. } => answer != value,
            Condition::In { values, .. } => values.iter().any(|v| v == answer),
        }
    }
}

/// A single question within a questionnaire version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    /// Stable human-readable token, unique within a version (e.g. "Q1").
    pub code: String,
    /// The question as shown to the data-entry clinician.
    pub text: String,
    pub question_type: QuestionType,
    /// Whether an answer is mandatory when the question is active.
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    /// Ordered choice labels; non-empty exactly for categorical/ordinal types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "ValidationRules::is_empty")]
    pub rules: ValidationRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Machine-safe identifier used in analysis output, unique per version.
    pub variable_name: String,
    pub variable_type: VariableType,
    /// Free label referencing a validated instrument (e.g. "PHQ-9").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_instrument: Option<String>,
    /// Why free text is needed, for text-type questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text_justification: Option<String>,
}

impl QuestionDefinition {
    /// Returns true if `label` is one of this question's defined options.
    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|o| o == label)
    }

    /// Multi-select applies to categorical-multiple always, and to ordinal
    /// questions that explicitly allow more than one selection.
    pub fn is_multi_select(&self) -> bool {
        match self.question_type {
            QuestionType::CategoricalMultiple => true,
            QuestionType::Ordinal => self.rules.max_selections.is_some_and(|max| max > 1),
            _ => false,
        }
    }
}

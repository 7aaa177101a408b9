//! Publish-time questionnaire definition checks.
//!
//! A questionnaire is checked in full before it becomes an immutable
//! version; every defect is collected so the author sees the complete list
//! in one pass. Once a version is published these checks can never fail
//! again for it.

use std::collections::BTreeSet;

use clinaudit_model::{DefinitionIssue, InvalidDefinition, QuestionDefinition};

use crate::conditional::EvaluationPlan;

/// Run all authoring-time checks over an ordered question set.
///
/// Returns the resolved conditional-logic plan on success so the caller can
/// keep it alongside the published version.
pub fn check_definition(
    questions: &[QuestionDefinition],
) -> Result<EvaluationPlan, InvalidDefinition> {
    let mut issues = Vec::new();

    check_codes(questions, &mut issues);
    check_variable_names(questions, &mut issues);
    check_options(questions, &mut issues);
    check_patterns(questions, &mut issues);

    let plan = match EvaluationPlan::resolve(questions) {
        Ok(plan) => Some(plan),
        Err(mut plan_issues) => {
            issues.append(&mut plan_issues);
            None
        }
    };

    if issues.is_empty() {
        // resolve() only fails by reporting issues, so the plan is present here
        Ok(plan.unwrap_or_default())
    } else {
        Err(InvalidDefinition { issues })
    }
}

fn check_codes(questions: &[QuestionDefinition], issues: &mut Vec<DefinitionIssue>) {
    let mut seen = BTreeSet::new();
    for question in questions {
        if !seen.insert(question.code.as_str()) {
            issues.push(DefinitionIssue::DuplicateCode {
                code: question.code.clone(),
            });
        }
    }
}

fn check_variable_names(questions: &[QuestionDefinition], issues: &mut Vec<DefinitionIssue>) {
    let mut seen = BTreeSet::new();
    for question in questions {
        if !is_machine_safe(&question.variable_name) {
            issues.push(DefinitionIssue::InvalidVariableName {
                code: question.code.clone(),
            });
            continue;
        }
        if !seen.insert(question.variable_name.as_str()) {
            issues.push(DefinitionIssue::DuplicateVariableName {
                code: question.code.clone(),
                variable_name: question.variable_name.clone(),
            });
        }
    }
}

fn check_options(questions: &[QuestionDefinition], issues: &mut Vec<DefinitionIssue>) {
    for question in questions {
        if question.question_type.needs_options() {
            let non_blank = question
                .options
                .iter()
                .filter(|o| !o.trim().is_empty())
                .count();
            if non_blank < 2 {
                issues.push(DefinitionIssue::TooFewOptions {
                    code: question.code.clone(),
                });
            }
        } else if !question.options.is_empty() {
            issues.push(DefinitionIssue::UnexpectedOptions {
                code: question.code.clone(),
                question_type: question.question_type.to_string(),
            });
        }
    }
}

fn check_patterns(questions: &[QuestionDefinition], issues: &mut Vec<DefinitionIssue>) {
    for question in questions {
        if let Some(pattern) = &question.rules.pattern
            && regex::Regex::new(pattern).is_err()
        {
            issues.push(DefinitionIssue::InvalidPattern {
                code: question.code.clone(),
            });
        }
    }
}

/// Variable names must start with a letter or underscore and contain only
/// ASCII alphanumerics and underscores, so downstream analysis tools can
/// use them verbatim.
fn is_machine_safe(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

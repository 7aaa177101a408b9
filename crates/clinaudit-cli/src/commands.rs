use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use rand::RngCore;
use tracing::info;

use clinaudit_guidance::{analyze_question, score};
use clinaudit_metrics::MetricSet;
use clinaudit_model::{GovernanceConfig, QuestionDefinition, RawResponses, SubmitError};
use clinaudit_store::{AuditConfig, CaptureEngine, SubmissionRequest};
use clinaudit_validate::CompiledQuestionnaire;
use clinaudit_vault::{AuditKey, MemorySink, PiiVault, StaticKeyProvider};

use crate::cli::{ProtectionLevelArg, PublishArgs, ScoreArgs, SubmitArgs, ValidateArgs};
use clinaudit_cli::logging::redact_value;

pub fn run_publish(args: &PublishArgs) -> Result<bool> {
    let questions = load_questions(&args.questions)?;
    let engine = build_engine(&args.audit_id, GovernanceConfig::default());

    match engine.publish(&args.audit_id, questions) {
        Ok(compiled) => {
            let version = compiled.version();
            println!(
                "Published {} version {} ({} questions)",
                version.audit_id,
                version.version,
                version.question_count()
            );
            let mut table = Table::new();
            table.set_header(vec!["Code", "Type", "Required", "Variable", "Condition"]);
            apply_table_style(&mut table);
            for question in &version.questions {
                table.add_row(vec![
                    Cell::new(&question.code),
                    Cell::new(question.question_type.as_str()),
                    Cell::new(if question.required { "yes" } else { "" }),
                    Cell::new(&question.variable_name),
                    Cell::new(
                        question
                            .condition
                            .as_ref()
                            .map(|c| c.depends_on().to_string())
                            .unwrap_or_default(),
                    ),
                ]);
            }
            println!("{table}");
            Ok(true)
        }
        Err(invalid) => {
            eprintln!("Definition rejected:");
            for issue in &invalid.issues {
                eprintln!("  - {issue}");
            }
            Ok(false)
        }
    }
}

pub fn run_validate(args: &ValidateArgs) -> Result<bool> {
    let questions = load_questions(&args.questions)?;
    let compiled = compile(questions, &args.questions)?;
    let raw = load_responses(&args.responses)?;

    match compiled.validate(&raw) {
        Ok(responses) => {
            println!(
                "Valid: {} answer(s) across {} active question(s)",
                responses.len(),
                compiled.active_questions(&raw).len()
            );
            Ok(true)
        }
        Err(failure) => {
            print_issue_table(&failure.issues);
            Ok(false)
        }
    }
}

pub fn run_submit(args: &SubmitArgs) -> Result<bool> {
    let questions = load_questions(&args.questions)?;
    let governance = GovernanceConfig {
        data_protection_level: match args.protection_level {
            ProtectionLevelArg::NoPii => clinaudit_model::DataProtectionLevel::NoPii,
            ProtectionLevelArg::Pseudonymised => {
                clinaudit_model::DataProtectionLevel::Pseudonymised
            }
            ProtectionLevelArg::PiiRequired => clinaudit_model::DataProtectionLevel::PiiRequired,
        },
        retention_days: args.retention_days,
    };
    let engine = build_engine(&args.audit_id, governance);

    let compiled = match engine.publish(&args.audit_id, questions) {
        Ok(compiled) => compiled,
        Err(invalid) => {
            eprintln!("Definition rejected:");
            for issue in &invalid.issues {
                eprintln!("  - {issue}");
            }
            return Ok(false);
        }
    };

    let responses = load_responses(&args.responses)?;
    let identifiers = match &args.identifiers {
        Some(path) => Some(load_identifiers(path)?),
        None => None,
    };
    if let Some(fields) = &identifiers {
        for (name, value) in fields {
            info!(field = %name, value = redact_value(value), "identifier field supplied");
        }
    }

    let request = SubmissionRequest {
        audit_id: args.audit_id.clone(),
        version: compiled.version().version,
        site_id: args.site_id.clone(),
        episode_key: args.episode_key.clone(),
        responses,
        identifiers,
    };

    match engine.submit(request) {
        Ok(episode) => {
            let rendered = serde_json::to_string_pretty(&episode)
                .context("render stored episode")?;
            println!("{rendered}");
            Ok(true)
        }
        Err(SubmitError::Validation(failure)) => {
            print_issue_table(&failure.issues);
            Ok(false)
        }
        Err(error) => {
            eprintln!("error: {error}");
            Ok(false)
        }
    }
}

pub fn run_score(args: &ScoreArgs) -> Result<bool> {
    let questions = load_questions(&args.questions)?;
    let result = score(&questions);

    let mut table = Table::new();
    table.set_header(vec!["Measure", "Score"]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let rows: [(&str, f64); 7] = [
        ("Methodological quality", result.methodological_quality),
        ("Analysability", result.analysability),
        ("Structure", result.structure_pct),
        ("Validation coverage", result.validation_pct),
        ("Validated instruments", result.instrument_pct),
        ("Variable naming", result.naming_pct),
        ("Domain completeness", result.completeness_pct),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(format!("{value:.1}"))]);
    }
    println!("{table}");

    if !result.missing_domains.is_empty() {
        println!("Missing domains: {}", result.missing_domains.join(", "));
    }

    if args.feedback {
        for question in &questions {
            let feedback = analyze_question(question);
            if feedback.warnings.is_empty() && feedback.suggestions.is_empty() {
                continue;
            }
            println!("\n{} - {}", question.code, question.text);
            for warning in &feedback.warnings {
                println!("  warning: {warning}");
            }
            for suggestion in &feedback.suggestions {
                println!("  suggest: {suggestion}");
            }
        }
    }
    Ok(true)
}

/// Read a question list from a JSON file.
pub fn load_questions(path: &Path) -> Result<Vec<QuestionDefinition>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read questionnaire {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parse questionnaire {}", path.display()))
}

/// Read a raw response payload from a JSON file.
pub fn load_responses(path: &Path) -> Result<RawResponses> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read responses {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parse responses {}", path.display()))
}

fn load_identifiers(path: &Path) -> Result<BTreeMap<String, String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read identifiers {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parse identifiers {}", path.display()))
}

fn compile(
    questions: Vec<QuestionDefinition>,
    path: &Path,
) -> Result<CompiledQuestionnaire> {
    let engine = build_engine("adhoc-audit", GovernanceConfig::default());
    engine.publish("adhoc-audit", questions).map_err(|invalid| {
        let issues: Vec<String> = invalid.issues.iter().map(ToString::to_string).collect();
        anyhow::anyhow!(
            "questionnaire {} is not publishable:\n  {}",
            path.display(),
            issues.join("\n  ")
        )
    })
}

/// In-process engine with a freshly generated key for the audit.
fn build_engine(
    audit_id: &str,
    governance: GovernanceConfig,
) -> CaptureEngine<StaticKeyProvider, MemorySink> {
    let mut encryption_key = [0u8; 32];
    let mut pseudonym_salt = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut encryption_key);
    rand::thread_rng().fill_bytes(&mut pseudonym_salt);
    let keys = StaticKeyProvider::new().with_key(
        audit_id,
        AuditKey {
            encryption_key,
            pseudonym_salt,
        },
    );
    let engine = CaptureEngine::new(PiiVault::new(keys, MemorySink::new()));
    engine.register_audit(
        audit_id,
        AuditConfig {
            governance,
            metrics: MetricSet::empty(),
        },
    );
    engine
}

fn print_issue_table(issues: &[clinaudit_model::ValidationIssue]) {
    let mut table = Table::new();
    table.set_header(vec!["Question", "Issue"]);
    apply_table_style(&mut table);
    for issue in issues {
        table.add_row(vec![
            Cell::new(issue.code()).fg(Color::Red),
            Cell::new(issue.to_string()),
        ]);
    }
    eprintln!("{table}");
    eprintln!("{} issue(s)", issues.len());
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_values_are_redacted_by_default() {
        assert_eq!(
            redact_value("943 476 5919"),
            clinaudit_cli::logging::REDACTED_VALUE
        );
    }
}

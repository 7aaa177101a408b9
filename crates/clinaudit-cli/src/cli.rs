//! CLI argument definitions for the clinical audit capture tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "clinaudit",
    version,
    about = "Clinical audit capture engine - questionnaires, validation, episodes",
    long_about = "Design, check, and capture clinical audit data.\n\n\
                  Questionnaires are JSON question lists; submissions are JSON\n\
                  response payloads validated against a published version."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient identifier values in log output.
    ///
    /// Off by default; identifiers are replaced by [REDACTED].
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check a questionnaire definition as publish would.
    Publish(PublishArgs),

    /// Validate a response payload against a questionnaire.
    Validate(ValidateArgs),

    /// Validate and store one episode submission end to end.
    Submit(SubmitArgs),

    /// Score a questionnaire's methodological quality.
    Score(ScoreArgs),
}

#[derive(Parser)]
pub struct PublishArgs {
    /// Path to the questionnaire JSON (a list of question definitions).
    #[arg(value_name = "QUESTIONS")]
    pub questions: PathBuf,

    /// Audit identifier to publish under.
    #[arg(long = "audit-id", default_value = "adhoc-audit")]
    pub audit_id: String,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Path to the questionnaire JSON.
    #[arg(long = "questions", value_name = "QUESTIONS")]
    pub questions: PathBuf,

    /// Path to the response payload JSON (question code to raw value).
    #[arg(value_name = "RESPONSES")]
    pub responses: PathBuf,
}

#[derive(Parser)]
pub struct SubmitArgs {
    /// Path to the questionnaire JSON.
    #[arg(long = "questions", value_name = "QUESTIONS")]
    pub questions: PathBuf,

    /// Path to the response payload JSON.
    #[arg(value_name = "RESPONSES")]
    pub responses: PathBuf,

    /// Audit identifier.
    #[arg(long = "audit-id", default_value = "adhoc-audit")]
    pub audit_id: String,

    /// Submitting site identifier.
    #[arg(long = "site-id", default_value = "SITE1")]
    pub site_id: String,

    /// Idempotency key for the episode (stable across retries).
    #[arg(long = "episode-key")]
    pub episode_key: String,

    /// Path to a JSON object of identifier fields to vault.
    #[arg(long = "identifiers", value_name = "PATH")]
    pub identifiers: Option<PathBuf>,

    /// Data protection level for the audit.
    #[arg(long = "protection-level", value_enum, default_value = "no-pii")]
    pub protection_level: ProtectionLevelArg,

    /// Identifier retention period in days.
    #[arg(long = "retention-days", default_value_t = 3650)]
    pub retention_days: u32,
}

#[derive(Parser)]
pub struct ScoreArgs {
    /// Path to the questionnaire JSON.
    #[arg(value_name = "QUESTIONS")]
    pub questions: PathBuf,

    /// Also print per-question warnings and suggestions.
    #[arg(long = "feedback")]
    pub feedback: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ProtectionLevelArg {
    NoPii,
    Pseudonymised,
    PiiRequired,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single authoring-time defect found while publishing a questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefinitionIssue {
    #[error("duplicate question code {code}")]
    DuplicateCode { code: String },

    #[error("duplicate variable name {variable_name} (question {code})")]
    DuplicateVariableName { code: String, variable_name: String },

    #[error("question {code} has an empty or non machine-safe variable name")]
    InvalidVariableName { code: String },

    #[error("question {code} needs at least 2 non-blank options")]
    TooFewOptions { code: String },

    #[error("question {code} of type {question_type} must not define options")]
    UnexpectedOptions { code: String, question_type: String },

    #[error("question {code} has an invalid text pattern")]
    InvalidPattern { code: String },

    #[error("question {code} references unknown question {depends_on}")]
    UnresolvedReference { code: String, depends_on: String },

    #[error("question {code} must not depend on itself")]
    SelfReference { code: String },

    #[error("conditional logic cycle involving question {code}")]
    CyclicReference { code: String },
}

/// Authoring-time failure: the questionnaire is malformed and cannot be
/// published. Never occurs for an already-published version.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("invalid questionnaire definition ({} issue(s))", issues.len())]
pub struct InvalidDefinition {
    pub issues: Vec<DefinitionIssue>,
}

/// A single submission-time violation, client-correctable.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("{code}: required question has no answer")]
    MissingRequired { code: String },

    #[error("{code}: {reason}")]
    InvalidValue { code: String, reason: String },
}

impl ValidationIssue {
    pub fn code(&self) -> &str {
        match self {
            ValidationIssue::MissingRequired { code } | ValidationIssue::InvalidValue { code, .. } => {
                code
            }
        }
    }
}

/// The complete batch of violations for one submission, collected across
/// all active questions so a caller can fix everything in one round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("validation failed with {} issue(s)", issues.len())]
pub struct ValidationFailure {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationFailure {
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    /// Issues touching one question code.
    pub fn for_code(&self, code: &str) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.code() == code).collect()
    }
}

/// Errors from episode submission and amendment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    /// Stale client: the submitted version is no longer the audit's current
    /// published version. Correctable by refetching the latest version.
    #[error("version mismatch: submitted {submitted}, current published version is {current}")]
    VersionMismatch { submitted: u32, current: u32 },

    /// Same idempotency key, different content. A genuine amendment must go
    /// through the amend operation, not submit.
    #[error("conflicting resubmission for episode key {episode_key}")]
    ConflictingResubmission { episode_key: String },

    #[error("no published questionnaire for audit {audit_id}")]
    UnknownAudit { audit_id: String },

    #[error("no episode {episode_key} recorded for audit {audit_id}")]
    UnknownEpisode {
        audit_id: String,
        episode_key: String,
    },

    /// Governance requires identifier capture for this audit.
    #[error("audit {audit_id} requires patient identifiers on submission")]
    IdentifiersRequired { audit_id: String },

    /// Governance forbids identifier capture for this audit.
    #[error("audit {audit_id} is PII-free; identifiers must not be submitted")]
    IdentifiersNotAllowed { audit_id: String },

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Errors from the PII vault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// Access without an explicit privileged-access justification. Logged
    /// on every occurrence; never retried automatically.
    #[error("permission denied: privileged access requires a justification")]
    PermissionDenied,

    /// The pseudonym has no mapping (never stored, or purged on retention
    /// expiry). Deliberately carries no identifying detail.
    #[error("pseudonym is not resolvable")]
    UnknownPseudonym,

    /// Identifier fields were absent or blank after normalization; every
    /// such submission would collapse onto one pseudonym.
    #[error("identifier fields are empty after normalization")]
    EmptyIdentifiers,

    /// No key material available for the audit.
    #[error("no encryption key available for audit {audit_id}")]
    MissingKey { audit_id: String },

    /// Ciphertext failed authentication or decoding. The message never
    /// includes plaintext or ciphertext content.
    #[error("identifier record could not be decrypted")]
    Crypto,
}

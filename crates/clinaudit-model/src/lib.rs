pub mod episode;
pub mod error;
pub mod governance;
pub mod question;
pub mod questionnaire;
pub mod response;

pub use episode::{Amendment, Episode, EpisodeStatus};
pub use error::{
    DefinitionIssue, InvalidDefinition, SubmitError, ValidationFailure, ValidationIssue, VaultError,
};
pub use governance::{DataProtectionLevel, GovernanceConfig};
pub use question::{
    Condition, QuestionDefinition, QuestionType, ValidationRules, VariableType,
};
pub use questionnaire::QuestionnaireVersion;
pub use response::{RawResponses, ResponseSet, ResponseValue, to_raw_responses};

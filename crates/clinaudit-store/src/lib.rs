//! Versioned questionnaire storage, episode persistence, and the capture
//! pipeline tying validation, metrics, and the identifier vault together.

pub mod capture;
pub mod episodes;
pub mod versions;

pub use capture::{AuditConfig, CaptureEngine, SubmissionRequest};
pub use episodes::{EpisodeDraft, EpisodeStore};
pub use versions::VersionStore;

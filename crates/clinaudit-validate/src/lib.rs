pub mod conditional;
pub mod definition;
pub mod engine;

pub use conditional::EvaluationPlan;
pub use definition::check_definition;
pub use engine::CompiledQuestionnaire;

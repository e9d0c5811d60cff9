//! Deterministic IMCI triage: patient records, rule scoring, aggregation and
//! the session workflow that asks for missing fields until a rule matches.

pub mod batch;
pub mod orchestrator;
pub mod patient;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use batch::{assess_patients, read_patients, BatchAssessment, PatientRow};
pub use orchestrator::{TriageOrchestrator, TriageOutcome, TriageReport};
pub use patient::{FieldUpdate, FieldValue, PatientRecord, PatientSchema, AGE_FIELD};
pub use repository::{RepositoryError, SessionRepository, SessionView};
pub use router::triage_router;
pub use rules::{
    AggregateResult, MatchResult, Rule, RuleEngine, RuleLoadError, RuleSet, RuleWarning,
};
pub use service::{TriageService, TriageServiceError};
pub use session::{SessionId, SessionStatus, TriageSession};

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::patient::{FieldUpdate, PatientRecord};
use super::rules::{AggregateResult, RuleEngine, RuleSet, RuleWarning};
use super::session::{SessionStatus, TriageSession};

/// What the caller should do next with a triage turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriageOutcome {
    /// At least one rule matched; the caller renders an explanation.
    Complete(AggregateResult),
    /// Nothing matched yet; ask for these fields, in schema order.
    Incomplete { missing_fields: Vec<String> },
    /// Every field is known and still no rule matched.
    Undetermined,
}

impl TriageOutcome {
    pub fn status(&self) -> SessionStatus {
        match self {
            TriageOutcome::Complete(_) => SessionStatus::Complete,
            TriageOutcome::Incomplete { .. } => SessionStatus::Incomplete,
            TriageOutcome::Undetermined => SessionStatus::Undetermined,
        }
    }

    pub fn result(&self) -> Option<&AggregateResult> {
        match self {
            TriageOutcome::Complete(result) => Some(result),
            _ => None,
        }
    }
}

/// Outcome of one turn plus any rule configuration warnings raised while scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageReport {
    #[serde(flatten)]
    pub outcome: TriageOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RuleWarning>,
}

/// Coordinates record merging, rule scoring and the next-step decision.
#[derive(Debug, Clone)]
pub struct TriageOrchestrator {
    engine: RuleEngine,
}

impl TriageOrchestrator {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            engine: RuleEngine::new(rules),
        }
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Merges freshly extracted fields into the session and re-runs triage.
    pub fn step(&self, session: &mut TriageSession, extracted: &FieldUpdate) -> TriageReport {
        let applied = session.record.merge(extracted);
        session.touch();
        debug!(session = %session.id, ?applied, "merged extracted fields");

        let report = self.assess(&session.record);
        let next = report.outcome.status();
        if session.transition(next) {
            info!(
                session = %session.id,
                status = next.label(),
                turn = session.turns,
                "triage session status changed"
            );
        }

        report
    }

    /// Evaluates a record without touching any session state.
    pub fn assess(&self, record: &PatientRecord) -> TriageReport {
        let evaluation = self.engine.evaluate(record);

        let outcome = if evaluation.result.is_classified() {
            TriageOutcome::Complete(evaluation.result)
        } else {
            let missing_fields = record.missing_fields();
            if missing_fields.is_empty() {
                TriageOutcome::Undetermined
            } else {
                TriageOutcome::Incomplete { missing_fields }
            }
        };

        TriageReport {
            outcome,
            warnings: evaluation.warnings,
        }
    }
}

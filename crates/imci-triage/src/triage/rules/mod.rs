mod aggregate;
mod condition;
pub mod domain;
mod loader;
mod logic;
mod warnings;

pub use aggregate::{aggregate, AggregateResult, MatchResult, FALLBACK_RISK_LEVEL};
pub use domain::{
    AgeBand, ComparisonOperator, Condition, ConditionTarget, Group, LogicNode, LogicOperator,
    Rule, DEFAULT_PRIORITY,
};
pub use loader::{RuleLoadError, RuleSet};
pub use warnings::RuleWarning;

use std::sync::Arc;

use super::patient::PatientRecord;
use aggregate::round_confidence;
use logic::score_tree;
use tracing::warn;

/// Stateless scorer that applies a shared rule set to a patient record.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Arc<RuleSet>,
}

impl RuleEngine {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Scores every rule; rules whose criteria score zero are left out.
    pub fn score(&self, record: &PatientRecord) -> ScoreReport {
        let mut matches = Vec::new();
        let mut warnings = Vec::new();

        for rule in self.rules.rules() {
            let tree = score_tree(rule.criteria.as_ref(), record);

            for logic in tree.unrecognized_logic {
                let warning = RuleWarning::UnrecognizedLogic {
                    classification: rule.classification.clone(),
                    logic,
                };
                warn!(%warning, "rule group skipped during scoring");
                warnings.push(warning);
            }

            if tree.score > 0.0 {
                matches.push(MatchResult {
                    module: rule.module.clone(),
                    classification: rule.classification.clone(),
                    severity: rule.severity.clone(),
                    priority: rule.priority,
                    confidence: round_confidence(tree.score * rule.base_confidence).max(0.0),
                });
            }
        }

        ScoreReport { matches, warnings }
    }

    /// Scores and aggregates in one pass.
    pub fn evaluate(&self, record: &PatientRecord) -> Evaluation {
        let ScoreReport { matches, warnings } = self.score(record);
        Evaluation {
            result: aggregate(matches),
            warnings,
        }
    }
}

/// Raw per-rule matches in rule order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub matches: Vec<MatchResult>,
    pub warnings: Vec<RuleWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub result: AggregateResult,
    pub warnings: Vec<RuleWarning>,
}

/// Score of a single criteria tree, without confidence scaling.
pub fn score_criteria(node: &LogicNode, record: &PatientRecord) -> f64 {
    score_tree(Some(node), record).score
}

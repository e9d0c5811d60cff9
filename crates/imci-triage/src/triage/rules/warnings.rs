use std::fmt;

use serde::{Deserialize, Serialize};

/// Rule configuration problem that degrades scoring instead of failing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleWarning {
    UnrecognizedLogic {
        classification: String,
        logic: String,
    },
    UnrecognizedOperator {
        classification: String,
        operator: String,
    },
    InvalidAgeRange {
        classification: String,
        range: String,
    },
    OverlappingAgeRanges {
        classification: String,
        first: String,
        second: String,
    },
    MalformedCriteria {
        classification: String,
        detail: String,
    },
    InvalidBaseConfidence {
        classification: String,
        value: String,
    },
}

impl RuleWarning {
    pub fn classification(&self) -> &str {
        match self {
            RuleWarning::UnrecognizedLogic { classification, .. }
            | RuleWarning::UnrecognizedOperator { classification, .. }
            | RuleWarning::InvalidAgeRange { classification, .. }
            | RuleWarning::OverlappingAgeRanges { classification, .. }
            | RuleWarning::MalformedCriteria { classification, .. }
            | RuleWarning::InvalidBaseConfidence { classification, .. } => classification,
        }
    }
}

impl fmt::Display for RuleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleWarning::UnrecognizedLogic {
                classification,
                logic,
            } => write!(
                f,
                "rule '{classification}' uses unrecognized group logic '{logic}'; group scored 0"
            ),
            RuleWarning::UnrecognizedOperator {
                classification,
                operator,
            } => write!(
                f,
                "rule '{classification}' uses unrecognized operator '{operator}'; condition scores 0"
            ),
            RuleWarning::InvalidAgeRange {
                classification,
                range,
            } => write!(
                f,
                "rule '{classification}' has malformed age range '{range}'; range skipped"
            ),
            RuleWarning::OverlappingAgeRanges {
                classification,
                first,
                second,
            } => write!(
                f,
                "rule '{classification}' has overlapping age ranges '{first}' and '{second}'; first match wins"
            ),
            RuleWarning::MalformedCriteria {
                classification,
                detail,
            } => write!(
                f,
                "rule '{classification}' has malformed criteria: {detail}; condition scores 0"
            ),
            RuleWarning::InvalidBaseConfidence {
                classification,
                value,
            } => write!(
                f,
                "rule '{classification}' has invalid base_confidence {value}; clamped to 0"
            ),
        }
    }
}

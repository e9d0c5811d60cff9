use serde::{Deserialize, Serialize};

/// Risk label reported when no rule matched.
pub const FALLBACK_RISK_LEVEL: &str = "Low";

/// One rule whose criteria scored above zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub module: String,
    pub classification: String,
    pub severity: String,
    pub priority: i32,
    pub confidence: f64,
}

/// Winning risk level plus every match, most urgent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub overall_risk_level: String,
    pub classifications: Vec<MatchResult>,
}

impl AggregateResult {
    pub fn is_classified(&self) -> bool {
        !self.classifications.is_empty()
    }

    pub fn winner(&self) -> Option<&MatchResult> {
        self.classifications.first()
    }
}

/// Ranks matches by priority, then by confidence. Ties keep rule order.
pub fn aggregate(mut matches: Vec<MatchResult>) -> AggregateResult {
    if matches.is_empty() {
        return AggregateResult {
            overall_risk_level: FALLBACK_RISK_LEVEL.to_string(),
            classifications: matches,
        };
    }

    matches.sort_by(|left, right| {
        left.priority
            .cmp(&right.priority)
            .then_with(|| right.confidence.total_cmp(&left.confidence))
    });

    AggregateResult {
        overall_risk_level: matches[0].severity.clone(),
        classifications: matches,
    }
}

/// Two-decimal rounding applied to confidences. Halves go to the even
/// neighbour, so 0.125 becomes 0.12.
pub(crate) fn round_confidence(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

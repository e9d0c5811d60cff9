use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::domain::{
    sanitize_weight, AgeBand, ComparisonOperator, Condition, ConditionTarget, Group, LogicNode,
    LogicOperator, Rule, DEFAULT_PRIORITY,
};
use super::warnings::RuleWarning;

const IMCI_RULES: &str = include_str!("../../../rules/imci_rules.json");

/// Immutable, ordered rule set shared by every session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    warnings: Vec<RuleWarning>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            warnings: Vec::new(),
        }
    }

    /// Cough and difficult-breathing classifications bundled with the crate.
    pub fn imci() -> Result<Self, RuleLoadError> {
        Self::from_json_str(IMCI_RULES)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RuleLoadError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| RuleLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RuleLoadError> {
        let document: RuleDocument = serde_json::from_reader(reader)?;
        Ok(Self::normalize(document))
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RuleLoadError> {
        let document: RuleDocument = serde_json::from_str(raw)?;
        Ok(Self::normalize(document))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Problems found while normalizing the rule file.
    pub fn warnings(&self) -> &[RuleWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn normalize(document: RuleDocument) -> Self {
        let raw_rules = match document {
            RuleDocument::Wrapped { rules } => rules,
            RuleDocument::Bare(rules) => rules,
        };

        let mut warnings = Vec::new();
        let rules: Vec<Rule> = raw_rules
            .into_iter()
            .map(|raw| raw.into_rule(&mut warnings))
            .collect();

        for warning in &warnings {
            warn!(%warning, "rule configuration warning");
        }
        debug!(
            rules = rules.len(),
            warnings = warnings.len(),
            "rule set normalized"
        );

        Self { rules, warnings }
    }
}

/// Failure to read or parse a rule file.
#[derive(Debug, thiserror::Error)]
pub enum RuleLoadError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rule definitions: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleDocument {
    Wrapped { rules: Vec<RawRule> },
    Bare(Vec<RawRule>),
}

#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default)]
    module: Option<String>,
    #[serde(alias = "condition")]
    classification: String,
    severity: String,
    #[serde(default)]
    priority: Option<i32>,
    #[serde(default)]
    base_confidence: Option<f64>,
    #[serde(default)]
    criteria: Option<Value>,
}

impl RawRule {
    fn into_rule(self, warnings: &mut Vec<RuleWarning>) -> Rule {
        let classification = self.classification;
        let base_confidence = match self.base_confidence {
            None => 1.0,
            Some(value) if value.is_finite() && value >= 0.0 => value,
            Some(value) => {
                warnings.push(RuleWarning::InvalidBaseConfidence {
                    classification: classification.clone(),
                    value: value.to_string(),
                });
                0.0
            }
        };
        let criteria = self
            .criteria
            .map(|node| normalize_node(node, &classification, warnings));

        Rule {
            module: self.module.unwrap_or_default(),
            priority: self.priority.unwrap_or(DEFAULT_PRIORITY),
            base_confidence,
            severity: self.severity,
            classification,
            criteria,
        }
    }
}

/// Rule files use plain objects for criteria: one carrying both `logic` and
/// `conditions` (or `children`) is a group, anything else is a condition.
fn normalize_node(
    node: Value,
    classification: &str,
    warnings: &mut Vec<RuleWarning>,
) -> LogicNode {
    let mut object = match node {
        Value::Object(object) => object,
        other => {
            warnings.push(malformed(
                classification,
                format!("criteria node {other} is not an object"),
            ));
            return LogicNode::Condition(inert_condition());
        }
    };

    let children = object
        .remove("conditions")
        .or_else(|| object.remove("children"));
    match (object.remove("logic"), children) {
        (Some(logic), Some(children)) => {
            LogicNode::Group(normalize_group(logic, children, classification, warnings))
        }
        _ => LogicNode::Condition(normalize_condition(object, classification, warnings)),
    }
}

fn normalize_group(
    logic: Value,
    children: Value,
    classification: &str,
    warnings: &mut Vec<RuleWarning>,
) -> Group {
    let logic = match logic {
        Value::String(raw) => LogicOperator::parse(&raw),
        other => LogicOperator::Unrecognized(other.to_string()),
    };
    if let LogicOperator::Unrecognized(raw) = &logic {
        warnings.push(RuleWarning::UnrecognizedLogic {
            classification: classification.to_string(),
            logic: raw.clone(),
        });
    }

    let children = match children {
        Value::Array(children) => children
            .into_iter()
            .map(|child| normalize_node(child, classification, warnings))
            .collect(),
        other => {
            warnings.push(malformed(
                classification,
                format!("group conditions {other} are not a list"),
            ));
            Vec::new()
        }
    };

    Group { logic, children }
}

fn normalize_condition(
    mut object: Map<String, Value>,
    classification: &str,
    warnings: &mut Vec<RuleWarning>,
) -> Condition {
    let field = text_entry(&mut object, "field", classification, warnings)
        .filter(|field| !field.trim().is_empty());
    let operator = text_entry(&mut object, "operator", classification, warnings)
        .filter(|operator| !operator.trim().is_empty())
        .map(|raw| ComparisonOperator::parse(&raw));

    if let Some(ComparisonOperator::Unrecognized(raw)) = &operator {
        warnings.push(RuleWarning::UnrecognizedOperator {
            classification: classification.to_string(),
            operator: raw.clone(),
        });
    }
    if field.is_none() || operator.is_none() {
        warnings.push(malformed(
            classification,
            "condition needs both a field and an operator".to_string(),
        ));
    }

    let target = match object.remove("value") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<ConditionTarget>(raw.clone()) {
            Ok(target) => Some(target),
            Err(_) => {
                warnings.push(malformed(
                    classification,
                    format!("value {raw} is neither a scalar nor a list of scalars"),
                ));
                None
            }
        },
    };

    let weight = match object.remove("weight") {
        None | Some(Value::Null) => 1.0,
        Some(Value::Number(weight)) => sanitize_weight(weight.as_f64().unwrap_or(0.0)),
        Some(other) => {
            warnings.push(malformed(
                classification,
                format!("weight {other} is not a number"),
            ));
            0.0
        }
    };

    let age_based = match object.remove("age_based") {
        None | Some(Value::Null) => None,
        Some(Value::Object(ranges)) => Some(parse_age_bands(ranges, classification, warnings)),
        Some(other) => {
            warnings.push(malformed(
                classification,
                format!("age_based {other} is not an object of ranges"),
            ));
            Some(Vec::new())
        }
    };

    Condition {
        field,
        operator,
        target,
        weight,
        age_based,
    }
}

fn text_entry(
    object: &mut Map<String, Value>,
    key: &str,
    classification: &str,
    warnings: &mut Vec<RuleWarning>,
) -> Option<String> {
    match object.remove(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => {
            warnings.push(malformed(
                classification,
                format!("{key} {other} is not a string"),
            ));
            None
        }
    }
}

fn malformed(classification: &str, detail: String) -> RuleWarning {
    RuleWarning::MalformedCriteria {
        classification: classification.to_string(),
        detail,
    }
}

/// Leaf standing in for unusable criteria; it never matches.
fn inert_condition() -> Condition {
    Condition {
        field: None,
        operator: None,
        target: None,
        weight: 0.0,
        age_based: None,
    }
}

fn parse_age_bands(
    ranges: Map<String, Value>,
    classification: &str,
    warnings: &mut Vec<RuleWarning>,
) -> Vec<AgeBand> {
    let mut bands: Vec<AgeBand> = Vec::with_capacity(ranges.len());

    for (range, threshold) in ranges {
        let parsed = AgeBand::parse_range(&range)
            .zip(threshold.as_f64())
            .map(|((min, max), threshold)| AgeBand::new(min, max, threshold));

        let Some(band) = parsed else {
            warnings.push(RuleWarning::InvalidAgeRange {
                classification: classification.to_string(),
                range,
            });
            continue;
        };

        if let Some(existing) = bands.iter().find(|existing| existing.overlaps(&band)) {
            warnings.push(RuleWarning::OverlappingAgeRanges {
                classification: classification.to_string(),
                first: existing.to_string(),
                second: band.to_string(),
            });
        }
        bands.push(band);
    }

    bands
}

use std::fmt;

use serde::{Deserialize, Serialize};

use super::super::patient::FieldValue;

/// Priority assigned to rules that do not declare one, so they rank last.
pub const DEFAULT_PRIORITY: i32 = 999;

/// Declarative mapping from a logic tree to a classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub module: String,
    pub classification: String,
    pub severity: String,
    pub priority: i32,
    pub base_confidence: f64,
    pub criteria: Option<LogicNode>,
}

/// Node of a rule's criteria tree.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicNode {
    Condition(Condition),
    Group(Group),
}

/// Leaf comparison against a single patient field.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: Option<String>,
    pub operator: Option<ComparisonOperator>,
    pub target: Option<ConditionTarget>,
    pub weight: f64,
    pub age_based: Option<Vec<AgeBand>>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ComparisonOperator) -> Self {
        Self {
            field: Some(field.into()),
            operator: Some(operator),
            target: None,
            weight: 1.0,
            age_based: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<ConditionTarget>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = sanitize_weight(weight);
        self
    }

    pub fn with_age_bands(mut self, bands: Vec<AgeBand>) -> Self {
        self.age_based = Some(bands);
        self
    }
}

impl From<Condition> for LogicNode {
    fn from(condition: Condition) -> Self {
        LogicNode::Condition(condition)
    }
}

/// Combination of child nodes under AND/OR semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub logic: LogicOperator,
    pub children: Vec<LogicNode>,
}

impl Group {
    pub fn all(children: Vec<LogicNode>) -> Self {
        Self {
            logic: LogicOperator::And,
            children,
        }
    }

    pub fn any(children: Vec<LogicNode>) -> Self {
        Self {
            logic: LogicOperator::Or,
            children,
        }
    }
}

impl From<Group> for LogicNode {
    fn from(group: Group) -> Self {
        LogicNode::Group(group)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicOperator {
    And,
    Or,
    Unrecognized(String),
}

impl LogicOperator {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AND" => Self::And,
            "OR" => Self::Or,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }
}

impl fmt::Display for LogicOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicOperator::And => f.write_str("AND"),
            LogicOperator::Or => f.write_str("OR"),
            LogicOperator::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    GreaterOrEqual,
    LessOrEqual,
    Greater,
    Less,
    In,
    Exists,
    Unrecognized(String),
}

impl ComparisonOperator {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            ">=" => Self::GreaterOrEqual,
            "<=" => Self::LessOrEqual,
            ">" => Self::Greater,
            "<" => Self::Less,
            "in" => Self::In,
            "exists" => Self::Exists,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionTarget {
    Scalar(FieldValue),
    List(Vec<FieldValue>),
}

impl From<FieldValue> for ConditionTarget {
    fn from(value: FieldValue) -> Self {
        ConditionTarget::Scalar(value)
    }
}

impl From<bool> for ConditionTarget {
    fn from(value: bool) -> Self {
        ConditionTarget::Scalar(FieldValue::Flag(value))
    }
}

impl From<f64> for ConditionTarget {
    fn from(value: f64) -> Self {
        ConditionTarget::Scalar(FieldValue::Number(value))
    }
}

impl From<&str> for ConditionTarget {
    fn from(value: &str) -> Self {
        ConditionTarget::Scalar(FieldValue::Text(value.to_string()))
    }
}

impl From<Vec<FieldValue>> for ConditionTarget {
    fn from(values: Vec<FieldValue>) -> Self {
        ConditionTarget::List(values)
    }
}

/// Inclusive age range in months paired with the threshold applied inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeBand {
    pub min_months: i64,
    pub max_months: i64,
    pub threshold: f64,
}

impl AgeBand {
    pub fn new(min_months: i64, max_months: i64, threshold: f64) -> Self {
        Self {
            min_months,
            max_months,
            threshold,
        }
    }

    /// Parses the `"min-max"` key used by rule files.
    pub fn parse_range(raw: &str) -> Option<(i64, i64)> {
        let (min, max) = raw.split_once('-')?;
        let min = min.trim().parse::<i64>().ok()?;
        let max = max.trim().parse::<i64>().ok()?;
        Some((min, max))
    }

    pub fn contains(&self, age_months: f64) -> bool {
        self.min_months as f64 <= age_months && age_months <= self.max_months as f64
    }

    pub fn overlaps(&self, other: &AgeBand) -> bool {
        self.min_months <= other.max_months && other.min_months <= self.max_months
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_months, self.max_months)
    }
}

/// Weights below zero or non-finite would break the non-negative score invariant.
pub(crate) fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

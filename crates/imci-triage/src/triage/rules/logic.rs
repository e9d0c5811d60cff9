use super::super::patient::PatientRecord;
use super::condition::evaluate_condition;
use super::domain::{Group, LogicNode, LogicOperator};

/// Score of a criteria tree plus any group operators the evaluator could not apply.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct TreeScore {
    pub score: f64,
    pub unrecognized_logic: Vec<String>,
}

pub(crate) fn score_tree(node: Option<&LogicNode>, record: &PatientRecord) -> TreeScore {
    let mut unrecognized_logic = Vec::new();
    let score = match node {
        Some(node) => evaluate_node(node, record, &mut unrecognized_logic),
        None => 0.0,
    };

    TreeScore {
        score,
        unrecognized_logic,
    }
}

fn evaluate_node(
    node: &LogicNode,
    record: &PatientRecord,
    unrecognized: &mut Vec<String>,
) -> f64 {
    match node {
        LogicNode::Condition(condition) => evaluate_condition(condition, record),
        LogicNode::Group(group) => evaluate_group(group, record, unrecognized),
    }
}

fn evaluate_group(
    group: &Group,
    record: &PatientRecord,
    unrecognized: &mut Vec<String>,
) -> f64 {
    if group.children.is_empty() {
        return 0.0;
    }

    match &group.logic {
        // Weakest link: one unsupported child sinks the whole group.
        LogicOperator::And => {
            let mut weakest = f64::INFINITY;
            for child in &group.children {
                let score = evaluate_node(child, record, unrecognized);
                if score <= 0.0 {
                    return 0.0;
                }
                weakest = weakest.min(score);
            }
            weakest
        }
        LogicOperator::Or => group
            .children
            .iter()
            .map(|child| evaluate_node(child, record, unrecognized))
            .fold(0.0, f64::max),
        LogicOperator::Unrecognized(raw) => {
            unrecognized.push(raw.clone());
            0.0
        }
    }
}

use std::cmp::Ordering;

use super::super::patient::{FieldValue, PatientRecord};
use super::domain::{AgeBand, ComparisonOperator, Condition, ConditionTarget};

/// Scores a leaf condition. Malformed conditions, unset fields and type
/// mismatches all score zero.
pub(crate) fn evaluate_condition(condition: &Condition, record: &PatientRecord) -> f64 {
    let (Some(field), Some(operator)) = (condition.field.as_deref(), condition.operator.as_ref())
    else {
        return 0.0;
    };

    let Some(value) = record.get(field) else {
        return 0.0;
    };

    if let Some(bands) = &condition.age_based {
        return score_age_bands(bands, value, record, condition.weight);
    }

    if compare(operator, value, condition.target.as_ref()) {
        condition.weight
    } else {
        0.0
    }
}

fn score_age_bands(
    bands: &[AgeBand],
    value: &FieldValue,
    record: &PatientRecord,
    weight: f64,
) -> f64 {
    let Some(age) = record.age_months() else {
        return 0.0;
    };

    // First containing band decides, even when a later band would also match.
    let Some(band) = bands.iter().find(|band| band.contains(age)) else {
        return 0.0;
    };

    match value.as_number() {
        Some(observed) if observed >= band.threshold => weight,
        _ => 0.0,
    }
}

fn compare(
    operator: &ComparisonOperator,
    value: &FieldValue,
    target: Option<&ConditionTarget>,
) -> bool {
    use ComparisonOperator::*;

    match operator {
        Exists => true,
        In => match target {
            Some(ConditionTarget::List(options)) => options
                .iter()
                .any(|option| value.compare(option) == Some(Ordering::Equal)),
            _ => false,
        },
        Unrecognized(_) => false,
        ordered => {
            let Some(ConditionTarget::Scalar(target)) = target else {
                return false;
            };
            let Some(ordering) = value.compare(target) else {
                return false;
            };
            match ordered {
                Equal => ordering == Ordering::Equal,
                NotEqual => ordering != Ordering::Equal,
                GreaterOrEqual => ordering != Ordering::Less,
                LessOrEqual => ordering != Ordering::Greater,
                Greater => ordering == Ordering::Greater,
                Less => ordering == Ordering::Less,
                Exists | In | Unrecognized(_) => false,
            }
        }
    }
}

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Field that age-conditioned thresholds read the patient's age from.
pub const AGE_FIELD: &str = "age_months";

const IMCI_FIELDS: [&str; 6] = [
    AGE_FIELD,
    "cough",
    "fever",
    "respiratory_rate",
    "chest_indrawing",
    "convulsions",
];

/// Typed scalar captured for a patient field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Ordering between values of the same kind; `None` for mixed kinds or NaN.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Flag(left), FieldValue::Flag(right)) => Some(left.cmp(right)),
            (FieldValue::Number(left), FieldValue::Number(right)) => left.partial_cmp(right),
            (FieldValue::Text(left), FieldValue::Text(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }

    /// Parses a loosely typed cell (CSV, CLI) into the narrowest scalar.
    pub fn parse_cell(raw: &str) -> Option<FieldValue> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
            return None;
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" => return Some(FieldValue::Flag(true)),
            "false" | "no" => return Some(FieldValue::Flag(false)),
            _ => {}
        }

        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => Some(FieldValue::Number(number)),
            _ => Some(FieldValue::Text(trimmed.to_string())),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(value) => write!(f, "{value}"),
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

/// Freshly extracted fields; `None` marks a field the extractor reported as null.
pub type FieldUpdate = BTreeMap<String, Option<FieldValue>>;

/// Ordered set of field names a record tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientSchema {
    fields: Vec<String>,
}

impl PatientSchema {
    /// Builds a schema, keeping the first occurrence of repeated names.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into();
            if !names.contains(&field) {
                names.push(field);
            }
        }
        Self { fields: names }
    }

    /// The six fields collected by the cough/difficult-breathing assessment.
    pub fn imci() -> Self {
        Self::new(IMCI_FIELDS)
    }

    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|name| name == field)
    }
}

impl Default for PatientSchema {
    fn default() -> Self {
        Self::imci()
    }
}

/// Session-scoped store of known and still-missing symptom values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    slots: Vec<FieldSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FieldSlot {
    name: String,
    value: Option<FieldValue>,
}

impl PatientRecord {
    pub fn new(schema: &PatientSchema) -> Self {
        let slots = schema
            .field_names()
            .iter()
            .map(|name| FieldSlot {
                name: name.clone(),
                value: None,
            })
            .collect();
        Self { slots }
    }

    /// Applies every non-null value for a known field (last write wins) and
    /// returns the applied field names in schema order.
    pub fn merge(&mut self, update: &FieldUpdate) -> Vec<String> {
        let mut applied = Vec::new();
        for slot in &mut self.slots {
            if let Some(Some(value)) = update.get(&slot.name) {
                slot.value = Some(value.clone());
                applied.push(slot.name.clone());
            }
        }
        applied
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.slots
            .iter()
            .find(|slot| slot.name == field)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn age_months(&self) -> Option<f64> {
        self.get(AGE_FIELD).and_then(FieldValue::as_number)
    }

    pub fn missing_fields(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|slot| slot.value.is_none())
            .map(|slot| slot.name.clone())
            .collect()
    }

    /// Known values keyed by field name, for views and logs.
    pub fn known_fields(&self) -> BTreeMap<String, FieldValue> {
        self.slots
            .iter()
            .filter_map(|slot| {
                slot.value
                    .as_ref()
                    .map(|value| (slot.name.clone(), value.clone()))
            })
            .collect()
    }
}

impl Default for PatientRecord {
    fn default() -> Self {
        Self::new(&PatientSchema::imci())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(entries: &[(&str, Option<FieldValue>)]) -> FieldUpdate {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn fresh_record_reports_every_field_missing_in_schema_order() {
        let record = PatientRecord::default();
        assert_eq!(record.missing_fields(), IMCI_FIELDS.to_vec());
    }

    #[test]
    fn null_update_never_erases_a_known_value() {
        let mut record = PatientRecord::default();
        record.merge(&update(&[("fever", Some(FieldValue::Flag(true)))]));
        let applied = record.merge(&update(&[("fever", None)]));

        assert!(applied.is_empty());
        assert_eq!(record.get("fever"), Some(&FieldValue::Flag(true)));
    }

    #[test]
    fn later_values_overwrite_and_unknown_fields_are_ignored() {
        let mut record = PatientRecord::default();
        record.merge(&update(&[("respiratory_rate", Some(FieldValue::Number(38.0)))]));
        let applied = record.merge(&update(&[
            ("respiratory_rate", Some(FieldValue::Number(52.0))),
            ("blood_pressure", Some(FieldValue::Text("120/80".to_string()))),
        ]));

        assert_eq!(applied, vec!["respiratory_rate"]);
        assert_eq!(record.get("respiratory_rate"), Some(&FieldValue::Number(52.0)));
        assert_eq!(record.get("blood_pressure"), None);
    }

    #[test]
    fn false_is_a_known_value() {
        let mut record = PatientRecord::default();
        record.merge(&update(&[("convulsions", Some(FieldValue::Flag(false)))]));
        assert!(!record.missing_fields().contains(&"convulsions".to_string()));
    }

    #[test]
    fn custom_schema_drops_duplicate_names() {
        let schema = PatientSchema::new(["fever", "stiff_neck", "fever"]);
        assert_eq!(schema.field_names(), ["fever", "stiff_neck"]);
        assert!(!schema.contains("cough"));
    }

    #[test]
    fn field_values_deserialize_from_plain_json_scalars() {
        let parsed: FieldUpdate =
            serde_json::from_str(r#"{"age_months": 18, "cough": true, "fever": null, "note": "ok"}"#)
                .expect("valid update");

        assert_eq!(parsed["age_months"], Some(FieldValue::Number(18.0)));
        assert_eq!(parsed["cough"], Some(FieldValue::Flag(true)));
        assert_eq!(parsed["fever"], None);
        assert_eq!(parsed["note"], Some(FieldValue::Text("ok".to_string())));
    }

    #[test]
    fn cells_parse_to_the_narrowest_scalar() {
        assert_eq!(FieldValue::parse_cell(" TRUE "), Some(FieldValue::Flag(true)));
        assert_eq!(FieldValue::parse_cell("55"), Some(FieldValue::Number(55.0)));
        assert_eq!(
            FieldValue::parse_cell("wheeze"),
            Some(FieldValue::Text("wheeze".to_string()))
        );
        assert_eq!(FieldValue::parse_cell(""), None);
    }
}

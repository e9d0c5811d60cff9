use std::io::Read;

use serde::Serialize;

use super::orchestrator::{TriageOrchestrator, TriageReport};
use super::patient::{FieldUpdate, FieldValue, PatientRecord, PatientSchema};

const LABEL_COLUMNS: [&str; 2] = ["patient_id", "id"];

/// One patient row from a batch file.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRow {
    pub label: String,
    pub fields: FieldUpdate,
}

/// Reads a CSV whose header names patient fields. Empty cells stay unset; an
/// optional `patient_id`/`id` column labels each row.
pub fn read_patients<R: Read>(reader: R) -> Result<Vec<PatientRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let label_column = headers
        .iter()
        .position(|header| LABEL_COLUMNS.contains(&header));

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let label = label_column
            .and_then(|column| record.get(column))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("row-{}", index + 1));

        let fields = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(column, _)| Some(*column) != label_column)
            .map(|(_, (header, cell))| (header.to_string(), FieldValue::parse_cell(cell)))
            .collect();

        rows.push(PatientRow { label, fields });
    }

    Ok(rows)
}

/// Triage result for one batch row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchAssessment {
    pub patient: String,
    #[serde(flatten)]
    pub report: TriageReport,
}

pub fn assess_patients(
    orchestrator: &TriageOrchestrator,
    schema: &PatientSchema,
    rows: &[PatientRow],
) -> Vec<BatchAssessment> {
    rows.iter()
        .map(|row| {
            let mut record = PatientRecord::new(schema);
            record.merge(&row.fields);
            BatchAssessment {
                patient: row.label.clone(),
                report: orchestrator.assess(&record),
            }
        })
        .collect()
}

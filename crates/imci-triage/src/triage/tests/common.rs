use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::triage::patient::{FieldUpdate, FieldValue, PatientRecord, PatientSchema};
use crate::triage::repository::{RepositoryError, SessionRepository};
use crate::triage::rules::{
    AgeBand, ComparisonOperator, Condition, Group, LogicNode, Rule, RuleSet,
};
use crate::triage::service::TriageService;
use crate::triage::session::{SessionId, TriageSession};

pub(super) fn flag(value: bool) -> Option<FieldValue> {
    Some(FieldValue::Flag(value))
}

pub(super) fn number(value: f64) -> Option<FieldValue> {
    Some(FieldValue::Number(value))
}

pub(super) fn update(entries: &[(&str, Option<FieldValue>)]) -> FieldUpdate {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub(super) fn patient(entries: &[(&str, Option<FieldValue>)]) -> PatientRecord {
    let mut record = PatientRecord::new(&PatientSchema::imci());
    record.merge(&update(entries));
    record
}

pub(super) fn rule(
    classification: &str,
    severity: &str,
    priority: i32,
    base_confidence: f64,
    criteria: LogicNode,
) -> Rule {
    Rule {
        module: "cough_or_difficult_breathing".to_string(),
        classification: classification.to_string(),
        severity: severity.to_string(),
        priority,
        base_confidence,
        criteria: Some(criteria),
    }
}

pub(super) fn equals(field: &str, value: bool) -> LogicNode {
    Condition::new(field, ComparisonOperator::Equal)
        .with_target(value)
        .into()
}

pub(super) fn fast_breathing(threshold: f64) -> LogicNode {
    Condition::new("respiratory_rate", ComparisonOperator::GreaterOrEqual)
        .with_age_bands(vec![AgeBand::new(12, 59, threshold)])
        .into()
}

/// Severe pneumonia outranks pneumonia, which outranks a plain cough.
pub(super) fn pneumonia_rules() -> Arc<RuleSet> {
    Arc::new(RuleSet::new(vec![
        rule(
            "SEVERE PNEUMONIA",
            "High",
            1,
            0.95,
            Group::all(vec![fast_breathing(50.0), equals("chest_indrawing", true)]).into(),
        ),
        rule(
            "PNEUMONIA",
            "Medium",
            2,
            0.9,
            Group::all(vec![equals("cough", true), fast_breathing(40.0)]).into(),
        ),
        rule("COUGH OR COLD", "Low", 4, 0.7, equals("cough", true)),
    ]))
}

pub(super) fn build_service() -> (TriageService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = TriageService::new(
        repository.clone(),
        pneumonia_rules(),
        PatientSchema::imci(),
    );
    (service, repository)
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    sessions: Mutex<HashMap<SessionId, TriageSession>>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.sessions.lock().expect("repository mutex poisoned").len()
    }
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, session: TriageSession) -> Result<TriageSession, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn modify(
        &self,
        id: &SessionId,
        change: &mut dyn FnMut(&mut TriageSession),
    ) -> Result<TriageSession, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        let session = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        change(session);
        Ok(session.clone())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id))
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _session: TriageSession) -> Result<TriageSession, RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }

    fn modify(
        &self,
        _id: &SessionId,
        _change: &mut dyn FnMut(&mut TriageSession),
    ) -> Result<TriageSession, RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<TriageSession>, RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }

    fn remove(&self, _id: &SessionId) -> Result<Option<TriageSession>, RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

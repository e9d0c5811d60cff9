use super::common::*;
use crate::triage::patient::{FieldValue, PatientSchema};
use crate::triage::repository::{RepositoryError, SessionRepository};
use crate::triage::service::{TriageService, TriageServiceError};
use crate::triage::session::{SessionId, SessionStatus, TriageSession};
use std::sync::{Arc, Barrier};

/// Holds every `modify` until two callers are in flight at once.
struct GatedRepository {
    inner: MemoryRepository,
    gate: Barrier,
}

impl SessionRepository for GatedRepository {
    fn insert(&self, session: TriageSession) -> Result<TriageSession, RepositoryError> {
        self.inner.insert(session)
    }

    fn modify(
        &self,
        id: &SessionId,
        change: &mut dyn FnMut(&mut TriageSession),
    ) -> Result<TriageSession, RepositoryError> {
        self.gate.wait();
        self.inner.modify(id, change)
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn remove(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError> {
        self.inner.remove(id)
    }
}

#[test]
fn start_persists_an_incomplete_session() {
    let (service, repository) = build_service();

    let session = service.start().expect("session starts");

    assert!(session.id.0.starts_with("triage-"));
    assert_eq!(session.status(), SessionStatus::Incomplete);
    let stored = repository
        .fetch(&session.id)
        .expect("fetch succeeds")
        .expect("session present");
    assert_eq!(stored, session);
}

#[test]
fn record_turn_persists_the_merged_record_and_status() {
    let (service, repository) = build_service();
    let session = service.start().expect("session starts");

    let report = service
        .record_turn(
            &session.id,
            &update(&[("cough", flag(true)), ("age_months", number(20.0))]),
        )
        .expect("turn recorded");

    assert_eq!(report.outcome.status(), SessionStatus::Complete);
    let stored = repository
        .fetch(&session.id)
        .expect("fetch succeeds")
        .expect("session present");
    assert_eq!(stored.status(), SessionStatus::Complete);
    assert_eq!(stored.turns, 1);
    assert_eq!(stored.record.missing_fields().len(), 4);
}

#[test]
fn record_turn_rejects_completed_sessions() {
    let (service, _) = build_service();
    let session = service.start().expect("session starts");
    service
        .record_turn(&session.id, &update(&[("cough", flag(true))]))
        .expect("first turn");

    match service.record_turn(&session.id, &update(&[("fever", flag(true))])) {
        Err(TriageServiceError::SessionClosed(id)) => assert_eq!(id, session.id),
        other => panic!("expected closed session, got {other:?}"),
    }
}

#[test]
fn record_turn_propagates_not_found() {
    let (service, _) = build_service();

    match service.record_turn(&SessionId("triage-missing".to_string()), &update(&[])) {
        Err(TriageServiceError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn repository_failures_are_propagated() {
    let service = TriageService::new(
        Arc::new(UnavailableRepository),
        pneumonia_rules(),
        PatientSchema::imci(),
    );

    match service.start() {
        Err(TriageServiceError::Repository(RepositoryError::Unavailable(reason))) => {
            assert!(reason.contains("offline"));
        }
        other => panic!("expected unavailable repository, got {other:?}"),
    }
}

#[test]
fn end_discards_the_session() {
    let (service, repository) = build_service();
    let session = service.start().expect("session starts");

    let ended = service.end(&session.id).expect("session ends");

    assert_eq!(ended.id, session.id);
    assert_eq!(repository.len(), 0);
    assert!(matches!(
        service.get(&session.id),
        Err(TriageServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn evaluate_uses_a_fresh_record_without_storing_anything() {
    let (service, repository) = build_service();

    let report = service.evaluate(&update(&[
        ("age_months", number(18.0)),
        ("respiratory_rate", number(55.0)),
        ("chest_indrawing", flag(true)),
    ]));

    let result = report.outcome.result().expect("classified");
    assert_eq!(result.overall_risk_level, "High");
    assert_eq!(repository.len(), 0);
}

#[test]
fn custom_schema_limits_which_fields_are_tracked() {
    let repository = Arc::new(MemoryRepository::default());
    let service = TriageService::new(
        repository,
        pneumonia_rules(),
        PatientSchema::new(["cough", "fever"]),
    );
    let session = service.start().expect("session starts");

    let report = service
        .record_turn(&session.id, &update(&[("fever", flag(false))]))
        .expect("turn recorded");

    let value = serde_json::to_value(&report).expect("serializes");
    assert_eq!(value["missing_fields"], serde_json::json!(["cough"]));
}

#[test]
fn concurrent_turns_on_one_session_keep_every_field() {
    let repository = Arc::new(GatedRepository {
        inner: MemoryRepository::default(),
        gate: Barrier::new(2),
    });
    let service = TriageService::new(repository, pneumonia_rules(), PatientSchema::imci());
    let session = service.start().expect("session starts");

    std::thread::scope(|scope| {
        let fever = scope.spawn(|| {
            service.record_turn(&session.id, &update(&[("fever", flag(true))]))
        });
        let age = scope.spawn(|| {
            service.record_turn(&session.id, &update(&[("age_months", number(18.0))]))
        });
        fever
            .join()
            .expect("fever turn thread")
            .expect("fever turn recorded");
        age.join()
            .expect("age turn thread")
            .expect("age turn recorded");
    });

    let stored = service.get(&session.id).expect("session stored");
    assert_eq!(stored.turns, 2);
    assert_eq!(stored.record.get("fever"), Some(&FieldValue::Flag(true)));
    assert_eq!(stored.record.get("age_months"), Some(&FieldValue::Number(18.0)));
}

#[test]
fn turns_on_ended_sessions_are_not_found() {
    let (service, _) = build_service();
    let session = service.start().expect("session starts");
    service.end(&session.id).expect("session ends");

    assert!(matches!(
        service.record_turn(&session.id, &update(&[("fever", flag(true))])),
        Err(TriageServiceError::Repository(RepositoryError::NotFound))
    ));
}

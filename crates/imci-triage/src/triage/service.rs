use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use super::orchestrator::{TriageOrchestrator, TriageReport};
use super::patient::{FieldUpdate, PatientRecord, PatientSchema};
use super::repository::{RepositoryError, SessionRepository};
use super::rules::RuleSet;
use super::session::{SessionId, TriageSession};

/// Service composing the shared rule set, the orchestrator and session storage.
pub struct TriageService<R> {
    orchestrator: Arc<TriageOrchestrator>,
    repository: Arc<R>,
    schema: PatientSchema,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("triage-{id:06}"))
}

impl<R> TriageService<R>
where
    R: SessionRepository + 'static,
{
    pub fn new(repository: Arc<R>, rules: Arc<RuleSet>, schema: PatientSchema) -> Self {
        Self {
            orchestrator: Arc::new(TriageOrchestrator::new(rules)),
            repository,
            schema,
        }
    }

    pub fn schema(&self) -> &PatientSchema {
        &self.schema
    }

    /// Open a new session with an empty patient record.
    pub fn start(&self) -> Result<TriageSession, TriageServiceError> {
        let session = TriageSession::new(next_session_id(), &self.schema);
        let stored = self.repository.insert(session)?;
        info!(session = %stored.id, "triage session started");
        Ok(stored)
    }

    /// Merge one turn of extracted fields and persist the updated session.
    /// Turns on the same session are applied one at a time by the repository.
    pub fn record_turn(
        &self,
        session_id: &SessionId,
        extracted: &FieldUpdate,
    ) -> Result<TriageReport, TriageServiceError> {
        let mut outcome = None;
        self.repository.modify(session_id, &mut |session| {
            outcome = Some(if session.is_complete() {
                Err(TriageServiceError::SessionClosed(session_id.clone()))
            } else {
                Ok(self.orchestrator.step(session, extracted))
            });
        })?;

        outcome.unwrap_or(Err(TriageServiceError::Repository(RepositoryError::NotFound)))
    }

    /// Fetch a session for API responses.
    pub fn get(&self, session_id: &SessionId) -> Result<TriageSession, TriageServiceError> {
        let session = self
            .repository
            .fetch(session_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(session)
    }

    /// Discard a session and return its final state.
    pub fn end(&self, session_id: &SessionId) -> Result<TriageSession, TriageServiceError> {
        let session = self
            .repository
            .remove(session_id)?
            .ok_or(RepositoryError::NotFound)?;
        info!(session = %session.id, status = session.status().label(), "triage session ended");
        Ok(session)
    }

    /// One-shot triage of a fully extracted patient, outside any session.
    pub fn evaluate(&self, extracted: &FieldUpdate) -> TriageReport {
        let mut record = PatientRecord::new(&self.schema);
        record.merge(extracted);
        self.orchestrator.assess(&record)
    }
}

/// Error raised by the triage service.
#[derive(Debug, thiserror::Error)]
pub enum TriageServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("triage session {0} is already complete")]
    SessionClosed(SessionId),
}

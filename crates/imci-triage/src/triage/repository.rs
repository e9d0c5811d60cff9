use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::patient::FieldValue;
use super::session::{SessionId, TriageSession};

/// Storage abstraction so the service can run against any session store.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, session: TriageSession) -> Result<TriageSession, RepositoryError>;
    /// Applies `change` to the stored session with exclusive access and returns
    /// the updated copy. Concurrent changes to one session must not interleave.
    fn modify(
        &self,
        id: &SessionId,
        change: &mut dyn FnMut(&mut TriageSession),
    ) -> Result<TriageSession, RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError>;
    fn remove(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Externally visible snapshot of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub status: &'static str,
    pub patient: BTreeMap<String, FieldValue>,
    pub missing_fields: Vec<String>,
    pub turns: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&TriageSession> for SessionView {
    fn from(session: &TriageSession) -> Self {
        Self {
            session_id: session.id.clone(),
            status: session.status().label(),
            patient: session.record.known_fields(),
            missing_fields: session.record.missing_fields(),
            turns: session.turns,
            started_at: session.started_at,
            updated_at: session.updated_at,
        }
    }
}

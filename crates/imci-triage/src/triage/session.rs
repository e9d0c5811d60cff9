use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patient::{PatientRecord, PatientSchema};

/// Identifier wrapper for triage conversations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Incomplete,
    Complete,
    Undetermined,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Incomplete => "incomplete",
            SessionStatus::Complete => "complete",
            SessionStatus::Undetermined => "undetermined",
        }
    }
}

/// One patient conversation: the record being filled in and where triage stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageSession {
    pub id: SessionId,
    pub record: PatientRecord,
    status: SessionStatus,
    pub turns: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TriageSession {
    pub fn new(id: SessionId, schema: &PatientSchema) -> Self {
        let now = Utc::now();
        Self {
            id,
            record: PatientRecord::new(schema),
            status: SessionStatus::default(),
            turns: 0,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Complete
    }

    /// Moves to `next` unless the session is already complete; returns whether
    /// the status changed.
    pub(crate) fn transition(&mut self, next: SessionStatus) -> bool {
        if self.is_complete() || self.status == next {
            return false;
        }
        self.status = next;
        true
    }

    pub(crate) fn touch(&mut self) {
        self.turns += 1;
        self.updated_at = Utc::now();
    }
}

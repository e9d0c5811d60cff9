use imci_triage::config::TriageConfig;
use imci_triage::error::AppError;
use imci_triage::triage::{RepositoryError, RuleSet, SessionId, SessionRepository, TriageSession};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, TriageSession>>>,
}

impl InMemorySessionRepository {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, TriageSession>>, RepositoryError> {
        self.sessions
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store lock poisoned".to_string()))
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, session: TriageSession) -> Result<TriageSession, RepositoryError> {
        let mut guard = self.lock()?;
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
        let mut guard = self.lock()?;
        let session = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        change(session);
        Ok(session.clone())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn remove(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError> {
        Ok(self.lock()?.remove(id))
    }
}

/// Resolves the rule source: explicit override, then `APP_RULES_PATH`, then the
/// built-in IMCI rules.
pub(crate) fn load_rules(
    config: &TriageConfig,
    override_path: Option<&Path>,
) -> Result<Arc<RuleSet>, AppError> {
    let path = override_path.or(config.rules_path.as_deref());
    let rules = match path {
        Some(path) => RuleSet::from_path(path)?,
        None => RuleSet::imci()?,
    };

    let source = path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());
    info!(
        %source,
        rules = rules.len(),
        warnings = rules.warnings().len(),
        "triage rules loaded"
    );

    Ok(Arc::new(rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use imci_triage::triage::PatientSchema;

    fn triage_config(rules_path: Option<&str>) -> TriageConfig {
        TriageConfig {
            rules_path: rules_path.map(Into::into),
            patient_fields: PatientSchema::imci().field_names().to_vec(),
        }
    }

    #[test]
    fn built_in_rules_are_used_without_a_path() {
        let rules = load_rules(&triage_config(None), None).expect("built-in rules load");
        assert_eq!(rules.len(), 5);
    }

    #[test]
    fn override_path_wins_over_configured_path() {
        let config = triage_config(Some("/nonexistent/configured.json"));
        let err = load_rules(&config, Some(Path::new("/nonexistent/override.json")))
            .expect_err("missing file fails");

        assert!(matches!(err, AppError::Rules(_)));
        assert!(err.to_string().contains("override.json"));
    }

    #[test]
    fn repository_rejects_duplicate_sessions() {
        let repository = InMemorySessionRepository::default();
        let session = TriageSession::new(SessionId("triage-000001".into()), &PatientSchema::imci());

        repository.insert(session.clone()).expect("first insert");
        assert!(matches!(
            repository.insert(session),
            Err(RepositoryError::Conflict)
        ));
    }

    #[test]
    fn modify_updates_the_stored_session_in_place() {
        let repository = InMemorySessionRepository::default();
        let id = SessionId("triage-000002".into());
        repository
            .insert(TriageSession::new(id.clone(), &PatientSchema::imci()))
            .expect("insert");

        let updated = repository
            .modify(&id, &mut |session| session.turns += 1)
            .expect("modify succeeds");
        assert_eq!(updated.turns, 1);
        assert_eq!(
            repository.fetch(&id).expect("fetch").map(|session| session.turns),
            Some(1)
        );

        let missing = SessionId("triage-missing".into());
        assert!(matches!(
            repository.modify(&missing, &mut |_| {}),
            Err(RepositoryError::NotFound)
        ));
    }
}

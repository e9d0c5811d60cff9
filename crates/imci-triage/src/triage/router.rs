use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::patient::FieldUpdate;
use super::repository::{RepositoryError, SessionRepository, SessionView};
use super::service::{TriageService, TriageServiceError};
use super::session::SessionId;

/// Router builder exposing HTTP endpoints for triage sessions.
pub fn triage_router<R>(service: Arc<TriageService<R>>) -> Router
where
    R: SessionRepository + 'static,
{
    Router::new()
        .route("/api/v1/triage/sessions", post(start_handler::<R>))
        .route(
            "/api/v1/triage/sessions/:session_id",
            get(status_handler::<R>).delete(end_handler::<R>),
        )
        .route(
            "/api/v1/triage/sessions/:session_id/turns",
            post(turn_handler::<R>),
        )
        .route("/api/v1/triage/evaluate", post(evaluate_handler::<R>))
        .with_state(service)
}

pub(crate) async fn start_handler<R>(State(service): State<Arc<TriageService<R>>>) -> Response
where
    R: SessionRepository + 'static,
{
    match service.start() {
        Ok(session) => {
            let view = SessionView::from(&session);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn turn_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    Path(session_id): Path<String>,
    axum::Json(extracted): axum::Json<FieldUpdate>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    match service.record_turn(&id, &extracted) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.get(&SessionId(session_id)) {
        Ok(session) => (StatusCode::OK, axum::Json(SessionView::from(&session))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn end_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.end(&SessionId(session_id)) {
        Ok(session) => (StatusCode::OK, axum::Json(SessionView::from(&session))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn evaluate_handler<R>(
    State(service): State<Arc<TriageService<R>>>,
    axum::Json(extracted): axum::Json<FieldUpdate>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let report = service.evaluate(&extracted);
    (StatusCode::OK, axum::Json(report)).into_response()
}

fn error_response(err: TriageServiceError) -> Response {
    let status = match &err {
        TriageServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        TriageServiceError::Repository(RepositoryError::Conflict)
        | TriageServiceError::SessionClosed(_) => StatusCode::CONFLICT,
        TriageServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

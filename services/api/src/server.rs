use crate::cli::ServeArgs;
use crate::infra::{load_rules, AppState, InMemorySessionRepository};
use crate::routes::with_triage_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use imci_triage::config::AppConfig;
use imci_triage::error::AppError;
use imci_triage::telemetry;
use imci_triage::triage::TriageService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let rules = load_rules(&config.triage, args.rules.path.as_deref())?;
    let repository = Arc::new(InMemorySessionRepository::default());
    let triage_service = Arc::new(TriageService::new(
        repository,
        rules,
        config.triage.schema(),
    ));

    let app = with_triage_routes(triage_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "imci triage service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

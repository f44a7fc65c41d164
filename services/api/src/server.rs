use crate::cli::ServeArgs;
use crate::infra::{build_services, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use findit::config::AppConfig;
use findit::error::AppError;
use findit::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    args.apply(&mut config);
    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = build_services(&config);
    let app = with_service_routes(services.orchestrator, services.chat)
        .layer(Extension(state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::Bind { addr, source })?;
    readiness.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        notifications = config.notifications.enabled,
        chat_capacity = config.chat.channel_capacity,
        "findit claim service ready"
    );

    axum::serve(listener, app).await.map_err(AppError::Serve)
}

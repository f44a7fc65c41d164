use crate::infra::{AppState, Chat, Orchestrator};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use findit::chat::chat_router;
use findit::workflows::claims::claims_router;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_service_routes(orchestrator: Arc<Orchestrator>, chat: Arc<Chat>) -> axum::Router {
    claims_router(orchestrator)
        .merge(chat_router(chat))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::build_services;
    use axum::body::Body;
    use axum::http::Request;
    use findit::auth::CALLER_HEADER;
    use findit::config::{
        AppConfig, AppEnvironment, ChatConfig, NotificationConfig, ServerConfig, TelemetryConfig,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn config() -> AppConfig {
        AppConfig {
            environment: AppEnvironment::Test,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
            },
            notifications: NotificationConfig {
                enabled: false,
                sender: "FindIt".to_string(),
            },
            chat: ChatConfig {
                channel_capacity: 8,
            },
        }
    }

    fn state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn app(ready: bool) -> axum::Router {
        let services = build_services(&config());
        with_service_routes(services.orchestrator, services.chat).layer(Extension(state(ready)))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let response = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(true)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn workflow_routes_are_mounted() {
        let app = app(true);

        let unread = app
            .clone()
            .oneshot(
                Request::get("/api/chat/unread")
                    .header(CALLER_HEADER, "dana")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(unread.status(), StatusCode::OK);

        let missing = app
            .oneshot(
                Request::get("/api/items/item-unknown")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}

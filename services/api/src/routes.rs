use crate::infra::{AppState, Desk};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use job_board::workflows::applications::application_router;
use serde_json::json;
use std::sync::Arc;

/// AJAX endpoint plus the operational probes.
pub(crate) fn with_service_routes(desk: Arc<Desk>) -> axum::Router {
    application_router(desk)
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
    use axum::body::Body;
    use axum::http::Request;
    use job_board::workflows::applications::{
        ActorId, ApplicationDesk, InMemoryJobDirectory, ReviewerRoster,
        SqliteApplicationRepository, StatusSet, SystemClock,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    fn desk() -> Arc<Desk> {
        Arc::new(ApplicationDesk::new(
            Arc::new(SqliteApplicationRepository::open_in_memory().expect("database opens")),
            Arc::new(ReviewerRoster::new(Vec::<ActorId>::new(), "routes-secret")),
            Arc::new(InMemoryJobDirectory::default()),
            StatusSet::standard(),
            Arc::new(SystemClock),
        ))
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_flagged() {
        let state = state(false);
        let response = readiness_endpoint(Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.readiness.store(true, Ordering::Release);
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn probes_are_mounted_next_to_the_ajax_endpoint() {
        let app = with_service_routes(desk()).layer(Extension(state(true)));

        let health = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(health.status(), StatusCode::OK);

        let ajax = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin-ajax")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"action":"get_board","nonce":"00"}"#))
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(ajax.status(), StatusCode::FORBIDDEN);
    }
}

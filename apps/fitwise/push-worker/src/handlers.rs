//! HTTP surface of the worker: the ingestion trigger plus health and metrics.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use core_config::AppInfo;
use domain_notifications::metrics::{DispatchMetrics, render_metrics};
use domain_notifications::{
    DispatchReport, NotificationCreated, NotificationError, NotificationEvent, NotificationListener,
    NotificationResult,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub listener: Arc<dyn NotificationListener>,
    pub app_info: AppInfo,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

/// Build the worker router.
///
/// - `POST /events/notification-created`
/// - `GET /health`
/// - `GET /metrics`
pub fn router(listener: Arc<dyn NotificationListener>, app_info: AppInfo) -> Router {
    Router::new()
        .route("/events/notification-created", post(notification_created))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(AppState { listener, app_info })
}

fn parse_trigger(body: &[u8]) -> NotificationResult<NotificationEvent> {
    let created: NotificationCreated = serde_json::from_slice(body).map_err(|e| {
        NotificationError::MalformedEvent(format!("unreadable trigger payload: {}", e))
    })?;
    created.into_event()
}

/// Trigger endpoint. Always answers 202 so the trigger never retries on
/// our account; the body reports what happened.
async fn notification_created(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<DispatchReport>) {
    let report = match parse_trigger(&body) {
        Ok(event) => state.listener.on_notification_created(event).await,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Dropping notification trigger");
            DispatchMetrics::new().aborted();
            DispatchReport::Aborted {
                reason: e.to_string(),
            }
        }
    };

    (StatusCode::ACCEPTED, Json(report))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: state.app_info.name,
        version: state.app_info.version,
    })
}

async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_metrics(),
    )
}

//! Liveness and readiness endpoints.

use crate::server::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use helpdesk_runtime::HealthCheck;

/// `GET /health`: the process is up
///
/// Does not touch the ticket store.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// `GET /health/ready`: the ticket store answers
///
/// - 200 OK: healthy
/// - 503 Service Unavailable: the store cannot be reached
///
/// ```json
/// { "component": "ticket_store", "status": "Healthy", "message": null, "metadata": [["latency_ms", "3"]] }
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthCheck>) {
    let start = std::time::Instant::now();
    let result = state.query.ping().await;
    let latency_ms = start.elapsed().as_millis().to_string();

    let health = match result {
        Ok(()) => HealthCheck::healthy("ticket_store"),
        Err(error) => {
            tracing::warn!(%error, "Readiness check failed");
            HealthCheck::unhealthy("ticket_store", error.to_string())
        },
    }
    .with_metadata("latency_ms", latency_ms);

    let status = if health.status.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, Json(health))
}

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::time::Instant;

use crate::AppState;

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn get_uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Liveness probe, answers as long as the process is serving
async fn liveness_check() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": get_uptime_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Readiness probe, checks database connectivity
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match db_result {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": { "database": { "status": "up", "latency_ms": latency_ms } }
            })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": { "database": { "status": "down", "latency_ms": latency_ms } }
            })),
        ),
    }
}

/// Creates the router for health check endpoints
///
/// - GET /health        liveness
/// - GET /health/ready  readiness (database)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness_check))
        .route("/ready", get(readiness_check))
}

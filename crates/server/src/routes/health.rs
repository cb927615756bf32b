// crates/server/src/routes/health.rs
//! Health check endpoint for the API.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::jobs::JobCounts;
use crate::state::AppState;

/// Response for the health check endpoint.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub workers: usize,
    pub queue_depth: usize,
    pub jobs: JobCounts,
}

/// GET /api/health - server status, version, uptime and pool load.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let scheduler = state.fonts.scheduler();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime_secs(),
        workers: scheduler.concurrency(),
        queue_depth: scheduler.queue_depth(),
        jobs: state.fonts.registry().counts(),
    })
}

/// Create the health routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

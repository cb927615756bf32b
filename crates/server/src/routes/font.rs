// crates/server/src/routes/font.rs
//! Font generation endpoints.
//!
//! - POST /font/generate - validate a glyph selection and schedule its build
//! - POST /font/status - poll a job by `{ "id" }`
//! - GET /font/status/{id} - same, id in the path
//! - GET /font/jobs - jobs that have not reached a terminal state

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::jobs::Job;
use crate::service::StatusResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub id: String,
}

/// POST /api/font/generate
async fn generate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = body.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    Ok(Json(state.fonts.generate(&request).await?))
}

/// POST /api/font/status
async fn status(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    // A body without a usable id cannot name a known job.
    let Json(request) = body.map_err(|_| ApiError::UnknownJob(String::new()))?;
    Ok(Json(state.fonts.status(&request.id).await?))
}

/// GET /api/font/status/{id}
async fn status_by_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    Ok(Json(state.fonts.status(&id).await?))
}

/// GET /api/font/jobs
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<Job>> {
    Json(state.fonts.registry().active())
}

/// Build the font router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/font/generate", post(generate))
        .route("/font/status", post(status))
        .route("/font/status/{id}", get(status_by_path))
        .route("/font/jobs", get(list_jobs))
}

// crates/server/src/routes/mod.rs
//! API route handlers for the fontpack server.

pub mod font;
pub mod health;
pub mod metrics;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check and pool load
/// - POST /api/font/generate - Request a font build
/// - POST /api/font/status - Poll a job (`{ "id" }` body)
/// - GET  /api/font/status/{id} - Poll a job
/// - GET  /api/font/jobs - Jobs still enqueued or running
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", font::router())
        .with_state(state)
}

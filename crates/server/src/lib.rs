// crates/server/src/lib.rs
//! fontpack server library.
//!
//! Axum HTTP surface over the build pipeline: validate a glyph selection,
//! deduplicate it by fingerprint, build it on a bounded worker pool and
//! serve the finished archive.

pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod routes;
pub mod service;
pub mod state;

pub use config::{Cli, ConfigError, ServerConfig};
pub use error::*;
pub use metrics::init_metrics;
pub use routes::api_routes;
pub use service::{FontService, ServiceError, StatusResponse};
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes under `/api`
/// - `GET /metrics` for Prometheus
/// - `/download` serving finished archives from the results root
/// - CORS (allows any origin) and request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let downloads = ServeDir::new(state.fonts.store().download_root());

    Router::new()
        .merge(api_routes(state.clone()))
        .merge(routes::metrics::router().with_state(state))
        .nest_service("/download", downloads)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::scheduler::test_support::eventually;
    use crate::jobs::JobStatus;
    use crate::state::test_support::test_app;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use fontpack_core::FontId;
    use tower::ServiceExt;

    /// Helper to make a GET request to the app.
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        (status, body_str)
    }

    // ========================================================================
    // Health Endpoint Tests
    // ========================================================================

    #[tokio::test]
    async fn test_health_endpoint_response_structure() {
        let t = test_app();
        let (status, body) = get(create_app(t.state.clone()), "/api/health").await;

        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["uptime_secs"].is_number());
        assert_eq!(json["workers"], 1);
        assert_eq!(json["jobs"]["ready"], 0);
    }

    // ========================================================================
    // Download Tests
    // ========================================================================

    #[tokio::test]
    async fn test_download_serves_finished_archive() {
        let t = test_app();
        let status = t
            .state
            .fonts
            .generate(&serde_json::json!({"glyphs": [{"src": "A", "from": 10}]}))
            .await
            .unwrap();
        t.builder.release(1);
        let font_id = FontId::parse(&status.id).unwrap();
        eventually(|| {
            t.state.fonts.registry().peek(&font_id).map(|j| j.status) == Some(JobStatus::Ready)
        })
        .await;

        let (a, b) = font_id.shards();
        let (code, body) = get(
            create_app(t.state.clone()),
            &format!("/download/{a}/{b}/{}.zip", font_id),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        // the gated test builder writes the font id as the archive body
        assert_eq!(body, font_id.as_str());

        let (code, _) = get(create_app(t.state.clone()), "/download/00/00/missing.zip").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    // ========================================================================
    // CORS Tests
    // ========================================================================

    #[tokio::test]
    async fn test_cors_headers() {
        let t = test_app();
        let app = create_app(t.state.clone());

        // Make an OPTIONS preflight request
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/font/generate")
                    .header("Origin", "http://localhost:3000")
                    .header("Access-Control-Request-Method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert!(
            headers.contains_key("access-control-allow-origin"),
            "Expected access-control-allow-origin header"
        );
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let t = test_app();
        let app = create_app(t.state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("Origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let allow_origin = response.headers().get("access-control-allow-origin");
        assert_eq!(allow_origin.unwrap(), "*");
    }

    // ========================================================================
    // 404 Tests
    // ========================================================================

    #[tokio::test]
    async fn test_404_for_unknown_route() {
        let t = test_app();
        let (status, _body) = get(create_app(t.state.clone()), "/api/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_404_for_non_api_path() {
        let t = test_app();
        // Without /api prefix, should be 404
        let (status, _body) = get(create_app(t.state.clone()), "/health").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

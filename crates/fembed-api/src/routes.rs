//! API routes.

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{batch_extract, extract_embedding, health, models, stats};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Endpoints listed in the 404 response.
const AVAILABLE_ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /models",
    "GET /stats",
    "POST /extract_embedding",
    "POST /batch_extract",
];

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    crate::error::redact_internal_errors(state.config.is_production());

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/models", get(models))
        .route("/stats", get(stats))
        .route("/extract_embedding", post(extract_embedding))
        .route("/batch_extract", post(batch_extract));

    if let Some(handle) = metrics_handle {
        router = router.route(
            "/metrics",
            get(move || std::future::ready(handle.render())),
        );
    }

    router
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

/// Unknown route handler.
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Not found",
            "availableEndpoints": AVAILABLE_ENDPOINTS,
        })),
    )
}

//! Axum HTTP API server.
//!
//! This crate provides:
//! - Single-image embedding extraction with strategy fallback
//! - Batch extraction with per-item failure isolation
//! - Health, model and stats endpoints gated on engine readiness
//! - CORS, request-id and request-logging middleware
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

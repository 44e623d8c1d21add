//! API error types.
//!
//! The taxonomy maps to HTTP as follows: not-ready is 503 with a
//! progress snapshot, bad input is 400, anything unexpected is 500 with
//! the inference time spent before the failure. "No face detected" is
//! deliberately NOT an error; it is a normal success-shaped response
//! with `success: false`.

use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use fembed_models::LoadingProgress;

pub type ApiResult<T> = Result<T, ApiError>;

/// Whether internal error details are hidden from response bodies.
/// Written once at startup from `ApiConfig::is_production`.
static REDACT_INTERNAL: OnceLock<bool> = OnceLock::new();

/// Configure internal-error redaction. Later calls are ignored.
pub fn redact_internal_errors(enabled: bool) {
    let _ = REDACT_INTERNAL.set(enabled);
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Models are still loading")]
    NotReady(LoadingProgress),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        /// Milliseconds spent on inference before the failure; zero
        /// when no attempt ran.
        inference_time_ms: u64,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            inference_time_ms: 0,
        }
    }

    pub fn internal_timed(msg: impl Into<String>, inference_time_ms: u64) -> Self {
        Self::Internal {
            message: msg.into(),
            inference_time_ms,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    inference_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<LoadingProgress>,
}

fn internal_error_message(message: &str, redact: bool) -> String {
    if redact {
        "An internal error occurred".to_string()
    } else {
        format!("Internal error: {}", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error = match &self {
            ApiError::Internal { message, .. } => {
                internal_error_message(message, *REDACT_INTERNAL.get().unwrap_or(&false))
            }
            ApiError::NotReady(_) => "Models are still loading".to_string(),
            _ => self.to_string(),
        };

        let inference_time = match &self {
            ApiError::Internal {
                inference_time_ms, ..
            } => Some(*inference_time_ms),
            _ => None,
        };

        let progress = match self {
            ApiError::NotReady(progress) => Some(progress),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error,
            inference_time,
            progress,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use http_body_util::BodyExt;

    async fn response_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::NotReady(LoadingProgress::default()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::bad_request("missing image").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::internal_timed("boom", 42).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_body_carries_inference_time() {
        let (status, body) = response_json(ApiError::internal_timed("boom", 42)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["inferenceTime"], 42);
        assert!(body["error"].as_str().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_internal_without_attempt_reports_zero_time() {
        let (_, body) = response_json(ApiError::internal("boom")).await;
        assert_eq!(body["inferenceTime"], 0);
    }

    #[tokio::test]
    async fn test_bad_request_body_has_no_inference_time() {
        let (status, body) = response_json(ApiError::bad_request("missing image")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("inferenceTime").is_none());
    }

    #[test]
    fn test_internal_message_redaction() {
        assert_eq!(
            internal_error_message("db exploded", true),
            "An internal error occurred"
        );
        assert_eq!(
            internal_error_message("db exploded", false),
            "Internal error: db exploded"
        );
    }
}

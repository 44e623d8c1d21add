//! Embedding extraction handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use fembed_engine::FaceImage;
use fembed_models::{BatchItemResult, BatchSummary, BoundingBox, FallbackOutcome, FallbackReport};

use crate::error::{ApiError, ApiResult};
use crate::metrics::{record_batch_request, record_embedding_request};
use crate::state::AppState;

/// Response for `POST /extract_embedding`.
///
/// "No face detected" shares this shape with `success: false`; it is a
/// legitimate outcome, not an HTTP error.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub inference_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategies_tried: Option<Vec<String>>,
}

impl From<FallbackReport> for EmbeddingResponse {
    fn from(report: FallbackReport) -> Self {
        let inference_time = report.time_ms;
        match report.outcome {
            FallbackOutcome::Detected {
                detection,
                strategy,
            } => Self {
                success: true,
                embedding: Some(detection.descriptor),
                inference_time,
                strategy: Some(strategy),
                bounding_box: Some(detection.bounding_box),
                confidence: Some(detection.confidence),
                landmarks: Some(detection.landmarks),
                error: None,
                strategies_tried: None,
            },
            FallbackOutcome::Exhausted { attempted } => Self {
                success: false,
                embedding: None,
                inference_time,
                strategy: None,
                bounding_box: None,
                confidence: None,
                landmarks: None,
                error: Some("No face detected with any strategy".to_string()),
                strategies_tried: Some(attempted),
            },
        }
    }
}

/// Extract a face embedding from a single base64 image.
///
/// Validation happens here, before any strategy runs: a missing field
/// or undecodable payload is a 400 and the engine is never touched.
pub async fn extract_embedding(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<EmbeddingResponse>> {
    let engine = state.engine_context()?;

    let payload = body
        .get("image")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("Missing required field: image"))?;

    let image = FaceImage::from_base64(payload)
        .map_err(|e| ApiError::bad_request(format!("Invalid image format: {}", e)))?;

    let report = engine
        .controller
        .detect_with_fallback(&image, &state.cascade)
        .await;

    record_embedding_request(if report.is_success() {
        "detected"
    } else {
        "no_detection"
    });

    Ok(Json(EmbeddingResponse::from(report)))
}

/// Response for `POST /batch_extract`.
#[derive(Debug, Serialize)]
pub struct BatchExtractResponse {
    pub results: Vec<BatchItemResult>,
    pub summary: BatchSummary,
}

/// Extract embeddings for a batch of base64 images.
///
/// The batch always runs to completion; individual failures are
/// reported per item. Only a missing or malformed `images` field is
/// rejected up front.
pub async fn batch_extract(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<BatchExtractResponse>> {
    let engine = state.engine_context()?;

    let items = body
        .get("images")
        .ok_or_else(|| ApiError::bad_request("Missing required field: images"))?
        .as_array()
        .ok_or_else(|| ApiError::bad_request("Field 'images' must be an array"))?;

    let images: Vec<String> = items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ApiError::bad_request("Field 'images' must contain base64 strings"))
        })
        .collect::<ApiResult<_>>()?;

    // Batch runs use the highest-recall configuration only; fallback is
    // a single-image affordance.
    let config = &state.cascade[0];

    let (results, summary) = engine.runner.run_batch(&images, config).await;

    record_batch_request(summary.total, summary.successful);
    info!(
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        "Batch extraction completed"
    );

    Ok(Json(BatchExtractResponse { results, summary }))
}

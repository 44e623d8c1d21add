//! API integration tests.
//!
//! These run the real router against a scripted fake engine, so no
//! model files are needed. Run with: `cargo test -p fembed-api`

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageBuffer, Rgb};
use serde_json::{json, Value};
use tower::ServiceExt;

use fembed_api::{create_router, ApiConfig, AppState};
use fembed_engine::{EngineResult, FaceImage, InferenceEngine};
use fembed_models::{BoundingBox, Detection, DetectorConfig};

/// Fake engine: succeeds on the given strategy names, finds nothing on
/// the rest.
struct FakeEngine {
    succeed_on: Vec<&'static str>,
}

#[async_trait]
impl InferenceEngine for FakeEngine {
    async fn detect(
        &self,
        _image: &FaceImage,
        config: &DetectorConfig,
    ) -> EngineResult<Option<Detection>> {
        if self.succeed_on.contains(&config.name.as_str()) {
            Ok(Some(Detection {
                bounding_box: BoundingBox::new(12, 16, 96, 112),
                confidence: 0.91,
                landmarks: 68,
                descriptor: vec![0.1; 128],
            }))
        } else {
            Ok(None)
        }
    }

    fn descriptor_len(&self) -> usize {
        128
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

const MODEL_NAMES: &[&str] = &["tiny_face_detector", "face_recognition"];

fn ready_app(succeed_on: Vec<&'static str>) -> Router {
    let state = AppState::new(ApiConfig::default(), MODEL_NAMES.iter().copied());
    state.install_engine(Arc::new(FakeEngine { succeed_on }));
    create_router(state, None)
}

fn loading_app() -> Router {
    // Engine never installed: the service is up but not ready.
    let state = AppState::new(ApiConfig::default(), MODEL_NAMES.iter().copied());
    create_router(state, None)
}

fn png_base64() -> String {
    let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(48, 48, Rgb([90, 90, 90]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    STANDARD.encode(bytes)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_readiness_and_progress() {
    let response = loading_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ready"], false);
    assert_eq!(body["status"], "loading");
    assert_eq!(body["progress"]["tiny_face_detector"], false);
    assert!(body["memory"]["rssBytes"].is_u64());
}

#[tokio::test]
async fn test_models_lists_model_names() {
    let response = ready_app(vec!["tiny_face_416"])
        .oneshot(
            Request::builder()
                .uri("/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ready"], true);
    let models: Vec<&str> = body["models"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap())
        .collect();
    assert!(models.contains(&"tiny_face_detector"));
}

#[tokio::test]
async fn test_extract_embedding_first_strategy_wins() {
    let response = ready_app(vec!["tiny_face_416"])
        .oneshot(post_json(
            "/extract_embedding",
            json!({ "image": png_base64() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["strategy"], "tiny_face_416");
    assert_eq!(body["embedding"].as_array().unwrap().len(), 128);
    assert_eq!(body["boundingBox"]["width"], 96);
    assert_eq!(body["landmarks"], 68);
    assert!(body["inferenceTime"].is_u64());
}

#[tokio::test]
async fn test_extract_embedding_exhausts_all_strategies() {
    let response = ready_app(Vec::new())
        .oneshot(post_json(
            "/extract_embedding",
            json!({ "image": png_base64() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No face detected with any strategy");
    let tried: Vec<&str> = body["strategiesTried"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert_eq!(
        tried,
        vec!["tiny_face_416", "tiny_face_320", "tiny_face_224", "ssd_mobilenet"]
    );
}

#[tokio::test]
async fn test_extract_embedding_missing_image_field() {
    let response = ready_app(vec!["tiny_face_416"])
        .oneshot(post_json("/extract_embedding", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("image"));
}

#[tokio::test]
async fn test_extract_embedding_malformed_base64() {
    let response = ready_app(vec!["tiny_face_416"])
        .oneshot(post_json(
            "/extract_embedding",
            json!({ "image": "%%% not base64 %%%" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Invalid image format"));
}

#[tokio::test]
async fn test_endpoints_return_503_before_readiness() {
    let app = loading_app();

    let single = app
        .clone()
        .oneshot(post_json(
            "/extract_embedding",
            json!({ "image": png_base64() }),
        ))
        .await
        .unwrap();
    assert_eq!(single.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(single).await;
    assert_eq!(body["progress"]["face_recognition"], false);

    let batch = app
        .oneshot(post_json(
            "/batch_extract",
            json!({ "images": [png_base64()] }),
        ))
        .await
        .unwrap();
    assert_eq!(batch.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_batch_extract_isolates_item_failures() {
    let response = ready_app(vec!["tiny_face_416"])
        .oneshot(post_json(
            "/batch_extract",
            json!({ "images": [png_base64(), "broken!!!", png_base64()] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[1]["success"], false);
    assert_eq!(results[1]["index"], 1);
    assert!(results[1]["error"].as_str().unwrap().len() > 0);
    assert_eq!(results[2]["success"], true);

    assert_eq!(body["summary"]["total"], 3);
    assert_eq!(body["summary"]["successful"], 2);
    assert_eq!(body["summary"]["failed"], 1);
}

#[tokio::test]
async fn test_batch_extract_empty_batch() {
    let response = ready_app(vec!["tiny_face_416"])
        .oneshot(post_json("/batch_extract", json!({ "images": [] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 0);
    assert_eq!(body["summary"]["total"], 0);
    assert_eq!(body["summary"]["successful"], 0);
    assert_eq!(body["summary"]["failed"], 0);
    assert_eq!(body["summary"]["avgTimeMs"], 0);
}

#[tokio::test]
async fn test_batch_extract_missing_images_field() {
    let response = ready_app(vec!["tiny_face_416"])
        .oneshot(post_json("/batch_extract", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_extract_non_array_images() {
    let response = ready_app(vec!["tiny_face_416"])
        .oneshot(post_json(
            "/batch_extract",
            json!({ "images": "not-an-array" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("array"));
}

#[tokio::test]
async fn test_unknown_route_lists_endpoints() {
    let response = ready_app(Vec::new())
        .oneshot(
            Request::builder()
                .uri("/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    let endpoints = body["availableEndpoints"].as_array().unwrap();
    assert!(endpoints
        .iter()
        .any(|e| e.as_str().unwrap().contains("/extract_embedding")));
}

#[tokio::test]
async fn test_stats_reports_memory_and_uptime() {
    let response = ready_app(Vec::new())
        .oneshot(
            Request::builder()
                .uri("/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ready"], true);
    assert!(body["uptime"].is_u64());
    assert!(body["memory"]["rssBytes"].is_u64());
}

//! ONNX Runtime face detection and embedding engine.
//!
//! Four models are loaded from the configured model directory:
//! - `tiny_face_detector.onnx` — fast detector, variable input size
//! - `ssd_mobilenetv1.onnx` — full detector, recall-oriented
//! - `face_landmark_68.onnx` — 68-point landmark regressor
//! - `face_recognition.onnx` — 128-dimensional descriptor network

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use image::DynamicImage;
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use fembed_models::{BoundingBox, Detection, DetectorConfig, DetectorFamily};

use crate::engine::InferenceEngine;
use crate::error::{EngineError, EngineResult};
use crate::image::FaceImage;
use crate::state::ReadinessState;

/// Descriptor length produced by the recognition model.
pub const EMBEDDING_DIM: usize = 128;

/// Landmark model input resolution.
const LANDMARK_INPUT_SIZE: u32 = 112;

/// Recognition model input resolution.
const RECOGNITION_INPUT_SIZE: u32 = 150;

/// Model names as tracked in the loading progress map.
pub mod model_names {
    pub const TINY_FACE_DETECTOR: &str = "tiny_face_detector";
    pub const SSD_MOBILENET: &str = "ssd_mobilenetv1";
    pub const FACE_LANDMARK_68: &str = "face_landmark_68";
    pub const FACE_RECOGNITION: &str = "face_recognition";

    pub const ALL: &[&str] = &[
        TINY_FACE_DETECTOR,
        SSD_MOBILENET,
        FACE_LANDMARK_68,
        FACE_RECOGNITION,
    ];
}

/// Configuration for the ONNX engine.
#[derive(Debug, Clone)]
pub struct OnnxEngineConfig {
    /// Directory holding the ONNX model files.
    pub model_dir: PathBuf,
}

impl Default for OnnxEngineConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
        }
    }
}

impl OnnxEngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            model_dir: std::env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),
        }
    }

    fn model_path(&self, name: &str) -> PathBuf {
        self.model_dir.join(format!("{}.onnx", name))
    }
}

/// One loaded model: session plus its first output name.
#[derive(Debug)]
struct LoadedModel {
    session: Mutex<Session>,
    output_name: String,
}

/// ONNX Runtime engine.
///
/// Sessions are Mutex-guarded: the runtime is not assumed reentrant,
/// which is also why batch execution stays sequential upstream.
pub struct OnnxFaceEngine {
    tiny_face: LoadedModel,
    ssd_mobilenet: LoadedModel,
    landmark: LoadedModel,
    recognition: LoadedModel,
}

impl OnnxFaceEngine {
    /// Load all models, marking per-model progress as each finishes.
    ///
    /// Readiness itself is flipped by the caller once the engine handle
    /// is installed, so progress never claims more than what is
    /// actually servable.
    pub fn load(config: &OnnxEngineConfig, state: &ReadinessState) -> EngineResult<Self> {
        let mut load_one = |name: &str| -> EngineResult<LoadedModel> {
            let model = load_model(&config.model_path(name))?;
            state.mark_loaded(name);
            info!(model = name, "Model loaded");
            Ok(model)
        };

        let tiny_face = load_one(model_names::TINY_FACE_DETECTOR)?;
        let ssd_mobilenet = load_one(model_names::SSD_MOBILENET)?;
        let landmark = load_one(model_names::FACE_LANDMARK_68)?;
        let recognition = load_one(model_names::FACE_RECOGNITION)?;

        Ok(Self {
            tiny_face,
            ssd_mobilenet,
            landmark,
            recognition,
        })
    }

    fn detector_for(&self, family: DetectorFamily) -> &LoadedModel {
        match family {
            DetectorFamily::TinyFace => &self.tiny_face,
            DetectorFamily::SsdMobilenet => &self.ssd_mobilenet,
        }
    }

    /// Run the detector for `config` and pick the best face box.
    fn detect_box(
        &self,
        image: &DynamicImage,
        config: &DetectorConfig,
    ) -> EngineResult<Option<(BoundingBox, f32)>> {
        let input = preprocess(image, config.input_size)?;
        let (shape, output) = run_model(self.detector_for(config.family), input)?;
        pick_best_box(&shape, &output, config, image.width(), image.height())
    }

    /// Count landmarks for a face crop.
    fn locate_landmarks(&self, face: &DynamicImage) -> EngineResult<u32> {
        let input = preprocess(face, LANDMARK_INPUT_SIZE)?;
        let (_, output) = run_model(&self.landmark, input)?;
        // The regressor emits interleaved (x, y) pairs.
        Ok((output.len() / 2) as u32)
    }

    /// Compute the descriptor for a face crop.
    fn compute_descriptor(&self, face: &DynamicImage) -> EngineResult<Vec<f32>> {
        let input = preprocess(face, RECOGNITION_INPUT_SIZE)?;
        let (_, output) = run_model(&self.recognition, input)?;

        if output.len() != EMBEDDING_DIM {
            return Err(EngineError::inference(format!(
                "Unexpected descriptor length: expected {}, got {}",
                EMBEDDING_DIM,
                output.len()
            )));
        }

        Ok(l2_normalize(output))
    }
}

#[async_trait]
impl InferenceEngine for OnnxFaceEngine {
    async fn detect(
        &self,
        image: &FaceImage,
        config: &DetectorConfig,
    ) -> EngineResult<Option<Detection>> {
        let Some((bounding_box, confidence)) = self.detect_box(image.image(), config)? else {
            return Ok(None);
        };

        let face = crop_face(image.image(), &bounding_box);
        let landmarks = self.locate_landmarks(&face)?;
        let descriptor = self.compute_descriptor(&face)?;

        debug!(
            strategy = %config.name,
            confidence,
            landmarks,
            "Inference attempt produced a detection"
        );

        Ok(Some(Detection {
            bounding_box,
            confidence,
            landmarks,
            descriptor,
        }))
    }

    fn descriptor_len(&self) -> usize {
        EMBEDDING_DIM
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Load one ONNX model into a session.
fn load_model(path: &Path) -> EngineResult<LoadedModel> {
    if !path.exists() {
        return Err(EngineError::ModelNotFound(path.to_path_buf()));
    }

    let model_bytes = std::fs::read(path)?;

    let session = Session::builder()
        .map_err(|e| EngineError::model_load_failed(format!("session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| EngineError::model_load_failed(format!("optimization level: {}", e)))?
        .commit_from_memory(&model_bytes)
        .map_err(|e| EngineError::model_load_failed(format!("{}: {}", path.display(), e)))?;

    let output_name = session
        .outputs()
        .first()
        .map(|o| o.name().to_string())
        .ok_or_else(|| EngineError::model_load_failed("model has no outputs"))?;

    Ok(LoadedModel {
        session: Mutex::new(session),
        output_name,
    })
}

/// Preprocess an image for inference.
///
/// - Resize to the square input size
/// - Normalize pixel values to [0, 1]
/// - Convert to NCHW format (batch, channels, height, width)
fn preprocess(img: &DynamicImage, input_size: u32) -> EngineResult<Value> {
    let resized = img.resize_exact(input_size, input_size, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let (w, h) = (input_size as usize, input_size as usize);

    let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                chw_data.push(pixel[c] as f32 / 255.0);
            }
        }
    }

    let shape = vec![1usize, 3, h, w];
    Tensor::from_array((shape, chw_data.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| EngineError::Preprocess(format!("Failed to create tensor: {}", e)))
}

/// Run one session and collect its first output tensor along with its
/// shape.
fn run_model(model: &LoadedModel, input: Value) -> EngineResult<(Vec<i64>, Vec<f32>)> {
    let mut session = model
        .session
        .lock()
        .map_err(|_| EngineError::inference("Session lock poisoned"))?;

    let outputs = session
        .run(ort::inputs![input])
        .map_err(|e| EngineError::inference(format!("ONNX inference failed: {}", e)))?;

    let output = outputs
        .get(model.output_name.as_str())
        .ok_or_else(|| EngineError::inference(format!("Missing output {}", model.output_name)))?;

    let tensor = output
        .try_extract_tensor::<f32>()
        .map_err(|e| EngineError::inference(format!("Failed to extract tensor: {}", e)))?;

    Ok((tensor.0.to_vec(), tensor.1.iter().copied().collect()))
}

/// Pick the best candidate box from a detector head output.
///
/// Detector heads export feature-major tensors of either 5 features
/// (cx, cy, w, h, score) or 4 features (no score) per candidate, in
/// model input coordinates. The feature count is read from the tensor
/// shape; a flattened length alone is ambiguous whenever the box count
/// is a multiple of five. Without a score column there is nothing to
/// threshold on: the largest box wins and confidence is reported as
/// 0.0.
fn pick_best_box(
    shape: &[i64],
    output: &[f32],
    config: &DetectorConfig,
    orig_width: u32,
    orig_height: u32,
) -> EngineResult<Option<(BoundingBox, f32)>> {
    // Accept [features, boxes], with or without a leading batch dim.
    let (num_features, num_boxes) = match shape {
        &[1, f, b] | &[f, b] => (f as usize, b as usize),
        _ => {
            return Err(EngineError::inference(format!(
                "Unexpected detector output shape {:?}",
                shape
            )))
        }
    };
    if !(num_features == 4 || num_features == 5) || num_features * num_boxes != output.len() {
        return Err(EngineError::inference(format!(
            "Unexpected detector output shape {:?}",
            shape
        )));
    }
    if num_boxes == 0 {
        return Ok(None);
    }
    let has_score = num_features == 5;

    // Output is [features, boxes]; transpose to iterate candidates.
    let array = Array::from_shape_vec((num_features, num_boxes), output.to_vec())
        .map_err(|e| EngineError::inference(format!("Bad detector output layout: {}", e)))?;
    let candidates = array.t();

    let mut best: Option<(usize, f32)> = None;
    for i in 0..num_boxes {
        let score = if has_score { candidates[[i, 4]] } else { 0.0 };
        if has_score && score < config.score_threshold {
            continue;
        }
        let rank = if has_score {
            score
        } else {
            candidates[[i, 2]] * candidates[[i, 3]]
        };
        if best.map_or(true, |(_, r)| rank > r) {
            best = Some((i, rank));
        }
    }

    let Some((i, _)) = best else {
        return Ok(None);
    };
    let score = if has_score { candidates[[i, 4]] } else { 0.0 };

    let input_size = config.input_size as f32;
    let scale_w = orig_width as f32 / input_size;
    let scale_h = orig_height as f32 / input_size;

    // Center format to corner format, scaled back to source pixels.
    let x = (candidates[[i, 0]] - candidates[[i, 2]] / 2.0) * scale_w;
    let y = (candidates[[i, 1]] - candidates[[i, 3]] / 2.0) * scale_h;
    let w = candidates[[i, 2]] * scale_w;
    let h = candidates[[i, 3]] * scale_h;

    let x = x.max(0.0).min(orig_width as f32 - 1.0);
    let y = y.max(0.0).min(orig_height as f32 - 1.0);
    let w = w.max(1.0).min(orig_width as f32 - x);
    let h = h.max(1.0).min(orig_height as f32 - y);

    Ok(Some((
        BoundingBox::new(
            x.round() as i32,
            y.round() as i32,
            w.round() as i32,
            h.round() as i32,
        ),
        score,
    )))
}

/// Crop the detected face region out of the source image.
fn crop_face(img: &DynamicImage, bbox: &BoundingBox) -> DynamicImage {
    img.crop_imm(
        bbox.x.max(0) as u32,
        bbox.y.max(0) as u32,
        bbox.width.max(1) as u32,
        bbox.height.max(1) as u32,
    )
}

/// Scale a descriptor to unit length so downstream cosine and euclidean
/// comparisons agree.
fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: f32) -> DetectorConfig {
        DetectorConfig::new("tiny_face_416", DetectorFamily::TinyFace, 416, threshold)
    }

    #[test]
    fn test_pick_best_box_prefers_highest_score() {
        // Two candidates in feature-major layout; the second has the
        // better score.
        let output = vec![
            100.0, 200.0, // cx
            100.0, 200.0, // cy
            50.0, 80.0, // w
            50.0, 80.0, // h
            0.4, 0.9, // score
        ];
        let (bbox, score) = pick_best_box(&[1, 5, 2], &output, &config(0.3), 416, 416)
            .unwrap()
            .unwrap();
        assert_eq!(score, 0.9);
        assert_eq!(bbox.x, 160);
        assert_eq!(bbox.width, 80);
    }

    #[test]
    fn test_pick_best_box_applies_threshold() {
        let output = vec![100.0, 100.0, 50.0, 50.0, 0.2];
        assert!(pick_best_box(&[1, 5, 1], &output, &config(0.3), 416, 416)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_scoreless_head_defaults_confidence_to_zero() {
        // 4-feature head: no score to threshold on, largest box wins.
        let output = vec![
            100.0, 200.0, // cx
            100.0, 200.0, // cy
            20.0, 90.0, // w
            20.0, 90.0, // h
        ];
        let (bbox, score) = pick_best_box(&[1, 4, 2], &output, &config(0.3), 416, 416)
            .unwrap()
            .unwrap();
        assert_eq!(score, 0.0);
        assert_eq!(bbox.width, 90);
    }

    #[test]
    fn test_scoreless_head_with_five_boxes_reads_shape() {
        // Five boxes from a 4-feature head flatten to 20 floats, which
        // is also divisible by 5. The shape decides the layout; heights
        // must never be mistaken for scores.
        let output = vec![
            40.0, 80.0, 120.0, 160.0, 200.0, // cx
            40.0, 80.0, 120.0, 160.0, 200.0, // cy
            50.0, 60.0, 70.0, 80.0, 90.0, // w
            50.0, 60.0, 70.0, 80.0, 90.0, // h
        ];
        let (bbox, score) = pick_best_box(&[1, 4, 5], &output, &config(0.3), 416, 416)
            .unwrap()
            .unwrap();
        assert_eq!(score, 0.0);
        assert_eq!(bbox.x, 155);
        assert_eq!(bbox.width, 90);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_unexpected_output_shape_is_inference_error() {
        let output = vec![0.0; 12];
        let err = pick_best_box(&[1, 3, 4], &output, &config(0.3), 416, 416).unwrap_err();
        assert!(matches!(err, EngineError::Inference(_)));
    }

    #[test]
    fn test_box_is_clamped_to_image_bounds() {
        let output = vec![10.0, 10.0, 100.0, 100.0, 0.8];
        let (bbox, _) = pick_best_box(&[1, 5, 1], &output, &config(0.3), 416, 416)
            .unwrap()
            .unwrap();
        assert!(bbox.x >= 0);
        assert!(bbox.y >= 0);
        assert!(bbox.x + bbox.width <= 416);
        assert!(bbox.y + bbox.height <= 416);
    }

    #[test]
    fn test_empty_output_is_no_detection() {
        assert!(pick_best_box(&[1, 5, 0], &[], &config(0.3), 416, 416)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_l2_normalize_unit_length() {
        let v = l2_normalize(vec![3.0, 4.0]);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector_unchanged() {
        let v = l2_normalize(vec![0.0, 0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_model_file_is_reported() {
        let err = load_model(Path::new("/nonexistent/tiny_face_detector.onnx")).unwrap_err();
        assert!(matches!(err, EngineError::ModelNotFound(_)));
    }
}

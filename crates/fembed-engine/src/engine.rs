//! Core inference engine trait.

use async_trait::async_trait;

use fembed_models::{Detection, DetectorConfig};

use crate::error::EngineResult;
use crate::image::FaceImage;

/// Opaque face detection and embedding backend.
///
/// One call runs a single detector configuration against a single
/// image. `Ok(None)` is the legitimate "no face found" outcome; `Err`
/// is a transient engine fault. Callers own the fallback and batch
/// policies; implementations own the numerical work.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Detect the most prominent face and compute its descriptor.
    async fn detect(
        &self,
        image: &FaceImage,
        config: &DetectorConfig,
    ) -> EngineResult<Option<Detection>>;

    /// Descriptor length produced by this engine. Constant across all
    /// detector configurations.
    fn descriptor_len(&self) -> usize;

    /// Human-readable engine name for logging.
    fn name(&self) -> &'static str;
}

//! Sequential batch execution with per-item failure isolation.

use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use tracing::{debug, warn};

use fembed_models::{BatchItemResult, BatchSummary, DetectorConfig};

use crate::engine::InferenceEngine;
use crate::image::FaceImage;

const BATCH_ITEMS_TOTAL: &str = "fembed_batch_items_total";

/// Progress observer, invoked with (items processed so far, total)
/// after each item completes.
pub type ProgressObserver<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Runs one fixed detector configuration across an ordered sequence of
/// base64 image payloads.
///
/// Every input yields exactly one result, in input order; a failing
/// item is recorded and never aborts the rest of the batch. Items run
/// sequentially because the underlying engine is not assumed to be
/// reentrant.
pub struct BatchRunner {
    engine: Arc<dyn InferenceEngine>,
}

impl BatchRunner {
    pub fn new(engine: Arc<dyn InferenceEngine>) -> Self {
        Self { engine }
    }

    /// Process a batch without progress notifications.
    pub async fn run_batch(
        &self,
        images: &[String],
        config: &DetectorConfig,
    ) -> (Vec<BatchItemResult>, BatchSummary) {
        self.run_batch_with_progress(images, config, None).await
    }

    /// Process a batch, optionally reporting progress after each item.
    pub async fn run_batch_with_progress(
        &self,
        images: &[String],
        config: &DetectorConfig,
        observer: Option<ProgressObserver<'_>>,
    ) -> (Vec<BatchItemResult>, BatchSummary) {
        let batch_start = Instant::now();
        let total = images.len();
        let mut results = Vec::with_capacity(total);

        for (index, payload) in images.iter().enumerate() {
            let result = self.process_item(index, payload, config).await;
            counter!(
                BATCH_ITEMS_TOTAL,
                "outcome" => if result.success { "success" } else { "failure" }
            )
            .increment(1);
            results.push(result);

            if let Some(observer) = observer {
                observer(index + 1, total);
            }
        }

        let summary = BatchSummary::from_results(&results, batch_start.elapsed().as_millis() as u64);
        debug!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            total_time_ms = summary.total_time_ms,
            "Batch completed"
        );
        (results, summary)
    }

    /// Process one item inside its own error boundary. Decode failures,
    /// engine faults and no-detection outcomes all become a failure
    /// record; nothing propagates out.
    async fn process_item(
        &self,
        index: usize,
        payload: &str,
        config: &DetectorConfig,
    ) -> BatchItemResult {
        let item_start = Instant::now();

        let image = match FaceImage::from_base64(payload) {
            Ok(image) => image,
            Err(e) => {
                warn!(index, error = %e, "Batch item image decode failed");
                return BatchItemResult::failure(
                    index,
                    format!("Invalid image data: {}", e),
                    item_start.elapsed().as_millis() as u64,
                );
            }
        };

        match self.engine.detect(&image, config).await {
            Ok(Some(detection)) if detection.is_valid() => BatchItemResult::success(
                index,
                detection.descriptor,
                detection.confidence,
                item_start.elapsed().as_millis() as u64,
            ),
            Ok(Some(_)) | Ok(None) => BatchItemResult::failure(
                index,
                "No face detected",
                item_start.elapsed().as_millis() as u64,
            ),
            Err(e) => {
                warn!(index, error = %e, "Batch item inference failed");
                BatchItemResult::failure(
                    index,
                    format!("Inference failed: {}", e),
                    item_start.elapsed().as_millis() as u64,
                )
            }
        }
    }
}

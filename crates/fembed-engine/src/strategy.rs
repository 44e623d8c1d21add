//! Multi-strategy detection fallback controller.

use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use tracing::{debug, info, warn};

use fembed_models::{AttemptOutcome, DetectorConfig, FallbackOutcome, FallbackReport};

use crate::engine::InferenceEngine;
use crate::image::FaceImage;

const STRATEGY_ATTEMPTS_TOTAL: &str = "fembed_strategy_attempts_total";
const STRATEGY_WINS_TOTAL: &str = "fembed_strategy_wins_total";

/// Drives the inference engine through an ordered list of detector
/// configurations until one yields a usable detection.
///
/// Attempts are strictly sequential: first success wins, so racing
/// strategies in parallel would only burn engine capacity and muddy
/// the tie-break. A transient engine failure on one strategy is
/// recorded and the loop moves on; it never aborts the whole request.
pub struct StrategyController {
    engine: Arc<dyn InferenceEngine>,
}

impl StrategyController {
    pub fn new(engine: Arc<dyn InferenceEngine>) -> Self {
        Self { engine }
    }

    /// Try each strategy in order, stopping at the first one that
    /// produces a detection with a descriptor.
    ///
    /// One cumulative timer spans all attempts; no per-attempt timeout
    /// is imposed, so a hung engine call blocks the request.
    pub async fn detect_with_fallback(
        &self,
        image: &FaceImage,
        strategies: &[DetectorConfig],
    ) -> FallbackReport {
        let start = Instant::now();
        let mut attempted: Vec<String> = Vec::with_capacity(strategies.len());

        for config in strategies {
            attempted.push(config.name.clone());
            counter!(STRATEGY_ATTEMPTS_TOTAL, "strategy" => config.name.clone()).increment(1);

            match self.attempt(image, config).await {
                AttemptOutcome::Detected(detection) => {
                    let time_ms = start.elapsed().as_millis() as u64;
                    counter!(STRATEGY_WINS_TOTAL, "strategy" => config.name.clone()).increment(1);
                    info!(
                        strategy = %config.name,
                        confidence = detection.confidence,
                        time_ms,
                        "Face detected"
                    );
                    return FallbackReport {
                        outcome: FallbackOutcome::Detected {
                            detection,
                            strategy: config.name.clone(),
                        },
                        time_ms,
                    };
                }
                AttemptOutcome::Empty => {
                    debug!(strategy = %config.name, "No face found, falling back");
                }
                AttemptOutcome::Failed(message) => {
                    warn!(strategy = %config.name, error = %message, "Detection attempt failed");
                }
            }
        }

        let time_ms = start.elapsed().as_millis() as u64;
        info!(
            strategies = attempted.len(),
            time_ms, "All detection strategies exhausted"
        );
        FallbackReport {
            outcome: FallbackOutcome::Exhausted { attempted },
            time_ms,
        }
    }

    /// Run one attempt, converting every failure mode into a value.
    async fn attempt(&self, image: &FaceImage, config: &DetectorConfig) -> AttemptOutcome {
        match self.engine.detect(image, config).await {
            Ok(Some(detection)) if detection.is_valid() => AttemptOutcome::Detected(detection),
            // A detection without a descriptor is unusable downstream.
            Ok(Some(_)) | Ok(None) => AttemptOutcome::Empty,
            Err(e) => AttemptOutcome::Failed(e.to_string()),
        }
    }
}

//! Batch result and summary types.

use serde::{Deserialize, Serialize};

/// Result for one item of a batch request.
///
/// Exactly one of these is produced per input image, in input order,
/// regardless of individual failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    /// Position of the item in the input sequence.
    pub index: usize,
    pub success: bool,
    /// Face embedding, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Detection confidence, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Human-readable failure reason, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-item wall time in milliseconds.
    pub time_ms: u64,
}

impl BatchItemResult {
    /// Build a success record.
    pub fn success(index: usize, embedding: Vec<f32>, confidence: f32, time_ms: u64) -> Self {
        Self {
            index,
            success: true,
            embedding: Some(embedding),
            confidence: Some(confidence),
            error: None,
            time_ms,
        }
    }

    /// Build a failure record.
    pub fn failure(index: usize, error: impl Into<String>, time_ms: u64) -> Self {
        Self {
            index,
            success: false,
            embedding: None,
            confidence: None,
            error: Some(error.into()),
            time_ms,
        }
    }
}

/// Aggregate metrics for a completed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_time_ms: u64,
    /// Average wall time per item, rounded. Zero for an empty batch.
    pub avg_time_ms: u64,
}

impl BatchSummary {
    /// Compute a summary from per-item results and the batch wall time.
    ///
    /// An empty batch yields the all-zero summary; there is no division
    /// by zero to trip over.
    pub fn from_results(results: &[BatchItemResult], total_time_ms: u64) -> Self {
        let total = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        let avg_time_ms = if total == 0 {
            0
        } else {
            (total_time_ms as f64 / total as f64).round() as u64
        };

        Self {
            total,
            successful,
            failed: total - successful,
            total_time_ms,
            avg_time_ms,
        }
    }
}

//! Shared data models for the face embedding service.
//!
//! This crate provides Serde-serializable types for:
//! - Detector configurations and the default fallback cascade
//! - Detection results and per-attempt outcomes
//! - Batch results and summaries
//! - Model loading progress

pub mod batch;
pub mod detection;
pub mod fallback;
pub mod progress;

// Re-export common types
pub use batch::{BatchItemResult, BatchSummary};
pub use detection::{BoundingBox, Detection, DetectorConfig, DetectorFamily};
pub use fallback::{AttemptOutcome, FallbackOutcome, FallbackReport};
pub use progress::LoadingProgress;

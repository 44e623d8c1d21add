//! Per-attempt outcomes and the fallback report.

use serde::{Deserialize, Serialize};

use crate::detection::Detection;

/// Outcome of a single inference attempt.
///
/// Always a value: a failed engine call is recorded here, never
/// propagated out of the strategy loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// The engine produced a detection with a descriptor.
    Detected(Detection),
    /// The engine ran cleanly but found no face.
    Empty,
    /// The engine call failed transiently.
    Failed(String),
}

impl AttemptOutcome {
    pub fn is_detected(&self) -> bool {
        matches!(self, AttemptOutcome::Detected(_))
    }
}

/// Final outcome of a fallback run across the configured strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FallbackOutcome {
    /// A strategy won; carries the detection and the winning strategy name.
    Detected {
        detection: Detection,
        strategy: String,
    },
    /// Every strategy was exhausted without a usable detection.
    Exhausted {
        /// Names of all attempted strategies, in attempt order.
        attempted: Vec<String>,
    },
}

/// Fallback outcome plus cumulative timing across all attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackReport {
    pub outcome: FallbackOutcome,
    /// Wall time spanning every attempt, in milliseconds.
    pub time_ms: u64,
}

impl FallbackReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FallbackOutcome::Detected { .. })
    }

    /// Winning strategy name, if any.
    pub fn strategy(&self) -> Option<&str> {
        match &self.outcome {
            FallbackOutcome::Detected { strategy, .. } => Some(strategy),
            FallbackOutcome::Exhausted { .. } => None,
        }
    }

    /// Winning detection, if any.
    pub fn detection(&self) -> Option<&Detection> {
        match &self.outcome {
            FallbackOutcome::Detected { detection, .. } => Some(detection),
            FallbackOutcome::Exhausted { .. } => None,
        }
    }
}

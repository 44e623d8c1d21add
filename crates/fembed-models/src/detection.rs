//! Detector configuration and detection result types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorFamily {
    /// Fast tiny-face detector with tunable input resolution.
    TinyFace,
    /// Full SSD MobileNet detector, slower but recall-oriented.
    SsdMobilenet,
}

impl DetectorFamily {
    /// Returns the family name as used in strategy names and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorFamily::TinyFace => "tiny_face",
            DetectorFamily::SsdMobilenet => "ssd_mobilenet",
        }
    }
}

impl fmt::Display for DetectorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named detection strategy: one detector family plus its tuning knobs.
///
/// Configs are built statically and never mutated; the order in which they
/// are handed to the strategy controller is the fallback priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Strategy name reported back to clients (e.g. "tiny_face_416").
    pub name: String,
    /// Detector model family to run.
    pub family: DetectorFamily,
    /// Square input resolution fed to the detector.
    pub input_size: u32,
    /// Minimum detection score for a box to count.
    pub score_threshold: f32,
}

impl DetectorConfig {
    /// Create a new detector config.
    pub fn new(
        name: impl Into<String>,
        family: DetectorFamily,
        input_size: u32,
        score_threshold: f32,
    ) -> Self {
        Self {
            name: name.into(),
            family,
            input_size,
            score_threshold,
        }
    }

    /// The default fallback cascade, in priority order.
    ///
    /// Three tiny-face variants degrade from high-recall/slow to
    /// cheap/strict, then the SSD MobileNet family is tried once with a
    /// loose threshold as a last resort. Larger input and lower threshold
    /// mean higher recall at higher latency, so the most accurate variant
    /// runs first.
    pub fn default_cascade() -> Vec<DetectorConfig> {
        vec![
            DetectorConfig::new("tiny_face_416", DetectorFamily::TinyFace, 416, 0.3),
            DetectorConfig::new("tiny_face_320", DetectorFamily::TinyFace, 320, 0.4),
            DetectorConfig::new("tiny_face_224", DetectorFamily::TinyFace, 224, 0.5),
            DetectorConfig::new("ssd_mobilenet", DetectorFamily::SsdMobilenet, 512, 0.3),
        ]
    }
}

impl fmt::Display for DetectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} @ {}px, threshold {})",
            self.name, self.family, self.input_size, self.score_threshold
        )
    }
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Result of one successful inference attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Face bounding box in source image pixels.
    pub bounding_box: BoundingBox,
    /// Detection confidence in [0, 1]. Defaults to 0.0 when the engine
    /// omits a score; downstream consumers must not read 0.0 as a measured
    /// low confidence.
    pub confidence: f32,
    /// Number of facial landmarks located.
    pub landmarks: u32,
    /// Face descriptor (embedding). Fixed length, model-defined.
    pub descriptor: Vec<f32>,
}

impl Detection {
    /// A detection is only usable when it carries a descriptor.
    pub fn is_valid(&self) -> bool {
        !self.descriptor.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cascade_order() {
        let cascade = DetectorConfig::default_cascade();
        assert_eq!(cascade.len(), 4);

        let names: Vec<&str> = cascade.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["tiny_face_416", "tiny_face_320", "tiny_face_224", "ssd_mobilenet"]
        );

        // Tiny-face variants degrade in resolution while tightening the threshold.
        assert_eq!(cascade[0].input_size, 416);
        assert_eq!(cascade[1].input_size, 320);
        assert_eq!(cascade[2].input_size, 224);
        assert!(cascade[0].score_threshold < cascade[1].score_threshold);
        assert!(cascade[1].score_threshold < cascade[2].score_threshold);

        // Last resort is the full detector family with a loose threshold.
        assert_eq!(cascade[3].family, DetectorFamily::SsdMobilenet);
        assert_eq!(cascade[3].score_threshold, 0.3);
    }

    #[test]
    fn test_detection_validity() {
        let mut detection = Detection {
            bounding_box: BoundingBox::new(10, 20, 100, 120),
            confidence: 0.9,
            landmarks: 68,
            descriptor: vec![0.1; 128],
        };
        assert!(detection.is_valid());

        detection.descriptor.clear();
        assert!(!detection.is_valid());
    }

    #[test]
    fn test_family_serde_names() {
        let json = serde_json::to_string(&DetectorFamily::SsdMobilenet).unwrap();
        assert_eq!(json, "\"ssd_mobilenet\"");
    }
}

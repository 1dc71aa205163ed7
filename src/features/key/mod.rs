//! Key detection modules
//!
//! Detect musical key using:
//! - Krumhansl-Schmuckler templates (24 keys)
//! - Template correlation against a chromagram

pub mod detector;
pub mod templates;

pub use detector::KeyClassifier;
pub use templates::KeyProfiles;

use crate::analysis::result::Key;

/// Key detection result
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDetectionResult {
    /// Detected key (best match)
    pub key: Key,

    /// Correlation score of the detected key
    pub score: f32,

    /// All 24 key scores (ranked, highest first)
    pub all_scores: Vec<(Key, f32)>,
}

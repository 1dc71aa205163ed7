//! Key classification by template correlation
//!
//! Scores the chromagram against the major and minor profiles rotated to
//! every root and keeps the best of the 24 candidates.
//!
//! Candidates are visited root-ascending (C first), major before minor, and a
//! candidate replaces the current best only with a strictly higher score. A
//! tie therefore resolves to the first candidate visited; a silent chromagram
//! scores 0 everywhere and yields C major.
//!
//! # Reference
//!
//! Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in Perceived
//! Tonal Organization in a Spatial Representation of Musical Keys. *Psychological Review*,
//! 89(4), 334-368.
//!
//! # Example
//!
//! ```
//! use tempo_key_dsp::analysis::result::{Key, Mode, PitchClass};
//! use tempo_key_dsp::features::chroma::Chromagram;
//! use tempo_key_dsp::features::key::KeyClassifier;
//!
//! // C major triad
//! let mut bins = [0.0f32; 12];
//! bins[0] = 1.0;
//! bins[4] = 0.8;
//! bins[7] = 0.9;
//! let result = KeyClassifier::new().classify(&Chromagram(bins));
//! assert_eq!(result.key, Key::new(PitchClass::C, Mode::Major));
//! ```

use super::templates::KeyProfiles;
use super::KeyDetectionResult;
use crate::analysis::result::{Key, Mode, PitchClass};
use crate::features::chroma::Chromagram;

/// Picks the best of the 24 major/minor keys for a chromagram
#[derive(Debug, Clone, Copy)]
pub struct KeyClassifier {
    profiles: &'static KeyProfiles,
}

impl Default for KeyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyClassifier {
    /// Classifier using the shared Krumhansl-Schmuckler profiles
    pub fn new() -> Self {
        Self {
            profiles: KeyProfiles::get(),
        }
    }

    /// Score every candidate in visiting order
    pub fn scores(&self, chroma: &Chromagram) -> Vec<(Key, f32)> {
        PitchClass::ALL
            .iter()
            .flat_map(|&root| [Mode::Major, Mode::Minor].map(|mode| Key::new(root, mode)))
            .map(|key| (key, self.profiles.score(chroma, key.root, key.mode)))
            .collect()
    }

    /// Classify `chroma`
    ///
    /// Never fails: every chromagram maps to exactly one of the 24 keys.
    pub fn classify(&self, chroma: &Chromagram) -> KeyDetectionResult {
        let scores = self.scores(chroma);

        let mut best_key = Key::new(PitchClass::C, Mode::Major);
        let mut best_score = f32::NEG_INFINITY;
        for &(key, score) in &scores {
            if score > best_score {
                best_score = score;
                best_key = key;
            }
        }

        // Stable sort keeps visiting order among equal scores
        let mut all_scores = scores;
        all_scores.sort_by(|a, b| b.1.total_cmp(&a.1));

        log::debug!(
            "Key scores: best {} ({:.4}), runner-up {:?}",
            best_key,
            best_score,
            all_scores.get(1)
        );

        KeyDetectionResult {
            key: best_key,
            score: best_score,
            all_scores,
        }
    }
}

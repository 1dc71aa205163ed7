//! Chroma extraction modules
//!
//! Fold spectral energy onto the 12 pitch classes:
//! - Per-pitch bin mapping across octaves
//! - Accumulation across windows
//! - Max normalization

pub mod extractor;
pub mod normalization;

pub use extractor::ChromaExtractor;
pub use normalization::normalize_by_max;

use crate::analysis::result::PitchClass;

/// Number of pitch classes (C through B)
pub const NUM_PITCH_CLASSES: usize = 12;

/// Pitch-class energy profile, index 0 = C through 11 = B
///
/// After extraction the largest bin is 1.0, or every bin is 0.0 for silence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Chromagram(pub [f32; NUM_PITCH_CLASSES]);

impl Chromagram {
    /// Energy per pitch class
    pub fn bins(&self) -> &[f32; NUM_PITCH_CLASSES] {
        &self.0
    }

    /// Energy of one pitch class
    pub fn energy(&self, pitch: PitchClass) -> f32 {
        self.0[pitch.index()]
    }

    /// Largest bin value
    pub fn max(&self) -> f32 {
        self.0.iter().copied().fold(0.0f32, f32::max)
    }

    /// True when every bin is zero
    pub fn is_silent(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }

    /// Pitch class with the most energy (first one on ties)
    pub fn dominant(&self) -> PitchClass {
        let mut best = 0;
        for (i, &v) in self.0.iter().enumerate() {
            if v > self.0[best] {
                best = i;
            }
        }
        PitchClass::from_index(best)
    }

    /// Copy scaled so the largest bin is 1.0
    pub fn normalized(&self) -> Self {
        Self(normalize_by_max(&self.0))
    }
}

//! Krumhansl-Schmuckler key profiles
//!
//! One major and one minor profile, rooted on C and L2-normalized once. A key
//! on another root is scored by rotating the chromagram index instead of
//! storing 24 copies.
//!
//! # Reference
//!
//! Krumhansl, C. L. (1990). *Cognitive Foundations of Musical Pitch*.
//! Oxford University Press.

use std::sync::LazyLock;

use crate::analysis::result::{Mode, PitchClass};
use crate::features::chroma::{Chromagram, NUM_PITCH_CLASSES};

/// Raw major-key probe-tone ratings, C major
const MAJOR_WEIGHTS: [f32; NUM_PITCH_CLASSES] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Raw minor-key probe-tone ratings, C minor
const MINOR_WEIGHTS: [f32; NUM_PITCH_CLASSES] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

static PROFILES: LazyLock<KeyProfiles> = LazyLock::new(KeyProfiles::build);

/// L2-normalized major and minor profiles
#[derive(Debug, Clone, PartialEq)]
pub struct KeyProfiles {
    /// Major profile rooted on C
    pub major: [f32; NUM_PITCH_CLASSES],

    /// Minor profile rooted on C
    pub minor: [f32; NUM_PITCH_CLASSES],
}

impl KeyProfiles {
    /// Shared, normalized profiles (computed on first use)
    pub fn get() -> &'static KeyProfiles {
        &PROFILES
    }

    fn build() -> Self {
        Self {
            major: l2_normalize(&MAJOR_WEIGHTS),
            minor: l2_normalize(&MINOR_WEIGHTS),
        }
    }

    /// Profile for `mode`
    pub fn profile(&self, mode: Mode) -> &[f32; NUM_PITCH_CLASSES] {
        match mode {
            Mode::Major => &self.major,
            Mode::Minor => &self.minor,
        }
    }

    /// Correlation of `chroma` with the `mode` profile rotated to `root`
    ///
    /// `score = Σ_i chroma[(i + root) % 12] · profile[i]`
    pub fn score(&self, chroma: &Chromagram, root: PitchClass, mode: Mode) -> f32 {
        let profile = self.profile(mode);
        let bins = chroma.bins();
        let r = root.index();
        (0..NUM_PITCH_CLASSES)
            .map(|i| bins[(i + r) % NUM_PITCH_CLASSES] * profile[i])
            .sum()
    }
}

fn l2_normalize(weights: &[f32; NUM_PITCH_CLASSES]) -> [f32; NUM_PITCH_CLASSES] {
    let norm = weights.iter().map(|w| w * w).sum::<f32>().sqrt();
    weights.map(|w| w / norm)
}

//! Period estimation modules
//!
//! Convert an onset envelope (or the raw waveform) into a BPM value:
//! - Adaptive peak picking on the onset envelope
//! - Median inter-onset interval with octave correction
//! - Waveform autocorrelation as the terminal fallback

pub mod autocorrelation;
pub mod intervals;
pub mod peak_picking;

pub use autocorrelation::AutocorrelationEstimator;
pub use intervals::{estimate_tempo_from_envelope, IntervalSet};
pub use peak_picking::{Peak, PeakPicker};

use serde::{Deserialize, Serialize};

/// Fewer accepted peaks than this triggers the autocorrelation fallback
pub const MIN_PEAKS: usize = 8;

/// Fewer valid intervals than this triggers the autocorrelation fallback
pub const MIN_INTERVALS: usize = 4;

/// Only the first this-many peaks contribute intervals
pub const MAX_INTERVAL_PEAKS: usize = 50;

/// Peak threshold is `mean + PEAK_THRESHOLD_K * std_dev`
pub const PEAK_THRESHOLD_K: f32 = 1.2;

/// A peak must exceed this many neighbors on each side
pub const PEAK_NEIGHBORHOOD: usize = 3;

/// Minimum spacing between accepted peaks, in seconds
pub const MIN_PEAK_SPACING_SECONDS: f32 = 0.25;

/// Shortest plausible beat period, in seconds
pub const MIN_INTERVAL_SECONDS: f32 = 0.3;

/// Longest plausible beat period, in seconds
pub const MAX_INTERVAL_SECONDS: f32 = 2.5;

/// Lower bound of every reported tempo
pub const MIN_BPM: u32 = 60;

/// Upper bound of every reported tempo
pub const MAX_BPM: u32 = 200;

/// Tempo reported for short or silent input
pub const DEFAULT_BPM: u32 = 120;

/// Signals shorter than this skip tempo analysis entirely
pub const MIN_DURATION_SECONDS: f32 = 5.0;

const FOLD_LOW_BPM: f32 = 70.0;
const FOLD_HIGH_BPM: f32 = 180.0;

/// Which path produced the final tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoSource {
    /// Median inter-onset interval of picked envelope peaks
    OnsetIntervals,
    /// Waveform autocorrelation fallback
    Autocorrelation,
    /// Input too short to analyze; constant default
    ShortInputDefault,
}

impl std::fmt::Display for TempoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TempoSource::OnsetIntervals => write!(f, "onset intervals"),
            TempoSource::Autocorrelation => write!(f, "autocorrelation"),
            TempoSource::ShortInputDefault => write!(f, "short-input default"),
        }
    }
}

/// Final tempo with its provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoEstimate {
    /// Tempo in BPM, always within `[MIN_BPM, MAX_BPM]`
    pub bpm: u32,

    /// Path that produced `bpm`
    pub source: TempoSource,
}

/// Why the onset path gave up; the caller must fall back to autocorrelation
///
/// This is a defined outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Underflow {
    /// Fewer than [`MIN_PEAKS`] peaks survived picking
    TooFewPeaks {
        /// Number of accepted peaks
        found: usize,
    },
    /// Fewer than [`MIN_INTERVALS`] intervals inside the beat-period range
    TooFewIntervals {
        /// Number of valid intervals
        found: usize,
    },
}

impl std::fmt::Display for Underflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Underflow::TooFewPeaks { found } => {
                write!(f, "{} onset peaks (need {})", found, MIN_PEAKS)
            }
            Underflow::TooFewIntervals { found } => {
                write!(f, "{} valid intervals (need {})", found, MIN_INTERVALS)
            }
        }
    }
}

/// Single-pass octave correction used by the onset path
///
/// Applied in order, each check seeing the previous result:
/// `< 70` doubles, `> 180` halves, `< 70` doubles again.
pub fn fold_octaves(bpm: f32) -> f32 {
    let mut bpm = bpm;
    if bpm < FOLD_LOW_BPM {
        bpm *= 2.0;
    }
    if bpm > FOLD_HIGH_BPM {
        bpm /= 2.0;
    }
    if bpm < FOLD_LOW_BPM {
        bpm *= 2.0;
    }
    bpm
}

/// Repeated octave correction used by the autocorrelation path
///
/// Doubles while below 70 and halves while above 180. Non-positive or
/// non-finite input is returned unchanged.
pub fn fold_octaves_repeatedly(bpm: f32) -> f32 {
    if !bpm.is_finite() || bpm <= 0.0 {
        return bpm;
    }
    let mut bpm = bpm;
    while bpm < FOLD_LOW_BPM {
        bpm *= 2.0;
    }
    while bpm > FOLD_HIGH_BPM {
        bpm /= 2.0;
    }
    bpm
}

/// Round to the nearest integer and clamp to `[MIN_BPM, MAX_BPM]`
///
/// Non-finite values map to [`DEFAULT_BPM`].
pub fn clamp_bpm(bpm: f32) -> u32 {
    if !bpm.is_finite() {
        log::warn!("Non-finite tempo {}, using default {} BPM", bpm, DEFAULT_BPM);
        return DEFAULT_BPM;
    }
    bpm.round().clamp(MIN_BPM as f32, MAX_BPM as f32) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_octaves_single_pass() {
        assert_eq!(fold_octaves(120.0), 120.0);
        assert_eq!(fold_octaves(60.0), 120.0);
        assert_eq!(fold_octaves(200.0), 100.0);
        // 30 -> 60 -> (not > 180) -> 120
        assert_eq!(fold_octaves(30.0), 120.0);
        // 24 -> 48 -> 96
        assert_eq!(fold_octaves(24.0), 96.0);
        // Only three steps, so very slow tempos may stay low
        assert_eq!(fold_octaves(10.0), 40.0);
    }

    #[test]
    fn test_fold_octaves_repeatedly() {
        assert_eq!(fold_octaves_repeatedly(10.0), 80.0);
        assert_eq!(fold_octaves_repeatedly(400.0), 100.0);
        assert_eq!(fold_octaves_repeatedly(147.0), 147.0);
        assert_eq!(fold_octaves_repeatedly(0.0), 0.0);
    }

    #[test]
    fn test_clamp_bpm() {
        assert_eq!(clamp_bpm(119.6), 120);
        assert_eq!(clamp_bpm(20.0), MIN_BPM);
        assert_eq!(clamp_bpm(500.0), MAX_BPM);
        assert_eq!(clamp_bpm(f32::NAN), DEFAULT_BPM);
        assert_eq!(clamp_bpm(f32::INFINITY), DEFAULT_BPM);
    }

    #[test]
    fn test_underflow_display() {
        assert_eq!(
            Underflow::TooFewPeaks { found: 3 }.to_string(),
            "3 onset peaks (need 8)"
        );
    }
}

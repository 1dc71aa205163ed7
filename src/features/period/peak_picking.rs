//! Adaptive peak picking on the onset envelope
//!
//! # Algorithm
//!
//! 1. Threshold `T = mean + 1.2 * std_dev` over the whole envelope
//! 2. Frame `i` (with 3 neighbors available on each side) is a candidate when
//!    `envelope[i] > T` and it is strictly greater than `envelope[i±1..=i±3]`
//! 3. Candidates closer than 0.25 s to the previously accepted peak are dropped
//!
//! Peaks are returned in frame order.
//!
//! # Example
//!
//! ```
//! use tempo_key_dsp::features::onset::OnsetEnvelope;
//! use tempo_key_dsp::features::period::PeakPicker;
//!
//! let mut values = vec![0.0f32; 200];
//! for i in (10..190).step_by(40) {
//!     values[i] = 1.0;
//! }
//! let envelope = OnsetEnvelope { values, hop_size: 512, sample_rate: 44100 };
//! let peaks = PeakPicker::new().pick(&envelope);
//! assert_eq!(peaks.len(), 5);
//! ```

use super::{MIN_PEAK_SPACING_SECONDS, PEAK_NEIGHBORHOOD, PEAK_THRESHOLD_K};
use crate::features::onset::threshold::envelope_stats;
use crate::features::onset::OnsetEnvelope;

/// Local maximum of the onset envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Envelope frame index
    pub frame_index: usize,

    /// Envelope value at the peak
    pub value: f32,
}

/// Picks beat candidates from an onset envelope
///
/// Threshold factor, neighborhood and spacing are fixed so that the fallback
/// decision downstream is deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeakPicker;

impl PeakPicker {
    /// Create a peak picker
    pub fn new() -> Self {
        Self
    }

    /// Minimum number of frames between accepted peaks
    pub fn min_spacing_frames(hop_size: usize, sample_rate: u32) -> usize {
        if hop_size == 0 {
            return 0;
        }
        (MIN_PEAK_SPACING_SECONDS * sample_rate as f32 / hop_size as f32).round() as usize
    }

    /// Pick peaks from `envelope`
    ///
    /// # Returns
    ///
    /// Accepted peaks in ascending frame order. Empty when the envelope is too
    /// short to have any frame with a full neighborhood.
    pub fn pick(&self, envelope: &OnsetEnvelope) -> Vec<Peak> {
        let values = &envelope.values;
        let n = values.len();

        if n < 2 * PEAK_NEIGHBORHOOD + 1 {
            log::debug!("Onset envelope too short for peak picking: {} frames", n);
            return Vec::new();
        }

        let Some(stats) = envelope_stats(values) else {
            return Vec::new();
        };
        let threshold = stats.mean + PEAK_THRESHOLD_K * stats.std_dev;
        let min_spacing = Self::min_spacing_frames(envelope.hop_size, envelope.sample_rate);

        log::debug!(
            "Onset envelope stats: mean={:.6}, std={:.6}, max={:.6}; threshold={:.6}, min spacing={} frames",
            stats.mean,
            stats.std_dev,
            stats.max,
            threshold,
            min_spacing
        );

        let mut peaks: Vec<Peak> = Vec::new();
        for i in PEAK_NEIGHBORHOOD..n - PEAK_NEIGHBORHOOD {
            let value = values[i];
            if value <= threshold {
                continue;
            }

            let is_local_max = (1..=PEAK_NEIGHBORHOOD)
                .all(|d| value > values[i - d] && value > values[i + d]);
            if !is_local_max {
                continue;
            }

            let spaced = peaks
                .last()
                .is_none_or(|last| i - last.frame_index >= min_spacing);
            if spaced {
                peaks.push(Peak {
                    frame_index: i,
                    value,
                });
            }
        }

        log::debug!("Found {} onset peaks", peaks.len());

        peaks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(values: Vec<f32>) -> OnsetEnvelope {
        OnsetEnvelope {
            values,
            hop_size: 512,
            sample_rate: 44100,
        }
    }

    #[test]
    fn test_min_spacing_frames() {
        // 0.25 * 44100 / 512 = 21.53
        assert_eq!(PeakPicker::min_spacing_frames(512, 44100), 22);
        assert_eq!(PeakPicker::min_spacing_frames(0, 44100), 0);
    }

    #[test]
    fn test_regular_spikes() {
        let mut values = vec![0.0f32; 400];
        for i in (20..380).step_by(43) {
            values[i] = 1.0;
        }
        let peaks = PeakPicker::new().pick(&envelope(values));
        let indices: Vec<usize> = peaks.iter().map(|p| p.frame_index).collect();
        assert_eq!(indices, (20..380).step_by(43).collect::<Vec<_>>());
    }

    #[test]
    fn test_requires_strict_maximum() {
        let mut values = vec![0.0f32; 100];
        // Plateau: neither sample is strictly greater than its neighbor
        values[50] = 1.0;
        values[51] = 1.0;
        assert!(PeakPicker::new().pick(&envelope(values)).is_empty());
    }

    #[test]
    fn test_edges_excluded() {
        let mut values = vec![0.0f32; 50];
        values[2] = 5.0;
        values[47] = 5.0;
        assert!(PeakPicker::new().pick(&envelope(values)).is_empty());

        let mut values = vec![0.0f32; 50];
        values[3] = 5.0;
        values[46] = 5.0;
        let peaks = PeakPicker::new().pick(&envelope(values));
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].frame_index, 3);
        assert_eq!(peaks[1].frame_index, 46);
    }

    #[test]
    fn test_spacing_keeps_earlier_peak() {
        let mut values = vec![0.0f32; 200];
        values[50] = 1.0;
        // 10 frames later, well under 22 frames: dropped even though larger
        values[60] = 2.0;
        values[100] = 1.0;
        let peaks = PeakPicker::new().pick(&envelope(values));
        let indices: Vec<usize> = peaks.iter().map(|p| p.frame_index).collect();
        assert_eq!(indices, vec![50, 100]);
    }

    #[test]
    fn test_below_threshold_ignored() {
        // Constant envelope: std = 0, threshold = mean, nothing strictly above
        let values = vec![0.5f32; 100];
        assert!(PeakPicker::new().pick(&envelope(values)).is_empty());
    }

    #[test]
    fn test_short_envelope() {
        assert!(PeakPicker::new().pick(&envelope(vec![0.0, 1.0, 0.0])).is_empty());
        assert!(PeakPicker::new().pick(&envelope(Vec::new())).is_empty());
    }
}

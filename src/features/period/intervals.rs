//! Inter-onset intervals and median-period tempo
//!
//! Gaps between consecutive peaks are converted to seconds, filtered to the
//! plausible beat-period range `[0.3, 2.5]` s, and reduced to one period by
//! taking the median. The period becomes `60 / median` BPM, octave-corrected
//! and clamped to `[60, 200]`.

use super::peak_picking::{Peak, PeakPicker};
use super::{
    clamp_bpm, fold_octaves, Underflow, MAX_INTERVAL_PEAKS, MAX_INTERVAL_SECONDS, MIN_INTERVALS,
    MIN_INTERVAL_SECONDS, MIN_PEAKS,
};
use crate::features::onset::OnsetEnvelope;

/// Beat-period candidates in seconds, in peak order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntervalSet {
    /// Intervals inside `[MIN_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS]`
    pub seconds: Vec<f32>,
}

impl IntervalSet {
    /// Build the set from peaks in ascending frame order
    ///
    /// Only the first [`MAX_INTERVAL_PEAKS`] peaks contribute.
    pub fn from_peaks(peaks: &[Peak], hop_size: usize, sample_rate: u32) -> Self {
        if sample_rate == 0 {
            return Self::default();
        }
        let frame_seconds = hop_size as f32 / sample_rate as f32;
        let considered = &peaks[..peaks.len().min(MAX_INTERVAL_PEAKS)];

        let seconds = considered
            .windows(2)
            .map(|w| (w[1].frame_index - w[0].frame_index) as f32 * frame_seconds)
            .filter(|&s| (MIN_INTERVAL_SECONDS..=MAX_INTERVAL_SECONDS).contains(&s))
            .collect();

        Self { seconds }
    }

    /// Number of valid intervals
    pub fn len(&self) -> usize {
        self.seconds.len()
    }

    /// True when no interval survived filtering
    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }

    /// Median interval: element `len / 2` of the sorted set (upper median)
    pub fn median(&self) -> Option<f32> {
        if self.seconds.is_empty() {
            return None;
        }
        let mut sorted = self.seconds.clone();
        sorted.sort_by(f32::total_cmp);
        Some(sorted[sorted.len() / 2])
    }
}

/// Tempo from the onset path plus the counts that led to it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTempo {
    /// Tempo in BPM within `[60, 200]`
    pub bpm: u32,
    /// Median beat period in seconds
    pub median_interval: f32,
    /// Peaks accepted by the picker
    pub peak_count: usize,
    /// Intervals inside the beat-period range
    pub interval_count: usize,
}

/// Estimate tempo from an onset envelope
///
/// # Errors
///
/// Returns [`Underflow`] (not an error in the analysis sense) when too few
/// peaks or intervals survive; the caller then runs the autocorrelation
/// fallback.
pub fn estimate_tempo_from_envelope(envelope: &OnsetEnvelope) -> Result<IntervalTempo, Underflow> {
    let peaks = PeakPicker::new().pick(envelope);
    if peaks.len() < MIN_PEAKS {
        return Err(Underflow::TooFewPeaks { found: peaks.len() });
    }

    let intervals = IntervalSet::from_peaks(&peaks, envelope.hop_size, envelope.sample_rate);
    if intervals.len() < MIN_INTERVALS {
        return Err(Underflow::TooFewIntervals {
            found: intervals.len(),
        });
    }

    // At least MIN_INTERVALS entries, so the median exists
    let median_interval = intervals
        .median()
        .ok_or(Underflow::TooFewIntervals { found: 0 })?;

    let raw_bpm = 60.0 / median_interval;
    let folded = fold_octaves(raw_bpm);
    let bpm = clamp_bpm(folded);

    log::debug!(
        "Interval tempo: {} peaks, {} intervals, median {:.4}s, raw {:.2} BPM, folded {:.2} -> {} BPM",
        peaks.len(),
        intervals.len(),
        median_interval,
        raw_bpm,
        folded,
        bpm
    );

    Ok(IntervalTempo {
        bpm,
        median_interval,
        peak_count: peaks.len(),
        interval_count: intervals.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks_at(frames: &[usize]) -> Vec<Peak> {
        frames
            .iter()
            .map(|&frame_index| Peak {
                frame_index,
                value: 1.0,
            })
            .collect()
    }

    fn spike_envelope(period_frames: usize, count: usize, hop_size: usize, sample_rate: u32) -> OnsetEnvelope {
        let len = period_frames * (count + 1) + 10;
        let mut values = vec![0.0f32; len];
        for k in 0..count {
            values[5 + k * period_frames] = 1.0;
        }
        OnsetEnvelope {
            values,
            hop_size,
            sample_rate,
        }
    }

    #[test]
    fn test_intervals_filtered_to_beat_range() {
        // hop 1000 at 10 kHz: one frame = 0.1 s
        let peaks = peaks_at(&[0, 5, 7, 30, 60]);
        let set = IntervalSet::from_peaks(&peaks, 1000, 10_000);
        // gaps: 0.5 (keep), 0.2 (drop), 2.3 (keep), 3.0 (drop)
        assert_eq!(set.len(), 2);
        assert!((set.seconds[0] - 0.5).abs() < 1e-6);
        assert!((set.seconds[1] - 2.3).abs() < 1e-5);
    }

    #[test]
    fn test_interval_bounds_inclusive() {
        let peaks = peaks_at(&[0, 3, 28]);
        let set = IntervalSet::from_peaks(&peaks, 1000, 10_000);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_only_first_fifty_peaks_used() {
        let frames: Vec<usize> = (0..80).map(|k| k * 5).collect();
        let set = IntervalSet::from_peaks(&peaks_at(&frames), 1000, 10_000);
        assert_eq!(set.len(), MAX_INTERVAL_PEAKS - 1);
    }

    #[test]
    fn test_median_upper() {
        let set = IntervalSet {
            seconds: vec![0.6, 0.4, 0.5, 0.7],
        };
        // sorted [0.4, 0.5, 0.6, 0.7], index 2
        assert_eq!(set.median(), Some(0.6));
        assert_eq!(IntervalSet::default().median(), None);
    }

    #[test]
    fn test_tempo_from_regular_spikes() {
        // 0.5 s period at hop 441 / 44.1 kHz = 50 frames
        let env = spike_envelope(50, 16, 441, 44100);
        let tempo = estimate_tempo_from_envelope(&env).unwrap();
        assert_eq!(tempo.bpm, 120);
        assert_eq!(tempo.peak_count, 16);
        assert_eq!(tempo.interval_count, 15);
    }

    #[test]
    fn test_slow_spikes_are_doubled() {
        // 1.2 s period: 50 BPM -> 100 BPM
        let env = spike_envelope(120, 10, 441, 44100);
        assert_eq!(estimate_tempo_from_envelope(&env).unwrap().bpm, 100);
    }

    #[test]
    fn test_too_few_peaks() {
        let env = spike_envelope(50, 5, 441, 44100);
        assert_eq!(
            estimate_tempo_from_envelope(&env),
            Err(Underflow::TooFewPeaks { found: 5 })
        );
    }

    #[test]
    fn test_too_few_intervals() {
        // 3.0 s period: every interval is out of range
        let env = spike_envelope(300, 9, 441, 44100);
        assert_eq!(
            estimate_tempo_from_envelope(&env),
            Err(Underflow::TooFewIntervals { found: 0 })
        );
    }
}

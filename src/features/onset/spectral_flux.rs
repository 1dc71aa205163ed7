//! Spectral flux onset detection
//!
//! Onset strength is the half-wave rectified change of the magnitude spectrum
//! between consecutive frames:
//!
//! `flux[i] = sqrt(Σ_k max(0, |X_i[k]| - |X_{i-1}[k]|)²)` for `k >= low_bin_cutoff`
//!
//! Only energy increases count, so decaying notes do not register as onsets.
//!
//! # Reference
//!
//! Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
//! A Tutorial on Onset Detection in Music Signals.
//! *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.

use super::{OnsetEnvelope, OnsetStrategy};
use crate::error::AnalysisError;
use crate::features::spectral::{SpectralFrame, SpectralFramer};

/// Computes a spectral flux envelope from tempo-band frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnsetDetector {
    /// Bins with a lower index are ignored (DC and rumble)
    pub low_bin_cutoff: usize,
}

impl OnsetDetector {
    /// Create a detector ignoring bins below `low_bin_cutoff`
    pub fn new(low_bin_cutoff: usize) -> Self {
        Self { low_bin_cutoff }
    }

    /// Compute the envelope, one value per frame
    ///
    /// # Arguments
    ///
    /// * `frames` - Tempo-band spectral frames in time order
    /// * `hop_size` - Hop used to produce the frames
    /// * `sample_rate` - Sample rate in Hz
    pub fn envelope(&self, frames: &[SpectralFrame], hop_size: usize, sample_rate: u32) -> OnsetEnvelope {
        let mut values = Vec::with_capacity(frames.len());

        if !frames.is_empty() {
            values.push(0.0);
        }

        for pair in frames.windows(2) {
            let (prev, cur) = (&pair[0].bin_magnitudes, &pair[1].bin_magnitudes);
            let upper = cur.len().min(prev.len());
            let lower = self.low_bin_cutoff.min(upper);

            let sum_sq: f32 = cur[lower..upper]
                .iter()
                .zip(&prev[lower..upper])
                .map(|(c, p)| {
                    let rise = (c - p).max(0.0);
                    rise * rise
                })
                .sum();
            values.push(sum_sq.sqrt());
        }

        log::debug!(
            "Spectral flux envelope: {} frames, low bin cutoff {}",
            values.len(),
            self.low_bin_cutoff
        );

        OnsetEnvelope {
            values,
            hop_size,
            sample_rate,
        }
    }
}

/// Spectral framing followed by spectral flux
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFluxOnsets {
    /// Tempo-band framer
    pub framer: SpectralFramer,
    /// Flux detector
    pub detector: OnsetDetector,
}

impl OnsetStrategy for SpectralFluxOnsets {
    type Frames = Vec<SpectralFrame>;

    fn frame(&self, samples: &[f32], sample_rate: u32) -> Result<Self::Frames, AnalysisError> {
        self.framer.frames(samples, sample_rate)
    }

    fn detect(&self, frames: &Self::Frames, sample_rate: u32) -> OnsetEnvelope {
        self.detector.envelope(frames, self.framer.hop_size, sample_rate)
    }

    fn name(&self) -> &'static str {
        "spectral-flux"
    }
}

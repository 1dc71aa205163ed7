//! Energy flux onset detection
//!
//! Time-domain alternative to spectral flux. Cheaper, and effective for
//! percussive material.
//!
//! Algorithm:
//! 1. Divide audio into overlapping frames (frame_size, hop_size), using the
//!    same frame count as the spectral framer
//! 2. Compute RMS energy per frame
//! 3. Compute energy derivative (flux): `E_flux[n] = max(0, E[n] - E[n-1])`
//!
//! # Example
//!
//! ```
//! use tempo_key_dsp::features::onset::energy_flux::EnergyFluxOnsets;
//! use tempo_key_dsp::features::onset::OnsetStrategy;
//!
//! let samples = vec![0.0f32; 44100 * 2];
//! let strategy = EnergyFluxOnsets::new(2048, 512);
//! let energies = strategy.frame(&samples, 44100)?;
//! let envelope = strategy.detect(&energies, 44100);
//! assert_eq!(envelope.len(), energies.len());
//! # Ok::<(), tempo_key_dsp::AnalysisError>(())
//! ```

use super::{OnsetEnvelope, OnsetStrategy};
use crate::error::AnalysisError;

/// RMS energy flux onset strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyFluxOnsets {
    /// Frame size for RMS analysis (typically 2048)
    pub frame_size: usize,
    /// Hop size between frames (typically 512)
    pub hop_size: usize,
}

impl EnergyFluxOnsets {
    /// Create the strategy
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        Self {
            frame_size,
            hop_size,
        }
    }
}

/// Compute RMS energy per frame
///
/// # Reference
///
/// Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
/// A Tutorial on Onset Detection in Music Signals.
/// *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.
///
/// # Errors
///
/// Returns `AnalysisError` if frame or hop size is zero
pub fn frame_energies(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> Result<Vec<f32>, AnalysisError> {
    if frame_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Frame size must be > 0".to_string(),
        ));
    }

    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Hop size must be > 0".to_string(),
        ));
    }

    if frame_size > samples.len() {
        log::warn!(
            "Frame size ({}) larger than audio length ({}), returning no frames",
            frame_size,
            samples.len()
        );
        return Ok(Vec::new());
    }

    let num_frames = (samples.len() - frame_size) / hop_size;

    log::debug!(
        "Computing frame energies: {} samples, frame={}, hop={}, {} frames",
        samples.len(),
        frame_size,
        hop_size,
        num_frames
    );

    Ok((0..num_frames)
        .map(|i| {
            let start = i * hop_size;
            let frame = &samples[start..start + frame_size];
            let sum_sq: f32 = frame.iter().map(|&x| x * x).sum();
            (sum_sq / frame_size as f32).sqrt()
        })
        .collect())
}

impl OnsetStrategy for EnergyFluxOnsets {
    type Frames = Vec<f32>;

    fn frame(&self, samples: &[f32], _sample_rate: u32) -> Result<Self::Frames, AnalysisError> {
        frame_energies(samples, self.frame_size, self.hop_size)
    }

    fn detect(&self, frames: &Self::Frames, sample_rate: u32) -> OnsetEnvelope {
        let mut values = Vec::with_capacity(frames.len());
        if !frames.is_empty() {
            values.push(0.0);
        }
        values.extend(frames.windows(2).map(|w| (w[1] - w[0]).max(0.0)));

        OnsetEnvelope {
            values,
            hop_size: self.hop_size,
            sample_rate,
        }
    }

    fn name(&self) -> &'static str {
        "energy-flux"
    }
}

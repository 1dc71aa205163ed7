//! Onset detection modules
//!
//! Turn a signal into a 1-D onset-strength envelope, one value per frame:
//! - Spectral flux over the tempo sub-band (default)
//! - RMS energy flux (alternative strategy)
//! - Envelope statistics and adaptive thresholding

pub mod energy_flux;
pub mod spectral_flux;
pub mod threshold;

pub use energy_flux::EnergyFluxOnsets;
pub use spectral_flux::{OnsetDetector, SpectralFluxOnsets};

use crate::error::AnalysisError;

/// Onset envelope method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnsetMethod {
    /// Half-wave rectified spectral flux over the tempo band
    #[default]
    SpectralFlux,
    /// Half-wave rectified frame RMS difference
    EnergyFlux,
}

/// Onset strength per frame
///
/// Values are non-negative and `values[0]` is always 0 (no predecessor).
#[derive(Debug, Clone, PartialEq)]
pub struct OnsetEnvelope {
    /// Onset strength per frame
    pub values: Vec<f32>,

    /// Samples between consecutive frames
    pub hop_size: usize,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl OnsetEnvelope {
    /// Seconds between consecutive envelope values
    pub fn frame_seconds(&self) -> f32 {
        self.hop_size as f32 / self.sample_rate as f32
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no frames were produced
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A two-step onset pipeline: framing, then envelope detection
///
/// Split in two so the orchestrator can report each stage separately.
pub trait OnsetStrategy {
    /// Per-frame intermediate representation
    type Frames;

    /// Slice `samples` into frames
    fn frame(&self, samples: &[f32], sample_rate: u32) -> Result<Self::Frames, AnalysisError>;

    /// Reduce frames to an onset envelope
    fn detect(&self, frames: &Self::Frames, sample_rate: u32) -> OnsetEnvelope;

    /// Get the name of this strategy (for logging)
    fn name(&self) -> &'static str;
}

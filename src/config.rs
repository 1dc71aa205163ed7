//! Configuration parameters for audio analysis
//!
//! Only the framing/resolution parameters live here. The decision thresholds
//! (minimum peaks, minimum intervals, minimum duration, default tempo) are
//! constants so results stay reproducible across callers.

use crate::error::AnalysisError;
use crate::features::onset::OnsetMethod;
use crate::features::spectral::SpectrumBackendKind;

/// Analysis configuration parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    // Tempo path
    /// Frame size for the tempo spectrum (default: 2048)
    pub frame_size: usize,

    /// Hop size for the tempo spectrum (default: 512)
    pub hop_size: usize,

    /// Lower edge of the tempo sub-band in Hz (default: 20.0)
    pub tempo_band_low_hz: f32,

    /// Upper edge of the tempo sub-band in Hz (default: 400.0)
    pub tempo_band_high_hz: f32,

    /// Bins below this index are ignored by spectral flux (default: 10)
    /// Keeps DC and rumble out of the onset envelope
    pub onset_low_bin_cutoff: usize,

    /// Only the first N seconds are framed for onset detection (default: 60.0)
    pub tempo_analysis_seconds: f32,

    /// Onset envelope method (default: spectral flux)
    pub onset_method: OnsetMethod,

    // Autocorrelation fallback
    /// Only the first N seconds are correlated (default: 20.0)
    pub autocorrelation_seconds: f32,

    /// Lag search stride in samples (default: 8)
    pub autocorrelation_lag_step: usize,

    /// Sample stride inside each dot product (default: 16)
    pub autocorrelation_sample_step: usize,

    /// Optional high-pass cutoff in Hz applied before correlating (default: None)
    pub autocorrelation_highpass_hz: Option<f32>,

    // Key path
    /// FFT size for chroma extraction (default: 4096)
    pub chroma_frame_size: usize,

    /// Hop size for chroma extraction (default: 2048)
    pub chroma_hop_size: usize,

    /// Lower edge of the chroma sub-band in Hz (default: 80.0)
    pub chroma_band_low_hz: f32,

    /// Upper edge of the chroma sub-band in Hz (default: 2000.0)
    pub chroma_band_high_hz: f32,

    /// Only the first N seconds feed the chromagram (default: 45.0)
    pub chroma_analysis_seconds: f32,

    /// Maximum number of chroma windows (default: 30)
    pub chroma_max_windows: usize,

    /// Lowest octave probed per pitch class (default: 2)
    pub chroma_min_octave: i32,

    /// Highest octave probed per pitch class (default: 6)
    pub chroma_max_octave: i32,

    /// Neighbor bins on each side of a pitch bin, with linear fall-off (default: 1)
    pub chroma_neighbor_bins: usize,

    /// Extra weight for lower octaves; 0.0 weights all octaves equally (default: 0.0)
    /// Octave `o` is weighted `1 + bass_emphasis * (max_octave - o) / (max_octave - min_octave)`
    pub chroma_bass_emphasis: f32,

    /// Magnitude spectrum implementation (default: direct DFT)
    pub spectrum_backend: SpectrumBackendKind,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            tempo_band_low_hz: 20.0,
            tempo_band_high_hz: 400.0,
            onset_low_bin_cutoff: 10,
            tempo_analysis_seconds: 60.0,
            onset_method: OnsetMethod::SpectralFlux,
            autocorrelation_seconds: 20.0,
            autocorrelation_lag_step: 8,
            autocorrelation_sample_step: 16,
            autocorrelation_highpass_hz: None,
            chroma_frame_size: 4096,
            chroma_hop_size: 2048,
            chroma_band_low_hz: 80.0,
            chroma_band_high_hz: 2000.0,
            chroma_analysis_seconds: 45.0,
            chroma_max_windows: 30,
            chroma_min_octave: 2,
            chroma_max_octave: 6,
            chroma_neighbor_bins: 1,
            chroma_bass_emphasis: 0.0,
            spectrum_backend: SpectrumBackendKind::DirectDft,
        }
    }
}

impl AnalysisConfig {
    /// Check that every parameter is usable
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` naming the first offending field
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let sizes = [
            ("frame_size", self.frame_size),
            ("hop_size", self.hop_size),
            ("autocorrelation_lag_step", self.autocorrelation_lag_step),
            ("autocorrelation_sample_step", self.autocorrelation_sample_step),
            ("chroma_frame_size", self.chroma_frame_size),
            ("chroma_hop_size", self.chroma_hop_size),
            ("chroma_max_windows", self.chroma_max_windows),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(AnalysisError::InvalidInput(format!("{} must be > 0", name)));
            }
        }

        if self.frame_size < 2 || self.chroma_frame_size < 2 {
            return Err(AnalysisError::InvalidInput(
                "Frame sizes must be at least 2 samples".to_string(),
            ));
        }

        let bands = [
            ("tempo", self.tempo_band_low_hz, self.tempo_band_high_hz),
            ("chroma", self.chroma_band_low_hz, self.chroma_band_high_hz),
        ];
        for (name, lo, hi) in bands {
            if !(lo.is_finite() && hi.is_finite()) || lo < 0.0 || lo >= hi {
                return Err(AnalysisError::InvalidInput(format!(
                    "Invalid {} band: [{:.1}, {:.1}] Hz",
                    name, lo, hi
                )));
            }
        }

        let durations = [
            ("tempo_analysis_seconds", self.tempo_analysis_seconds),
            ("autocorrelation_seconds", self.autocorrelation_seconds),
            ("chroma_analysis_seconds", self.chroma_analysis_seconds),
        ];
        for (name, seconds) in durations {
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "{} must be positive, got {}",
                    name, seconds
                )));
            }
        }

        if self.chroma_min_octave > self.chroma_max_octave {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid octave range: [{}, {}]",
                self.chroma_min_octave, self.chroma_max_octave
            )));
        }

        if !self.chroma_bass_emphasis.is_finite() || self.chroma_bass_emphasis < 0.0 {
            return Err(AnalysisError::InvalidInput(
                "chroma_bass_emphasis must be non-negative".to_string(),
            ));
        }

        if let Some(cutoff) = self.autocorrelation_highpass_hz {
            if !cutoff.is_finite() || cutoff <= 0.0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "High-pass cutoff must be positive, got {}",
                    cutoff
                )));
            }
        }

        Ok(())
    }
}

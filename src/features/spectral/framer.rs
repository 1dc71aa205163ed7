//! Overlapping Hann-tapered framing with band-limited magnitude spectra
//!
//! # Algorithm
//!
//! 1. Frame count is `floor((usable_length - frame_size) / hop_size)`; zero
//!    frames when the signal is shorter than one window
//! 2. Each window is tapered with a symmetric Hann window
//! 3. Magnitudes are computed only for bins whose center frequency
//!    `k * sample_rate / frame_size` lies inside the band
//!
//! Bins below the band are stored as zeros; bins above it are not stored.

use super::backend::SpectrumBackendKind;
use super::window::{hann_window, AnalysisWindow};
use crate::cancel::{self, CancelToken};
use crate::error::AnalysisError;

/// Frequency sub-band in Hz (inclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    /// Lower edge in Hz
    pub low_hz: f32,
    /// Upper edge in Hz
    pub high_hz: f32,
}

impl FrequencyBand {
    /// Band used by the tempo path
    pub const TEMPO: FrequencyBand = FrequencyBand {
        low_hz: 20.0,
        high_hz: 400.0,
    };

    /// Band used by the key path
    pub const KEY: FrequencyBand = FrequencyBand {
        low_hz: 80.0,
        high_hz: 2000.0,
    };

    /// Create a band
    pub fn new(low_hz: f32, high_hz: f32) -> Self {
        Self { low_hz, high_hz }
    }

    /// Bins (excluding DC and Nyquist) whose center frequency falls in the band
    ///
    /// Returns `None` when no bin does, e.g. a very low sample rate.
    pub fn bins(&self, frame_size: usize, sample_rate: u32) -> Option<BinRange> {
        let resolution = sample_rate as f64 / frame_size as f64;
        let lo = self.low_hz as f64;
        let hi = self.high_hz as f64;

        let mut inside = (1..frame_size / 2).filter(|&k| {
            let freq = k as f64 * resolution;
            freq >= lo && freq <= hi
        });
        let first = inside.next()?;
        let last = inside.last().unwrap_or(first);
        Some(BinRange { first, last })
    }
}

/// Inclusive range of frequency bins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinRange {
    /// First bin inside the band
    pub first: usize,
    /// Last bin inside the band
    pub last: usize,
}

impl BinRange {
    /// Number of bins in the range
    pub fn count(&self) -> usize {
        self.last + 1 - self.first
    }

    /// Whether `bin` lies in the range
    pub fn contains(&self, bin: usize) -> bool {
        (self.first..=self.last).contains(&bin)
    }
}

/// Magnitude spectrum of one window
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    /// Magnitudes indexed by bin; zero outside the band
    pub bin_magnitudes: Vec<f32>,

    /// Time of the window center in seconds
    pub center_time: f32,
}

/// Slices a signal into overlapping windows and computes their spectra
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFramer {
    /// Window length in samples
    pub frame_size: usize,

    /// Distance between window starts in samples
    pub hop_size: usize,

    /// Frequency band to evaluate
    pub band: FrequencyBand,

    /// Magnitude spectrum implementation
    pub backend: SpectrumBackendKind,

    /// Optional cap on the number of frames
    pub max_frames: Option<usize>,

    /// Checked before each frame; framing stops once cancelled
    pub cancel: Option<CancelToken>,
}

impl SpectralFramer {
    /// Create a framer with the default direct DFT backend
    pub fn new(frame_size: usize, hop_size: usize, band: FrequencyBand) -> Self {
        Self {
            frame_size,
            hop_size,
            band,
            backend: SpectrumBackendKind::DirectDft,
            max_frames: None,
            cancel: None,
        }
    }

    /// Use a different spectrum backend
    pub fn with_backend(mut self, backend: SpectrumBackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Stop after `max_frames` windows
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Poll `cancel` while framing
    pub fn with_cancel(mut self, cancel: Option<CancelToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Number of frames produced for `usable_length` samples
    pub fn frame_count(&self, usable_length: usize) -> usize {
        if self.hop_size == 0 || usable_length < self.frame_size {
            return 0;
        }
        let count = (usable_length - self.frame_size) / self.hop_size;
        match self.max_frames {
            Some(cap) => count.min(cap),
            None => count,
        }
    }

    /// Compute the spectral frames of `samples`
    ///
    /// # Arguments
    ///
    /// * `samples` - Usable portion of the signal (already truncated by the caller)
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    ///
    /// One [`SpectralFrame`] per window, in time order. Empty when the signal is
    /// shorter than one window or no bin falls inside the band.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for zero frame/hop sizes or sample
    /// rate, and `AnalysisError::Cancelled` if the cancel token fires
    pub fn frames(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<SpectralFrame>, AnalysisError> {
        if self.frame_size < 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "Frame size must be >= 2, got {}",
                self.frame_size
            )));
        }
        if self.hop_size == 0 {
            return Err(AnalysisError::InvalidInput(
                "Hop size must be > 0".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }

        let n_frames = self.frame_count(samples.len());
        if n_frames == 0 {
            log::debug!(
                "No spectral frames: {} samples, frame_size={}",
                samples.len(),
                self.frame_size
            );
            return Ok(Vec::new());
        }

        let Some(bins) = self.band.bins(self.frame_size, sample_rate) else {
            log::warn!(
                "No bins in [{:.1}, {:.1}] Hz at {} Hz / {} samples",
                self.band.low_hz,
                self.band.high_hz,
                sample_rate,
                self.frame_size
            );
            return Ok(Vec::new());
        };

        log::debug!(
            "Framing {} samples: {} frames of {} (hop {}), bins {}..={} via {:?}",
            samples.len(),
            n_frames,
            self.frame_size,
            self.hop_size,
            bins.first,
            bins.last,
            self.backend
        );

        let taper = hann_window(self.frame_size);
        let mut backend = self.backend.build(self.frame_size, bins);
        let half_window = self.frame_size as f32 / 2.0;

        let mut frames = Vec::with_capacity(n_frames);
        for i in 0..n_frames {
            cancel::check(self.cancel.as_ref())?;
            let window = AnalysisWindow::extract(samples, i * self.hop_size, &taper);
            let mut bin_magnitudes = vec![0.0f32; bins.last + 1];
            backend.magnitudes(&window.tapered_samples, &mut bin_magnitudes);

            frames.push(SpectralFrame {
                bin_magnitudes,
                center_time: (window.offset as f32 + half_window) / sample_rate as f32,
            });
        }

        Ok(frames)
    }
}

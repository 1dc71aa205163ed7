//! Chroma vector extraction
//!
//! Maps band-limited magnitude spectra onto 12 pitch classes.
//!
//! # Algorithm
//!
//! 1. Frame the first `analysis_seconds` of audio with a large Hann window
//!    (4096 by default) over 80–2000 Hz, at most `max_windows` windows
//! 2. For each pitch class `note` (0 = C) and octave `o`, the expected
//!    frequency is `f = 440 · 2^((note − 9 + (o − 4)·12) / 12)` and its bin
//!    `round(f · N / sample_rate)`
//! 3. The pitch bin and its neighbors contribute `|X[b]| · (1 − |b − bin| / (spread + 1))`,
//!    optionally scaled up for lower octaves
//! 4. Sum over all windows, then divide by the largest pitch class
//!
//! # Example
//!
//! ```
//! use tempo_key_dsp::analysis::result::PitchClass;
//! use tempo_key_dsp::features::chroma::ChromaExtractor;
//!
//! let sample_rate = 22050u32;
//! let samples: Vec<f32> = (0..sample_rate * 3)
//!     .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin())
//!     .collect();
//! let chroma = ChromaExtractor::default().extract(&samples, sample_rate)?;
//! assert_eq!(chroma.dominant(), PitchClass::A);
//! # Ok::<(), tempo_key_dsp::AnalysisError>(())
//! ```

use super::{normalize_by_max, Chromagram, NUM_PITCH_CLASSES};
use crate::cancel::CancelToken;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::spectral::{FrequencyBand, SpectralFramer};

/// Reference pitch A4 in Hz
const A4_HZ: f64 = 440.0;

/// Pitch class index of A
const A_INDEX: i32 = 9;

/// One spectrum bin feeding a pitch class
#[derive(Debug, Clone, Copy, PartialEq)]
struct PitchTap {
    note: usize,
    bin: usize,
    weight: f32,
}

/// Builds chromagrams from PCM samples
#[derive(Debug, Clone, PartialEq)]
pub struct ChromaExtractor {
    /// Framer over the key sub-band, capped at the maximum window count
    pub framer: SpectralFramer,

    /// Seconds of audio analyzed from the start
    pub analysis_seconds: f32,

    /// Lowest octave probed
    pub min_octave: i32,

    /// Highest octave probed
    pub max_octave: i32,

    /// Neighbor bins on each side of a pitch bin
    pub neighbor_bins: usize,

    /// Extra weight for lower octaves (0.0 = flat)
    pub bass_emphasis: f32,
}

impl Default for ChromaExtractor {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl ChromaExtractor {
    /// Extractor configured from the key section of `config`
    pub fn new(config: &AnalysisConfig) -> Self {
        let band = FrequencyBand::new(config.chroma_band_low_hz, config.chroma_band_high_hz);
        let framer = SpectralFramer::new(config.chroma_frame_size, config.chroma_hop_size, band)
            .with_backend(config.spectrum_backend)
            .with_max_frames(config.chroma_max_windows);

        Self {
            framer,
            analysis_seconds: config.chroma_analysis_seconds,
            min_octave: config.chroma_min_octave,
            max_octave: config.chroma_max_octave,
            neighbor_bins: config.chroma_neighbor_bins,
            bass_emphasis: config.chroma_bass_emphasis,
        }
    }

    /// Weight applied to every tap of `octave`
    /// Poll `cancel` while framing
    pub fn with_cancel(mut self, cancel: Option<CancelToken>) -> Self {
        self.framer = self.framer.with_cancel(cancel);
        self
    }

    fn octave_weight(&self, octave: i32) -> f32 {
        let span = self.max_octave - self.min_octave;
        if span <= 0 || self.bass_emphasis == 0.0 {
            return 1.0;
        }
        1.0 + self.bass_emphasis * (self.max_octave - octave) as f32 / span as f32
    }

    /// Spectrum taps for every pitch class and octave
    fn pitch_taps(&self, sample_rate: u32) -> Vec<PitchTap> {
        let frame_size = self.framer.frame_size;
        let half = (frame_size / 2) as i64;
        let spread = self.neighbor_bins as i64;
        let falloff = 1.0 / (self.neighbor_bins as f32 + 1.0);

        let mut taps = Vec::new();
        for note in 0..NUM_PITCH_CLASSES {
            for octave in self.min_octave..=self.max_octave {
                let semitones = note as i32 - A_INDEX + (octave - 4) * 12;
                let freq = A4_HZ * 2f64.powf(semitones as f64 / 12.0);
                let center = (freq * frame_size as f64 / sample_rate as f64).round() as i64;
                if center <= 0 || center >= half {
                    continue;
                }

                let octave_weight = self.octave_weight(octave);
                let lo = (center - spread).max(1);
                let hi = (center + spread).min(half - 1);
                for b in lo..=hi {
                    let distance = (b - center).unsigned_abs() as f32;
                    taps.push(PitchTap {
                        note,
                        bin: b as usize,
                        weight: (1.0 - distance * falloff) * octave_weight,
                    });
                }
            }
        }
        taps
    }

    /// Accumulated, max-normalized chromagram of `samples`
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono samples (only the first `analysis_seconds` are used)
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    ///
    /// Chromagram whose largest bin is 1.0, or all zeros for silence or input
    /// shorter than one window
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a zero sample rate or invalid
    /// framing parameters, and `AnalysisError::NumericalError` if the
    /// accumulated energy is not finite
    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<Chromagram, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }

        let wanted = (self.analysis_seconds.max(0.0) * sample_rate as f32) as usize;
        let head = &samples[..samples.len().min(wanted)];

        let frames = self.framer.frames(head, sample_rate)?;
        let taps = self.pitch_taps(sample_rate);

        log::debug!(
            "Chroma: {} windows of {} samples, {} pitch taps, octaves {}..={}",
            frames.len(),
            self.framer.frame_size,
            taps.len(),
            self.min_octave,
            self.max_octave
        );

        let mut energy = [0.0f64; NUM_PITCH_CLASSES];
        for frame in &frames {
            for tap in &taps {
                // Bins above the band are not stored and count as zero
                if let Some(&mag) = frame.bin_magnitudes.get(tap.bin) {
                    energy[tap.note] += mag as f64 * tap.weight as f64;
                }
            }
        }

        if let Some(bad) = energy.iter().position(|e| !e.is_finite()) {
            return Err(AnalysisError::NumericalError(format!(
                "Non-finite chroma energy for pitch class {}",
                bad
            )));
        }

        let raw = energy.map(|e| e as f32);
        let chroma = Chromagram(normalize_by_max(&raw));

        log::debug!("Chromagram: {:?}", chroma.bins());

        Ok(chroma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::PitchClass;

    fn sine(freq: f32, sample_rate: u32, seconds: f32, amplitude: f32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_c4_sine_dominant_c() {
        let samples = sine(261.63, 44100, 5.0, 0.5);
        let chroma = ChromaExtractor::default().extract(&samples, 44100).unwrap();
        assert_eq!(chroma.dominant(), PitchClass::C);
        assert_eq!(chroma.bins()[0], 1.0);
    }

    #[test]
    fn test_g3_sine_dominant_g() {
        let samples = sine(196.0, 22050, 4.0, 0.3);
        let chroma = ChromaExtractor::default().extract(&samples, 22050).unwrap();
        assert_eq!(chroma.dominant(), PitchClass::G);
    }

    #[test]
    fn test_silence_is_all_zero() {
        let chroma = ChromaExtractor::default()
            .extract(&vec![0.0; 44100 * 2], 44100)
            .unwrap();
        assert!(chroma.is_silent());
    }

    #[test]
    fn test_shorter_than_window_is_all_zero() {
        let chroma = ChromaExtractor::default()
            .extract(&sine(440.0, 44100, 0.05, 0.5), 44100)
            .unwrap();
        assert!(chroma.is_silent());
    }

    #[test]
    fn test_normalized_range() {
        let mut samples = sine(261.63, 22050, 3.0, 0.4);
        for (s, t) in samples.iter_mut().zip(sine(329.63, 22050, 3.0, 0.3)) {
            *s += t;
        }
        let chroma = ChromaExtractor::default().extract(&samples, 22050).unwrap();
        assert_eq!(chroma.max(), 1.0);
        assert!(chroma.bins().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_taps_stay_inside_spectrum() {
        let extractor = ChromaExtractor::default();
        let taps = extractor.pitch_taps(44100);
        assert!(!taps.is_empty());
        assert!(taps.iter().all(|t| t.bin >= 1 && t.bin < 2048));
        // C4 lands on bin round(261.63 * 4096 / 44100) = 24
        assert!(taps.iter().any(|t| t.note == 0 && t.bin == 24 && t.weight == 1.0));
        assert!(taps.iter().any(|t| t.note == 0 && t.bin == 25 && t.weight == 0.5));
    }

    #[test]
    fn test_bass_emphasis_weights() {
        let config = AnalysisConfig {
            chroma_bass_emphasis: 1.0,
            ..AnalysisConfig::default()
        };
        let extractor = ChromaExtractor::new(&config);
        assert_eq!(extractor.octave_weight(2), 2.0);
        assert_eq!(extractor.octave_weight(6), 1.0);
        assert_eq!(ChromaExtractor::default().octave_weight(2), 1.0);
    }

    #[test]
    fn test_zero_sample_rate() {
        assert!(ChromaExtractor::default().extract(&[0.1; 8192], 0).is_err());
    }
}

//! # Tempo/Key DSP
//!
//! An audio feature extraction engine that estimates the tempo (BPM) and the
//! musical key of a mono PCM recording.
//!
//! ## Features
//!
//! - **Tempo**: band-limited spectral flux onsets, adaptive peak picking and
//!   median inter-onset interval, with a waveform autocorrelation fallback
//! - **Key**: multi-octave chromagram correlated against Krumhansl-Schmuckler
//!   major/minor profiles (24 keys)
//! - **Isolation**: thread-per-request workers with caller-side timeouts and a
//!   JSON request/response protocol
//!
//! Results are deterministic: the same samples always give the same answer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tempo_key_dsp::{analyze_audio, AnalysisConfig};
//!
//! // Load audio samples (mono, f32, normalized)
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let sample_rate = 44100;
//!
//! let result = analyze_audio(&samples, sample_rate, AnalysisConfig::default())?;
//!
//! println!("Tempo: {} BPM", result.tempo_bpm);
//! println!("Key: {}", result.key);
//! # Ok::<(), tempo_key_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! PCM ─┬─ SpectralFramer → OnsetDetector → PeakPicker ─(underflow)→ AutocorrelationEstimator → tempo
//!      └─ ChromaExtractor → KeyClassifier → key
//! ```
//!
//! Short (< 5 s) input skips the tempo pipeline and reports 120 BPM.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod cancel;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;
pub mod worker;

// Re-export main types
pub use analysis::orchestrator::{AnalysisOrchestrator, AnalysisStage};
pub use analysis::result::{AnalysisMetadata, AnalysisResult, Key, Mode, PitchClass};
pub use cancel::CancelToken;
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use features::period::{TempoEstimate, TempoSource};
pub use io::{AudioDecoder, AudioSignal, SymphoniaDecoder};
pub use worker::{AnalysisRequest, AnalysisResponse, AnalysisWorker, WorkerConfig};

/// Main analysis function
///
/// Estimates tempo and key of mono samples.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `AnalysisResult` with tempo in `[60, 200]` BPM, one of 24 keys, and metadata
///
/// # Errors
///
/// Returns `AnalysisError` for empty input, a zero sample rate, an invalid
/// configuration or non-finite samples
///
/// # Example
///
/// ```
/// use tempo_key_dsp::{analyze_audio, AnalysisConfig};
///
/// let samples = vec![0.0f32; 8000 * 2]; // 2 seconds of silence
/// let result = analyze_audio(&samples, 8000, AnalysisConfig::default())?;
/// assert_eq!(result.tempo_bpm, 120);
/// assert_eq!(result.key.to_string(), "C Major");
/// # Ok::<(), tempo_key_dsp::AnalysisError>(())
/// ```
pub fn analyze_audio(
    samples: &[f32],
    sample_rate: u32,
    config: AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let signal = AudioSignal::new(samples.to_vec(), sample_rate)?;
    AnalysisOrchestrator::new(config)?.analyze(&signal)
}

/// Analyze a signal with the default configuration
///
/// # Errors
///
/// Returns `AnalysisError::NumericalError` for non-finite samples
pub fn analyze(signal: &AudioSignal) -> Result<AnalysisResult, AnalysisError> {
    AnalysisOrchestrator::new(AnalysisConfig::default())?.analyze(signal)
}

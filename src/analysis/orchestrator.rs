//! Analysis orchestration
//!
//! Runs the tempo and key paths over one signal and packages the result.
//!
//! # Stages
//!
//! ```text
//! tempo: Idle → FramingTempo → OnsetDetecting → PeakPicking → [FallingBackToAutocorrelation] → TempoDone
//! key:   Idle → ExtractingChroma → ClassifyingKey → KeyDone
//! both:  TempoDone + KeyDone → Complete
//! ```
//!
//! Signals shorter than 5 s go straight from `Idle` to `TempoDone` with the
//! default tempo. Stages only move forward within their path; every call
//! starts from a fresh `Idle` state.

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::result::{AnalysisMetadata, AnalysisResult};
use crate::cancel::{self, CancelToken};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::chroma::ChromaExtractor;
use crate::features::key::{KeyClassifier, KeyDetectionResult};
use crate::features::onset::{
    EnergyFluxOnsets, OnsetDetector, OnsetEnvelope, OnsetMethod, OnsetStrategy, SpectralFluxOnsets,
};
use crate::features::period::{
    estimate_tempo_from_envelope, AutocorrelationEstimator, TempoEstimate, TempoSource,
    DEFAULT_BPM, MIN_DURATION_SECONDS,
};
use crate::features::spectral::{FrequencyBand, SpectralFramer};
use crate::io::{AudioDecoder, AudioSignal};

/// Pipeline stage of one analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    /// Nothing has run yet
    Idle,
    /// Computing tempo-band spectral frames
    FramingTempo,
    /// Computing the onset envelope
    OnsetDetecting,
    /// Picking envelope peaks and measuring intervals
    PeakPicking,
    /// Onset path underflowed; correlating the waveform
    FallingBackToAutocorrelation,
    /// Tempo path finished
    TempoDone,
    /// Accumulating the chromagram
    ExtractingChroma,
    /// Correlating the chromagram with key profiles
    ClassifyingKey,
    /// Key path finished
    KeyDone,
    /// Both paths finished
    Complete,
}

/// Which path a stage belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Tempo,
    Key,
    Join,
}

impl AnalysisStage {
    fn branch(self) -> Branch {
        match self {
            AnalysisStage::Idle | AnalysisStage::Complete => Branch::Join,
            AnalysisStage::FramingTempo
            | AnalysisStage::OnsetDetecting
            | AnalysisStage::PeakPicking
            | AnalysisStage::FallingBackToAutocorrelation
            | AnalysisStage::TempoDone => Branch::Tempo,
            AnalysisStage::ExtractingChroma
            | AnalysisStage::ClassifyingKey
            | AnalysisStage::KeyDone => Branch::Key,
        }
    }

    /// Position within the stage's own path
    fn rank(self) -> u8 {
        match self {
            AnalysisStage::Idle => 0,
            AnalysisStage::FramingTempo | AnalysisStage::ExtractingChroma => 1,
            AnalysisStage::OnsetDetecting | AnalysisStage::ClassifyingKey => 2,
            AnalysisStage::PeakPicking | AnalysisStage::KeyDone => 3,
            AnalysisStage::FallingBackToAutocorrelation => 4,
            AnalysisStage::TempoDone => 5,
            AnalysisStage::Complete => 6,
        }
    }
}

/// Stage bookkeeping for one invocation
#[derive(Debug, Clone)]
struct StageTracker {
    tempo: AnalysisStage,
    key: AnalysisStage,
    visited: Vec<AnalysisStage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            tempo: AnalysisStage::Idle,
            key: AnalysisStage::Idle,
            visited: vec![AnalysisStage::Idle],
        }
    }

    /// Move to `stage`, rejecting re-entry and backward moves
    fn enter(&mut self, stage: AnalysisStage) -> Result<(), AnalysisError> {
        let current = match stage.branch() {
            Branch::Tempo => &mut self.tempo,
            Branch::Key => &mut self.key,
            Branch::Join => {
                let ready = self.tempo == AnalysisStage::TempoDone
                    && self.key == AnalysisStage::KeyDone
                    && stage == AnalysisStage::Complete
                    && !self.visited.contains(&AnalysisStage::Complete);
                if !ready {
                    return Err(AnalysisError::ProcessingError(format!(
                        "Cannot enter {:?} (tempo at {:?}, key at {:?})",
                        stage, self.tempo, self.key
                    )));
                }
                self.visited.push(stage);
                log::debug!("Stage: {:?}", stage);
                return Ok(());
            }
        };

        if stage.rank() <= current.rank() {
            return Err(AnalysisError::ProcessingError(format!(
                "Invalid stage transition {:?} -> {:?}",
                current, stage
            )));
        }

        *current = stage;
        self.visited.push(stage);
        log::debug!("Stage: {:?}", stage);
        Ok(())
    }
}

/// Per-invocation state: stages plus counters that end up in metadata
#[derive(Debug)]
struct Run {
    cancel: Option<CancelToken>,
    stages: StageTracker,
    peak_count: Option<usize>,
    interval_count: Option<usize>,
    fallback_reason: Option<String>,
    warnings: Vec<String>,
}

impl Run {
    fn new(cancel: Option<CancelToken>) -> Self {
        Self {
            cancel,
            stages: StageTracker::new(),
            peak_count: None,
            interval_count: None,
            fallback_reason: None,
            warnings: Vec::new(),
        }
    }

    /// Stop if cancelled, otherwise move to `stage`
    fn enter(&mut self, stage: AnalysisStage) -> Result<(), AnalysisError> {
        cancel::check(self.cancel.as_ref())?;
        self.stages.enter(stage)
    }
}

/// Sequences tempo and key estimation over a signal
///
/// Holds configuration and an optional cancel token; each call owns its
/// intermediate buffers, so one orchestrator can serve any number of
/// sequential or concurrent calls.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    cancel: Option<CancelToken>,
}

impl AnalysisOrchestrator {
    /// Create an orchestrator
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `config` fails validation
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config, cancel: None })
    }

    /// Abandon analyses with `Err(Cancelled)` once `cancel` fires
    ///
    /// The token is polled at every stage and inside framing and the
    /// autocorrelation lag search.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a decoded mono signal
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::NumericalError` when the signal contains NaN or
    /// infinite samples or an intermediate value becomes non-finite. Short,
    /// silent or aperiodic input is not an error.
    pub fn analyze(&self, signal: &AudioSignal) -> Result<AnalysisResult, AnalysisError> {
        let start_time = Instant::now();

        log::debug!(
            "Starting audio analysis: {} samples at {} Hz ({:.2}s)",
            signal.len(),
            signal.sample_rate(),
            signal.duration_seconds()
        );

        check_finite(signal)?;

        let mut run = self.run();
        let tempo = self.tempo_path(signal, &mut run)?;
        let key = self.key_path(signal, &mut run)?;
        run.enter(AnalysisStage::Complete)?;

        let processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

        log::info!(
            "Analysis complete: {} BPM ({}), key {} in {:.1} ms",
            tempo.bpm,
            tempo.source,
            key.key,
            processing_time_ms
        );

        Ok(AnalysisResult {
            tempo_bpm: tempo.bpm,
            key: key.key,
            metadata: AnalysisMetadata {
                duration_seconds: signal.duration_seconds(),
                sample_rate: signal.sample_rate(),
                processing_time_ms,
                algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
                tempo_source: tempo.source,
                onset_method: self.onset_method_name().to_string(),
                stages: run.stages.visited,
                peak_count: run.peak_count,
                interval_count: run.interval_count,
                fallback_reason: run.fallback_reason,
                key_score: key.score,
                warnings: run.warnings,
            },
        })
    }

    /// Decode `path` with `decoder`, then analyze it
    ///
    /// # Errors
    ///
    /// Propagates decoder failures (`DecodingError`, `Io`) and analysis errors
    pub fn analyze_source<D: AudioDecoder + ?Sized>(
        &self,
        decoder: &D,
        path: &Path,
    ) -> Result<AnalysisResult, AnalysisError> {
        log::debug!("Decoding {} with {}", path.display(), decoder.name());
        let signal = decoder.decode(path)?;
        self.analyze(&signal)
    }

    /// Run only the tempo path
    ///
    /// # Errors
    ///
    /// Same conditions as [`analyze`](Self::analyze)
    pub fn estimate_tempo(&self, signal: &AudioSignal) -> Result<TempoEstimate, AnalysisError> {
        check_finite(signal)?;
        self.tempo_path(signal, &mut self.run())
    }

    /// Run only the key path
    ///
    /// # Errors
    ///
    /// Same conditions as [`analyze`](Self::analyze)
    pub fn estimate_key(&self, signal: &AudioSignal) -> Result<KeyDetectionResult, AnalysisError> {
        check_finite(signal)?;
        self.key_path(signal, &mut self.run())
    }

    /// Turn an onset envelope into a tempo, falling back to autocorrelation
    ///
    /// The onset path is used when enough peaks and intervals survive;
    /// otherwise the waveform `samples` are correlated instead.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::NumericalError` for a non-finite envelope and
    /// `AnalysisError::InvalidInput` for a zero sample rate
    pub fn resolve_tempo(
        &self,
        envelope: &OnsetEnvelope,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<TempoEstimate, AnalysisError> {
        let mut run = self.run();
        self.resolve_tempo_in(envelope, samples, sample_rate, &mut run)
    }

    fn run(&self) -> Run {
        Run::new(self.cancel.clone())
    }

    fn onset_method_name(&self) -> &'static str {
        match self.config.onset_method {
            OnsetMethod::SpectralFlux => "spectral-flux",
            OnsetMethod::EnergyFlux => "energy-flux",
        }
    }

    fn tempo_path(&self, signal: &AudioSignal, run: &mut Run) -> Result<TempoEstimate, AnalysisError> {
        let duration = signal.duration_seconds();
        if duration < MIN_DURATION_SECONDS {
            log::warn!(
                "Signal is {:.2}s (< {:.1}s), using default tempo {} BPM",
                duration,
                MIN_DURATION_SECONDS,
                DEFAULT_BPM
            );
            run.warnings.push(format!(
                "input shorter than {:.0}s; tempo defaulted to {} BPM",
                MIN_DURATION_SECONDS, DEFAULT_BPM
            ));
            run.enter(AnalysisStage::TempoDone)?;
            return Ok(TempoEstimate {
                bpm: DEFAULT_BPM,
                source: TempoSource::ShortInputDefault,
            });
        }

        let head = signal.head(self.config.tempo_analysis_seconds);
        let sample_rate = signal.sample_rate();

        let envelope = match self.config.onset_method {
            OnsetMethod::SpectralFlux => {
                let framer = SpectralFramer::new(
                    self.config.frame_size,
                    self.config.hop_size,
                    FrequencyBand::new(self.config.tempo_band_low_hz, self.config.tempo_band_high_hz),
                )
                .with_backend(self.config.spectrum_backend)
                .with_cancel(self.cancel.clone());
                let strategy = SpectralFluxOnsets {
                    framer,
                    detector: OnsetDetector::new(self.config.onset_low_bin_cutoff),
                };
                onset_envelope(&strategy, head, sample_rate, run)?
            }
            OnsetMethod::EnergyFlux => {
                let strategy = EnergyFluxOnsets::new(self.config.frame_size, self.config.hop_size);
                onset_envelope(&strategy, head, sample_rate, run)?
            }
        };

        self.resolve_tempo_in(&envelope, signal.samples(), sample_rate, run)
    }

    fn resolve_tempo_in(
        &self,
        envelope: &OnsetEnvelope,
        samples: &[f32],
        sample_rate: u32,
        run: &mut Run,
    ) -> Result<TempoEstimate, AnalysisError> {
        if let Some(i) = envelope.values.iter().position(|v| !v.is_finite()) {
            return Err(AnalysisError::NumericalError(format!(
                "Non-finite onset strength at frame {}",
                i
            )));
        }

        run.enter(AnalysisStage::PeakPicking)?;

        let estimate = match estimate_tempo_from_envelope(envelope) {
            Ok(tempo) => {
                run.peak_count = Some(tempo.peak_count);
                run.interval_count = Some(tempo.interval_count);
                TempoEstimate {
                    bpm: tempo.bpm,
                    source: TempoSource::OnsetIntervals,
                }
            }
            Err(underflow) => {
                log::warn!("Onset path underflow ({}), using autocorrelation", underflow);
                run.fallback_reason = Some(underflow.to_string());
                run.enter(AnalysisStage::FallingBackToAutocorrelation)?;

                let bpm = AutocorrelationEstimator::from_config(&self.config)
                    .with_cancel(self.cancel.clone())
                    .estimate(samples, sample_rate)?;
                TempoEstimate {
                    bpm,
                    source: TempoSource::Autocorrelation,
                }
            }
        };

        run.enter(AnalysisStage::TempoDone)?;
        log::debug!("Tempo: {} BPM via {}", estimate.bpm, estimate.source);
        Ok(estimate)
    }

    fn key_path(&self, signal: &AudioSignal, run: &mut Run) -> Result<KeyDetectionResult, AnalysisError> {
        run.enter(AnalysisStage::ExtractingChroma)?;
        let chroma = ChromaExtractor::new(&self.config)
            .with_cancel(self.cancel.clone())
            .extract(signal.samples(), signal.sample_rate())?;
        if chroma.is_silent() {
            log::warn!("Chromagram is silent, key falls back to the first candidate");
            run.warnings
                .push("no pitched energy; key is the deterministic default".to_string());
        }

        run.enter(AnalysisStage::ClassifyingKey)?;
        let result = KeyClassifier::new().classify(&chroma);

        run.enter(AnalysisStage::KeyDone)?;
        Ok(result)
    }
}

/// Frame and detect with any onset strategy, recording the stages
fn onset_envelope<S: OnsetStrategy>(
    strategy: &S,
    samples: &[f32],
    sample_rate: u32,
    run: &mut Run,
) -> Result<OnsetEnvelope, AnalysisError> {
    run.enter(AnalysisStage::FramingTempo)?;
    let frames = strategy.frame(samples, sample_rate)?;

    run.enter(AnalysisStage::OnsetDetecting)?;
    let envelope = strategy.detect(&frames, sample_rate);

    log::debug!(
        "Onset envelope via {}: {} frames",
        strategy.name(),
        envelope.len()
    );
    Ok(envelope)
}

fn check_finite(signal: &AudioSignal) -> Result<(), AnalysisError> {
    match signal.first_non_finite() {
        Some(i) => Err(AnalysisError::NumericalError(format!(
            "Non-finite sample at index {}",
            i
        ))),
        None => Ok(()),
    }
}

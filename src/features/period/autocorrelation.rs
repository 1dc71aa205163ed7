//! Waveform autocorrelation tempo estimation
//!
//! Terminal fallback when the onset path underflows. Works directly on the
//! (optionally high-pass filtered) samples rather than on an onset envelope.
//!
//! # Algorithm
//!
//! 1. Restrict to the first `analysis_seconds` of audio
//! 2. For lags `L` from `0.3 * sample_rate` up to (excluding) `1.5 * sample_rate`,
//!    stepping by `lag_step`, compute the sparse correlation
//!    `r(L) = Σ x[i]·x[i+L] / count` over `i = 0, sample_step, 2·sample_step, ...`
//! 3. Keep the first lag with the strictly largest `r(L)`, negative or not
//! 4. `BPM = 60 * sample_rate / L*`, then fold octaves (`while < 70: ×2`,
//!    `while > 180: ÷2`) and clamp to `[60, 200]`
//!
//! When every lag correlates to exactly zero (silence) or no lag fits (a
//! signal shorter than the minimum lag) the default tempo of 120 BPM is
//! returned. The estimator
//! never asks for a further fallback.
//!
//! # Example
//!
//! ```
//! use tempo_key_dsp::features::period::AutocorrelationEstimator;
//!
//! let sample_rate = 8000;
//! // 2 Hz pulse train: one beat every 0.5 s
//! let samples: Vec<f32> = (0..sample_rate * 10)
//!     .map(|i| (2.0 * std::f32::consts::PI * 2.0 * i as f32 / sample_rate as f32).sin())
//!     .collect();
//! let bpm = AutocorrelationEstimator::default().estimate(&samples, sample_rate as u32)?;
//! assert_eq!(bpm, 120);
//! # Ok::<(), tempo_key_dsp::AnalysisError>(())
//! ```

use std::borrow::Cow;

use super::{clamp_bpm, fold_octaves_repeatedly, DEFAULT_BPM};
use crate::cancel::{self, CancelToken};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::preprocessing::filter::high_pass;

/// Shortest lag searched, in seconds (200 BPM)
const MIN_LAG_SECONDS: f32 = 0.3;

/// Lag search stops before this many seconds (40 BPM)
const MAX_LAG_SECONDS: f32 = 1.5;

/// Best lag found by the search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagPeak {
    /// Lag in samples
    pub lag: usize,
    /// Mean product at that lag
    pub correlation: f64,
}

/// Sparse waveform autocorrelation
#[derive(Debug, Clone, PartialEq)]
pub struct AutocorrelationEstimator {
    /// Seconds of audio correlated (from the start)
    pub analysis_seconds: f32,
    /// Lag increment in samples
    pub lag_step: usize,
    /// Sample index increment inside each dot product
    pub sample_step: usize,
    /// Optional high-pass cutoff applied before correlating
    pub highpass_hz: Option<f32>,
    /// Checked before each lag; the search stops once cancelled
    pub cancel: Option<CancelToken>,
}

impl Default for AutocorrelationEstimator {
    fn default() -> Self {
        Self::new(20.0, 8, 16)
    }
}

impl AutocorrelationEstimator {
    /// Create an estimator without pre-filtering
    pub fn new(analysis_seconds: f32, lag_step: usize, sample_step: usize) -> Self {
        Self {
            analysis_seconds,
            lag_step,
            sample_step,
            highpass_hz: None,
            cancel: None,
        }
    }

    /// Apply a one-pole high-pass at `cutoff_hz` before correlating
    pub fn with_highpass(mut self, cutoff_hz: f32) -> Self {
        self.highpass_hz = Some(cutoff_hz);
        self
    }

    /// Estimator configured from the fallback section of `config`
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            analysis_seconds: config.autocorrelation_seconds,
            lag_step: config.autocorrelation_lag_step,
            sample_step: config.autocorrelation_sample_step,
            highpass_hz: config.autocorrelation_highpass_hz,
            cancel: None,
        }
    }

    /// Poll `cancel` during the lag search
    pub fn with_cancel(mut self, cancel: Option<CancelToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Estimate tempo in BPM
    ///
    /// # Returns
    ///
    /// Tempo within `[60, 200]`; 120 for silence or input shorter than the
    /// minimum lag
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a zero sample rate or zero
    /// step sizes, `AnalysisError::NumericalError` for a non-finite
    /// correlation and `AnalysisError::Cancelled` if the cancel token fires.
    /// Silent or aperiodic audio never errors.
    pub fn estimate(&self, samples: &[f32], sample_rate: u32) -> Result<u32, AnalysisError> {
        let Some(best) = self.best_lag(samples, sample_rate)? else {
            log::warn!(
                "Autocorrelation found no correlated lag, using default {} BPM",
                DEFAULT_BPM
            );
            return Ok(DEFAULT_BPM);
        };

        let raw_bpm = 60.0 * sample_rate as f32 / best.lag as f32;
        let folded = fold_octaves_repeatedly(raw_bpm);
        let bpm = clamp_bpm(folded);

        log::debug!(
            "Autocorrelation tempo: lag {} (r={:.6}), raw {:.2} BPM, folded {:.2} -> {} BPM",
            best.lag,
            best.correlation,
            raw_bpm,
            folded,
            bpm
        );

        Ok(bpm)
    }

    /// Search for the lag with the largest correlation
    ///
    /// Returns `Ok(None)` when no lag fits the analysis window or every
    /// correlation is exactly zero.
    ///
    /// # Errors
    ///
    /// Same conditions as [`estimate`](Self::estimate)
    pub fn best_lag(&self, samples: &[f32], sample_rate: u32) -> Result<Option<LagPeak>, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }
        if self.lag_step == 0 || self.sample_step == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Autocorrelation steps must be > 0 (lag_step={}, sample_step={})",
                self.lag_step, self.sample_step
            )));
        }

        let wanted = (self.analysis_seconds.max(0.0) * sample_rate as f32) as usize;
        let analysis_len = samples.len().min(wanted);
        let head = &samples[..analysis_len];

        let data: Cow<'_, [f32]> = match self.highpass_hz {
            Some(cutoff) => Cow::Owned(high_pass(head, sample_rate, cutoff)?),
            None => Cow::Borrowed(head),
        };

        let min_lag = (MIN_LAG_SECONDS * sample_rate as f32) as usize;
        let max_lag = ((MAX_LAG_SECONDS * sample_rate as f32) as usize).min(analysis_len);

        log::debug!(
            "Autocorrelation over {} samples, lags [{}, {}) step {}, sample step {}",
            analysis_len,
            min_lag,
            max_lag,
            self.lag_step,
            self.sample_step
        );

        let mut best: Option<LagPeak> = None;
        let mut correlated = false;
        for lag in (min_lag.max(1)..max_lag).step_by(self.lag_step) {
            cancel::check(self.cancel.as_ref())?;

            let Some(correlation) = sparse_correlation(&data, lag, self.sample_step) else {
                continue;
            };
            if !correlation.is_finite() {
                return Err(AnalysisError::NumericalError(format!(
                    "Non-finite autocorrelation at lag {}",
                    lag
                )));
            }
            correlated |= correlation != 0.0;
            if best.is_none_or(|b| correlation > b.correlation) {
                best = Some(LagPeak { lag, correlation });
            }
        }

        Ok(best.filter(|_| correlated))
    }
}

/// Mean of `x[i] * x[i + lag]` over every `step`-th index
fn sparse_correlation(data: &[f32], lag: usize, step: usize) -> Option<f64> {
    if lag >= data.len() {
        return None;
    }
    let (sum, count) = (0..data.len() - lag)
        .step_by(step)
        .fold((0.0f64, 0usize), |(sum, count), i| {
            (sum + data[i] as f64 * data[i + lag] as f64, count + 1)
        });
    (count > 0).then(|| sum / count as f64)
}

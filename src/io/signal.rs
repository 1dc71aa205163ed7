//! Immutable mono PCM signal handed to the analysis pipeline

use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::downmix_interleaved;

/// Decoded single-channel audio
///
/// Invariants: at least one sample, `sample_rate > 0`, `channel_count > 0`.
/// `channel_count` records how many channels the source had before it was
/// down-mixed; the samples themselves are always one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
    channel_count: u16,
}

impl AudioSignal {
    /// Wrap mono samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for an empty buffer or a zero sample rate
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        Self::with_channel_count(samples, sample_rate, 1)
    }

    /// Wrap mono samples that were down-mixed from `channel_count` channels
    pub fn with_channel_count(
        samples: Vec<f32>,
        sample_rate: u32,
        channel_count: u16,
    ) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Empty audio samples".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }
        if channel_count == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid channel count: 0".to_string(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
            channel_count,
        })
    }

    /// Down-mix interleaved multi-channel samples by averaging each frame
    pub fn from_interleaved(
        interleaved: &[f32],
        sample_rate: u32,
        channel_count: u16,
    ) -> Result<Self, AnalysisError> {
        let mono = downmix_interleaved(interleaved, channel_count as usize)?;
        Self::with_channel_count(mono, sample_rate, channel_count)
    }

    /// Mono samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the source before down-mixing
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; kept for API symmetry with slices
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Number of samples covering `seconds` of audio, capped at the signal length
    pub fn usable_length(&self, seconds: f32) -> usize {
        let wanted = (seconds.max(0.0) * self.sample_rate as f32) as usize;
        wanted.min(self.samples.len())
    }

    /// Leading `seconds` of the signal
    pub fn head(&self, seconds: f32) -> &[f32] {
        &self.samples[..self.usable_length(seconds)]
    }

    /// Index of the first NaN or infinite sample, if any
    pub fn first_non_finite(&self) -> Option<usize> {
        self.samples.iter().position(|s| !s.is_finite())
    }
}

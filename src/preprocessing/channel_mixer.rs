//! Channel mixing utilities (multi-channel to mono conversion)

use crate::error::AnalysisError;

/// Down-mix interleaved samples to mono by averaging each frame
///
/// # Arguments
///
/// * `interleaved` - Samples ordered `[f0c0, f0c1, ..., f1c0, f1c1, ...]`
/// * `channels` - Number of interleaved channels
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `channels` is zero or the buffer
/// length is not a whole number of frames
pub fn downmix_interleaved(interleaved: &[f32], channels: usize) -> Result<Vec<f32>, AnalysisError> {
    if channels == 0 {
        return Err(AnalysisError::InvalidInput(
            "Channel count must be > 0".to_string(),
        ));
    }

    if !interleaved.len().is_multiple_of(channels) {
        return Err(AnalysisError::InvalidInput(format!(
            "Interleaved buffer of {} samples is not a multiple of {} channels",
            interleaved.len(),
            channels
        )));
    }

    if channels == 1 {
        return Ok(interleaved.to_vec());
    }

    log::debug!(
        "Down-mixing {} frames of {} channels to mono",
        interleaved.len() / channels,
        channels
    );

    let scale = 1.0 / channels as f32;
    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect())
}

//! Envelope statistics and adaptive thresholding for onset peak picking

use crate::error::AnalysisError;

/// Mean, population standard deviation and maximum of an envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeStats {
    /// Arithmetic mean
    pub mean: f32,
    /// Population standard deviation (divides by n)
    pub std_dev: f32,
    /// Largest value
    pub max: f32,
}

/// Compute envelope statistics
///
/// Returns `None` for an empty envelope.
pub fn envelope_stats(values: &[f32]) -> Option<EnvelopeStats> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    Some(EnvelopeStats {
        mean: mean as f32,
        std_dev: variance.sqrt() as f32,
        max,
    })
}

/// Compute the adaptive threshold `mean + k * std_dev`
///
/// # Errors
///
/// Returns `AnalysisError` if values are empty or `k` is negative
pub fn mean_std_threshold(values: &[f32], k: f32) -> Result<f32, AnalysisError> {
    if k < 0.0 {
        return Err(AnalysisError::InvalidInput(
            "Standard deviation multiplier k must be non-negative".to_string(),
        ));
    }

    let stats = envelope_stats(values).ok_or_else(|| {
        AnalysisError::InvalidInput("Empty values for threshold calculation".to_string())
    })?;

    log::debug!(
        "Envelope stats: mean={:.6}, std={:.6}, max={:.6}",
        stats.mean,
        stats.std_dev,
        stats.max
    );

    Ok(stats.mean + k * stats.std_dev)
}

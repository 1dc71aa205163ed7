//! One-pole high-pass filter
//!
//! Removes slow drift and low rumble so the autocorrelation fallback locks
//! onto percussive periodicity instead of sustained bass.

use crate::error::AnalysisError;

/// Apply a first-order RC high-pass filter
///
/// `y[n] = a * (y[n-1] + x[n] - x[n-1])` with `a = rc / (rc + dt)`,
/// `rc = 1 / (2π·cutoff)` and `dt = 1 / sample_rate`.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or a
/// non-positive cutoff
pub fn high_pass(samples: &[f32], sample_rate: u32, cutoff_hz: f32) -> Result<Vec<f32>, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Invalid sample rate: 0".to_string(),
        ));
    }
    if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid high-pass cutoff: {}",
            cutoff_hz
        )));
    }

    let Some(&first) = samples.first() else {
        return Ok(Vec::new());
    };

    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let dt = 1.0 / sample_rate as f32;
    let alpha = rc / (rc + dt);

    let mut filtered = Vec::with_capacity(samples.len());
    filtered.push(first);
    let mut prev_out = first;
    for pair in samples.windows(2) {
        let out = alpha * (prev_out + pair[1] - pair[0]);
        filtered.push(out);
        prev_out = out;
    }

    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_dc() {
        let samples = vec![1.0f32; 44100];
        let filtered = high_pass(&samples, 44100, 100.0).unwrap();
        assert_eq!(filtered.len(), samples.len());
        assert!(filtered.last().unwrap().abs() < 1e-3);
    }

    #[test]
    fn test_passes_high_frequency() {
        let sr = 44100;
        let samples: Vec<f32> = (0..sr)
            .map(|i| (2.0 * std::f32::consts::PI * 5000.0 * i as f32 / sr as f32).sin())
            .collect();
        let filtered = high_pass(&samples, sr as u32, 50.0).unwrap();
        let peak = filtered[sr / 2..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.9, "5 kHz tone should pass a 50 Hz high-pass, peak={}", peak);
    }

    #[test]
    fn test_invalid_params() {
        assert!(high_pass(&[0.0], 0, 100.0).is_err());
        assert!(high_pass(&[0.0], 44100, 0.0).is_err());
        assert!(high_pass(&[], 44100, 100.0).unwrap().is_empty());
    }
}

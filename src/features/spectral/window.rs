//! Hann taper and transient analysis windows

use std::f64::consts::PI;

/// Hann taper of length `n`: `0.5 * (1 - cos(2πj / (n - 1)))`
///
/// Symmetric form, so both end points are exactly zero.
pub fn hann_window(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (n - 1) as f64;
            (0..n)
                .map(|j| (0.5 * (1.0 - (2.0 * PI * j as f64 / denom).cos())) as f32)
                .collect()
        }
    }
}

/// One tapered slice of the signal, alive only until its spectrum is computed
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    /// Index of the first sample in the source signal
    pub offset: usize,

    /// Source samples multiplied by the taper
    pub tapered_samples: Vec<f32>,
}

impl AnalysisWindow {
    /// Copy `taper.len()` samples starting at `offset` and apply the taper
    ///
    /// The caller guarantees `offset + taper.len() <= samples.len()`.
    pub fn extract(samples: &[f32], offset: usize, taper: &[f32]) -> Self {
        let tapered_samples = samples[offset..offset + taper.len()]
            .iter()
            .zip(taper)
            .map(|(s, w)| s * w)
            .collect();
        Self {
            offset,
            tapered_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_endpoints_and_peak() {
        let w = hann_window(2048);
        assert_eq!(w.len(), 2048);
        assert!(w[0].abs() < 1e-7);
        assert!(w[2047].abs() < 1e-7);
        let peak = w.iter().cloned().fold(0.0f32, f32::max);
        assert!((peak - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hann_symmetric() {
        let w = hann_window(64);
        for j in 0..32 {
            assert!((w[j] - w[63 - j]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_extract_applies_taper() {
        let samples = vec![2.0f32; 16];
        let taper = hann_window(8);
        let window = AnalysisWindow::extract(&samples, 4, &taper);
        assert_eq!(window.offset, 4);
        assert_eq!(window.tapered_samples.len(), 8);
        for (t, w) in window.tapered_samples.iter().zip(&taper) {
            assert!((t - 2.0 * w).abs() < 1e-6);
        }
    }
}

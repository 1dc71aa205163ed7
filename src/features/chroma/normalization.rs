//! Chroma normalization

use super::NUM_PITCH_CLASSES;

/// Divide every bin by the largest one
///
/// A profile whose maximum is not positive and finite (e.g. silence) is
/// returned unchanged. Normalizing an already normalized profile is a no-op,
/// since its maximum is exactly 1.0.
///
/// # Example
///
/// ```
/// use tempo_key_dsp::features::chroma::normalize_by_max;
///
/// let mut raw = [0.0f32; 12];
/// raw[0] = 4.0;
/// raw[7] = 2.0;
/// let once = normalize_by_max(&raw);
/// assert_eq!(once[0], 1.0);
/// assert_eq!(once[7], 0.5);
/// assert_eq!(normalize_by_max(&once), once);
/// ```
pub fn normalize_by_max(bins: &[f32; NUM_PITCH_CLASSES]) -> [f32; NUM_PITCH_CLASSES] {
    let max = bins.iter().copied().fold(0.0f32, f32::max);
    if !(max.is_finite() && max > 0.0) {
        return *bins;
    }
    bins.map(|v| v / max)
}

//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - Band-limited spectral framing
//! - Onset detection (spectral flux, energy flux)
//! - Period estimation (BPM detection)
//! - Chroma extraction
//! - Key detection

pub mod chroma;
pub mod key;
pub mod onset;
pub mod period;
pub mod spectral;

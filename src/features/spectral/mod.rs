//! Windowed magnitude spectra over a restricted frequency band
//!
//! - Hann tapering
//! - Pluggable magnitude backends (direct DFT, rustfft)
//! - Overlapping framing with per-frame timestamps

pub mod backend;
pub mod framer;
pub mod window;

pub use backend::{DirectDft, RustFftBackend, SpectrumBackend, SpectrumBackendKind};
pub use framer::{BinRange, FrequencyBand, SpectralFrame, SpectralFramer};
pub use window::{hann_window, AnalysisWindow};

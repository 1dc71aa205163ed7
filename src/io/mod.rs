//! Audio I/O modules
//!
//! The engine consumes an [`AudioSignal`]; decoding compressed files into one
//! is delegated to an [`AudioDecoder`] passed in by the caller.

pub mod decoder;
pub mod signal;

pub use decoder::{AudioDecoder, SymphoniaDecoder};
pub use signal::AudioSignal;

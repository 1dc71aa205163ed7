//! Audio preprocessing modules
//!
//! Utilities for preparing samples before analysis:
//! - Channel down-mixing (interleaved to mono)
//! - High-pass filtering for the autocorrelation fallback

pub mod channel_mixer;
pub mod filter;

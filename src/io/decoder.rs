//! Audio decoding capability
//!
//! The orchestrator never looks up a global decoder: callers hand it an
//! [`AudioDecoder`]. [`SymphoniaDecoder`] is the bundled implementation.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::signal::AudioSignal;
use crate::error::AnalysisError;

/// Turns an audio source into a mono [`AudioSignal`]
pub trait AudioDecoder: Send + Sync {
    /// Decode the file at `path`, down-mixing to one channel
    fn decode(&self, path: &Path) -> Result<AudioSignal, AnalysisError>;

    /// Get the name of this decoder (for logging)
    fn name(&self) -> &'static str;
}

/// Decoder backed by Symphonia's default codec and format registries
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    /// Stop decoding after this many seconds (default: decode everything)
    pub max_seconds: Option<f32>,
}

impl SymphoniaDecoder {
    /// Decoder that reads whole files
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that stops after `seconds` of audio
    pub fn with_max_seconds(seconds: f32) -> Self {
        Self {
            max_seconds: Some(seconds),
        }
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<AudioSignal, AnalysisError> {
        log::debug!("Decoding audio file: {}", path.display());

        let src = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(src), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                AnalysisError::DecodingError("No supported audio tracks found".to_string())
            })?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params.sample_rate.ok_or_else(|| {
            AnalysisError::DecodingError("Track does not declare a sample rate".to_string())
        })?;

        let mut decoder =
            symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

        let frame_limit = self
            .max_seconds
            .map(|s| (s.max(0.0) * sample_rate as f32) as usize);

        let mut interleaved: Vec<f32> = Vec::new();
        let mut channels = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    channels = spec.channels.count();
                    let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buf.samples());
                }
                Err(SymphoniaError::DecodeError(msg)) => {
                    // Corrupted packets are skipped
                    log::warn!("Skipping undecodable packet in {}: {}", path.display(), msg);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            if let Some(limit) = frame_limit {
                if channels > 0 && interleaved.len() / channels >= limit {
                    interleaved.truncate(limit * channels);
                    break;
                }
            }
        }

        if channels == 0 || interleaved.is_empty() {
            return Err(AnalysisError::DecodingError(format!(
                "No audio decoded from {}",
                path.display()
            )));
        }

        let channel_count = u16::try_from(channels).map_err(|_| {
            AnalysisError::DecodingError(format!("Unsupported channel count: {}", channels))
        })?;

        log::debug!(
            "Decoded {} frames, {} channels at {} Hz",
            interleaved.len() / channels,
            channels,
            sample_rate
        );

        AudioSignal::from_interleaved(&interleaved, sample_rate, channel_count)
    }

    fn name(&self) -> &'static str {
        "symphonia"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let decoder = SymphoniaDecoder::new();
        let result = decoder.decode(Path::new("/definitely/not/here.wav"));
        assert!(matches!(result, Err(AnalysisError::Io(_))));
    }

    #[test]
    fn test_garbage_file_is_decoding_error() {
        let path = std::env::temp_dir().join(format!(
            "tempo_key_dsp_garbage_{}.bin",
            std::process::id()
        ));
        std::fs::write(&path, b"this is not audio at all").unwrap();
        let result = SymphoniaDecoder::new().decode(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(AnalysisError::DecodingError(_))));
    }
}

//! Request/response messages exchanged with an analysis worker
//!
//! Serialized as JSON. Responses carry the request's identifier back so the
//! caller can correlate them; failures carry a message instead of results.
//!
//! ```json
//! {"samples":[0.0,0.1],"sample_rate":44100,"duration_seconds":0.00004,"channel_count":1,"request_id":"a1"}
//! {"success":true,"request_id":"a1","tempo_bpm":120,"key":"C Major"}
//! {"success":false,"request_id":"a1","error":"Transport error: analysis timed out"}
//! ```

use serde::{Deserialize, Serialize};

use crate::analysis::result::{AnalysisResult, Key};
use crate::error::AnalysisError;
use crate::io::AudioSignal;

/// Mismatch between declared and actual duration that is worth a warning
const DURATION_TOLERANCE_SECONDS: f32 = 0.5;

/// One analysis job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Mono samples (already down-mixed by the caller)
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Declared duration in seconds (informational)
    pub duration_seconds: f32,

    /// Channel count of the source before down-mixing (informational)
    pub channel_count: u16,

    /// Opaque correlation identifier, echoed in the response
    pub request_id: String,
}

impl AnalysisRequest {
    /// Build a request from a signal
    pub fn from_signal(request_id: impl Into<String>, signal: &AudioSignal) -> Self {
        Self {
            samples: signal.samples().to_vec(),
            sample_rate: signal.sample_rate(),
            duration_seconds: signal.duration_seconds(),
            channel_count: signal.channel_count(),
            request_id: request_id.into(),
        }
    }

    /// Validate the request and turn it into a signal
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for empty samples, a zero sample
    /// rate or a zero channel count
    pub fn into_signal(self) -> Result<AudioSignal, AnalysisError> {
        let signal = AudioSignal::with_channel_count(self.samples, self.sample_rate, self.channel_count)?;

        let actual = signal.duration_seconds();
        if (actual - self.duration_seconds).abs() > DURATION_TOLERANCE_SECONDS {
            log::warn!(
                "Request {}: declared duration {:.2}s but samples span {:.2}s",
                self.request_id,
                self.duration_seconds,
                actual
            );
        }

        Ok(signal)
    }
}

/// Outcome of one analysis job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Whether `tempo_bpm` and `key` are present
    pub success: bool,

    /// Identifier of the request this answers
    pub request_id: String,

    /// Tempo in BPM (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_bpm: Option<u32>,

    /// Key rendered as `"<Root> <Major|Minor>"` (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,

    /// Failure message (failure only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResponse {
    /// Successful response carrying `result`
    pub fn success(request_id: impl Into<String>, result: &AnalysisResult) -> Self {
        Self {
            success: true,
            request_id: request_id.into(),
            tempo_bpm: Some(result.tempo_bpm),
            key: Some(result.key),
            error: None,
        }
    }

    /// Failure response carrying `error`
    pub fn failure(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: request_id.into(),
            tempo_bpm: None,
            key: None,
            error: Some(error.into()),
        }
    }
}

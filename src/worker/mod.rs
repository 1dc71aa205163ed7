//! Isolated execution of analysis requests
//!
//! Analysis is CPU-bound and can take seconds, so each request runs on its
//! own OS thread and talks to the caller only through a channel. The caller
//! waits with a timeout; on timeout the analysis is cancelled, the thread is
//! given a short grace period to stop, and anything it produced is
//! discarded. Requests share nothing, so any number may run at once.
//!
//! [`serve_json_lines`] wraps the same handling in a line-oriented JSON loop
//! for process-level isolation (see the `analysis_worker` demo).

pub mod protocol;

pub use protocol::{AnalysisRequest, AnalysisResponse};

use std::io::{BufRead, Write};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::analysis::AnalysisOrchestrator;
use crate::cancel::CancelToken;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// How long a cancelled worker may take to notice before it is detached
const CANCEL_GRACE: Duration = Duration::from_secs(2);

/// Longest request-id prefix used in a thread name
const THREAD_NAME_ID_CHARS: usize = 32;

/// Caller-side worker policy
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// How long to wait for a response before giving up (default: 30 s)
    pub timeout: Duration,

    /// Configuration handed to each analysis
    pub analysis: AnalysisConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            analysis: AnalysisConfig::default(),
        }
    }
}

/// Run one request to completion on the current thread
///
/// Every outcome becomes a response; analysis errors are reported as
/// failures carrying the error message.
pub fn handle_request(request: AnalysisRequest, config: &AnalysisConfig) -> AnalysisResponse {
    handle_cancellable(request, config, None)
}

fn handle_cancellable(
    request: AnalysisRequest,
    config: &AnalysisConfig,
    cancel: Option<CancelToken>,
) -> AnalysisResponse {
    let request_id = request.request_id.clone();

    let outcome = request.into_signal().and_then(|signal| {
        let mut orchestrator = AnalysisOrchestrator::new(config.clone())?;
        if let Some(token) = cancel {
            orchestrator = orchestrator.with_cancel(token);
        }
        orchestrator.analyze(&signal)
    });

    match outcome {
        Ok(result) => {
            log::info!(
                "Request {}: {} BPM, {}",
                request_id,
                result.tempo_bpm,
                result.key
            );
            AnalysisResponse::success(request_id, &result)
        }
        Err(AnalysisError::Cancelled) => {
            log::debug!("Request {} cancelled", request_id);
            AnalysisResponse::failure(request_id, AnalysisError::Cancelled.to_string())
        }
        Err(e) => {
            log::warn!("Request {} failed: {}", request_id, e);
            AnalysisResponse::failure(request_id, e.to_string())
        }
    }
}

/// Thread name for a request; ids are opaque and may hold NUL bytes
fn thread_name(request_id: &str) -> String {
    let id: String = request_id
        .chars()
        .filter(|c| *c != '\0')
        .take(THREAD_NAME_ID_CHARS)
        .collect();
    format!("analysis-{}", id)
}

/// How a worker thread ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerExit {
    /// Answered within the timeout
    Completed,
    /// Timed out, then stopped on cancellation and was joined
    Cancelled,
    /// Timed out, then finished its analysis anyway during the grace period
    FinishedLate,
    /// Died without answering
    Crashed,
    /// Did not stop within the grace period
    Detached,
}

/// One in-flight request on a dedicated thread
#[derive(Debug)]
pub struct AnalysisWorker {
    request_id: String,
    receiver: Receiver<AnalysisResponse>,
    handle: JoinHandle<()>,
    cancel: CancelToken,
}

impl AnalysisWorker {
    /// Start analyzing `request` on a new thread
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Io` if the thread cannot be spawned
    pub fn spawn(request: AnalysisRequest, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let request_id = request.request_id.clone();
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name(thread_name(&request_id))
            .spawn(move || {
                let response = handle_cancellable(request, &config, Some(worker_cancel));
                // The caller may have timed out and dropped the receiver
                if sender.send(response).is_err() {
                    log::debug!("Response receiver gone, discarding result");
                }
            })?;

        log::debug!("Spawned analysis worker for request {}", request_id);

        Ok(Self {
            request_id,
            receiver,
            handle,
            cancel,
        })
    }

    /// Identifier of the request being analyzed
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait up to `timeout` for the response
    ///
    /// A timeout or a crashed worker yields a failure response with a generic
    /// transport message. On timeout the analysis is cancelled and the thread
    /// gets a short grace period to stop; one that does not is detached and
    /// whatever it produces later is dropped.
    pub fn wait(self, timeout: Duration) -> AnalysisResponse {
        self.finish(timeout).0
    }

    fn finish(self, timeout: Duration) -> (AnalysisResponse, WorkerExit) {
        match self.receiver.recv_timeout(timeout) {
            Ok(response) => {
                if self.handle.join().is_err() {
                    log::warn!("Worker for {} panicked after responding", self.request_id);
                }
                (response, WorkerExit::Completed)
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Request {} timed out after {:.1}s, cancelling worker",
                    self.request_id,
                    timeout.as_secs_f32()
                );
                self.cancel.cancel();

                let exit = match self.receiver.recv_timeout(CANCEL_GRACE) {
                    Ok(late) => {
                        let _ = self.handle.join();
                        if late.success {
                            WorkerExit::FinishedLate
                        } else {
                            WorkerExit::Cancelled
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        let _ = self.handle.join();
                        WorkerExit::Crashed
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        log::warn!(
                            "Worker for {} ignored cancellation, detaching",
                            self.request_id
                        );
                        WorkerExit::Detached
                    }
                };

                let err = AnalysisError::Transport("analysis timed out".to_string());
                (AnalysisResponse::failure(self.request_id, err.to_string()), exit)
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = self.handle.join();
                log::warn!("Worker for {} exited without responding", self.request_id);
                let err = AnalysisError::Transport("analysis worker crashed".to_string());
                (AnalysisResponse::failure(self.request_id, err.to_string()), WorkerExit::Crashed)
            }
        }
    }
}

/// Analyze a request in isolation and wait for it under `config.timeout`
pub fn run_isolated(request: AnalysisRequest, config: &WorkerConfig) -> AnalysisResponse {
    let request_id = request.request_id.clone();
    match AnalysisWorker::spawn(request, config.analysis.clone()) {
        Ok(worker) => worker.wait(config.timeout),
        Err(e) => {
            log::warn!("Could not start worker for {}: {}", request_id, e);
            let err = AnalysisError::Transport("could not start analysis worker".to_string());
            AnalysisResponse::failure(request_id, err.to_string())
        }
    }
}

/// Serve newline-delimited JSON requests until `reader` is exhausted
///
/// Each non-blank line must be an [`AnalysisRequest`]; each produces exactly
/// one [`AnalysisResponse`] line on `writer`. Malformed lines are answered
/// with a failure (echoing `request_id` when it can be recovered).
///
/// # Returns
///
/// Number of responses written
///
/// # Errors
///
/// Returns `AnalysisError::Io` if reading or writing fails
pub fn serve_json_lines<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    config: &WorkerConfig,
) -> Result<usize, AnalysisError> {
    let mut served = 0;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<AnalysisRequest>(&line) {
            Ok(request) => run_isolated(request, config),
            Err(e) => {
                let err = AnalysisError::from(e);
                log::warn!("Rejecting request line: {}", err);
                AnalysisResponse::failure(recover_request_id(&line), err.to_string())
            }
        };

        serde_json::to_writer(&mut writer, &response)
            .map_err(|e| AnalysisError::Io(e.to_string()))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        served += 1;
    }

    Ok(served)
}

/// Best-effort `request_id` from a line that failed to parse as a request
fn recover_request_id(line: &str) -> String {
    serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|v| v.get("request_id")?.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, samples: Vec<f32>, sample_rate: u32) -> AnalysisRequest {
        AnalysisRequest {
            duration_seconds: samples.len() as f32 / sample_rate as f32,
            samples,
            sample_rate,
            channel_count: 1,
            request_id: id.to_string(),
        }
    }

    #[test]
    fn test_handle_request_success() {
        let response = handle_request(request("ok", vec![0.0; 8000 * 2], 8000), &AnalysisConfig::default());
        assert!(response.success);
        assert_eq!(response.request_id, "ok");
        assert_eq!(response.tempo_bpm, Some(120));
        assert_eq!(response.key.map(|k| k.to_string()).as_deref(), Some("C Major"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_handle_request_failure_keeps_id() {
        let response = handle_request(request("bad", vec![0.1, f32::NAN], 8000), &AnalysisConfig::default());
        assert!(!response.success);
        assert_eq!(response.request_id, "bad");
        assert!(response.error.unwrap().contains("Numerical error"));
    }

    #[test]
    fn test_worker_round_trip() {
        let worker = AnalysisWorker::spawn(request("w1", vec![0.0; 4000], 8000), AnalysisConfig::default()).unwrap();
        assert_eq!(worker.request_id(), "w1");
        let response = worker.wait(Duration::from_secs(30));
        assert!(response.success);
        assert_eq!(response.request_id, "w1");
    }

    #[test]
    fn test_worker_timeout_is_failure() {
        // Long noisy input cannot finish in zero time
        let samples: Vec<f32> = (0..8000 * 20)
            .map(|i| (((i * 7919) % 2003) as f32 / 2003.0) - 0.5)
            .collect();
        let worker = AnalysisWorker::spawn(request("slow", samples, 8000), AnalysisConfig::default()).unwrap();
        let response = worker.wait(Duration::ZERO);
        assert!(!response.success);
        assert_eq!(response.request_id, "slow");
        assert!(response.error.unwrap().contains("timed out"));
    }

    #[test]
    fn test_serve_json_lines() {
        let good = serde_json::to_string(&request("line-1", vec![0.0; 800], 8000)).unwrap();
        let input = format!("{}\n\n{{\"request_id\":\"line-2\"}}\nnot json\n", good);
        let mut output = Vec::new();

        let served = serve_json_lines(input.as_bytes(), &mut output, &WorkerConfig::default()).unwrap();
        assert_eq!(served, 3);

        let responses: Vec<AnalysisResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert!(responses[0].success);
        assert_eq!(responses[0].request_id, "line-1");
        assert!(!responses[1].success);
        assert_eq!(responses[1].request_id, "line-2");
        assert!(!responses[2].success);
        assert_eq!(responses[2].request_id, "");
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(WorkerConfig::default().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_thread_name_drops_nul_bytes() {
        assert_eq!(thread_name("a\0b"), "analysis-ab");
        assert_eq!(thread_name(&"x".repeat(100)).len(), "analysis-".len() + 32);
    }

    #[test]
    fn test_nul_request_id_still_answered() {
        let response = run_isolated(request("x\0y", vec![0.0; 800], 8000), &WorkerConfig::default());
        assert!(response.success);
        assert_eq!(response.request_id, "x\0y");

        let line = r#"{"samples":[0.0,0.0],"sample_rate":8000,"duration_seconds":0.00025,"channel_count":1,"request_id":"a\u0000b"}"#;
        let mut output = Vec::new();
        let served = serve_json_lines(format!("{}\n", line).as_bytes(), &mut output, &WorkerConfig::default()).unwrap();
        assert_eq!(served, 1);

        let response: AnalysisResponse = serde_json::from_slice(&output).unwrap();
        assert!(response.success);
        assert_eq!(response.request_id, "a\u{0}b");
    }

    #[test]
    fn test_timed_out_worker_is_cancelled_and_joined() {
        let samples: Vec<f32> = (0i64..8000 * 60)
            .map(|i| (((i * 7919) % 2003) as f32 / 2003.0) - 0.5)
            .collect();
        let worker = AnalysisWorker::spawn(request("abandoned", samples, 8000), AnalysisConfig::default()).unwrap();

        let (response, exit) = worker.finish(Duration::from_millis(10));
        assert!(!response.success);
        assert!(response.error.unwrap().contains("timed out"));
        assert_eq!(exit, WorkerExit::Cancelled);
    }

    #[test]
    fn test_cancelled_request_reports_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        let response = handle_cancellable(request("c", vec![0.0; 8000 * 6], 8000), &AnalysisConfig::default(), Some(token));
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Analysis cancelled"));
    }
}

//! Example: Analyze multiple audio files in parallel
//!
//! Usage:
//!   cargo run --release --example analyze_batch -- [--jobs N] [--timeout SECS] [--json] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files. Each analysis runs on its own isolated
//!   worker thread and is abandoned if it exceeds the timeout.
//! - Default jobs: (available CPU threads - 1), keeping one core free for the system.

use std::env;
use std::path::Path;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tempo_key_dsp::worker::run_isolated;
use tempo_key_dsp::{AnalysisRequest, AnalysisResponse, AudioDecoder, SymphoniaDecoder, WorkerConfig};

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn analyze_path(path: &str, decoder: &SymphoniaDecoder, config: &WorkerConfig) -> AnalysisResponse {
    match decoder.decode(Path::new(path)) {
        Ok(signal) => run_isolated(AnalysisRequest::from_signal(path, &signal), config),
        Err(e) => AnalysisResponse::failure(path, format!("decode failed: {e}")),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut config = WorkerConfig::default();
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.next() {
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args.next().ok_or("--jobs requires a value")?.parse::<usize>()?;
                jobs = Some(std::cmp::max(1, v));
            }
            "--timeout" => {
                let v = args.next().ok_or("--timeout requires a value")?.parse::<f32>()?;
                config.timeout = Duration::from_secs_f32(v.max(0.0));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: analyze_batch [--jobs N] [--timeout SECS] [--json] <file1> <file2> ...\n\
                     \n\
                     --jobs N        Parallel files (default: CPU-1)\n\
                     --timeout SECS  Per-file analysis timeout (default: 30)\n\
                     --json          Emit one response object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let decoder = SymphoniaDecoder::new();

    let responses: Vec<AnalysisResponse> =
        pool.install(|| paths.par_iter().map(|p| analyze_path(p, &decoder, &config)).collect());

    for (idx, response) in responses.iter().enumerate() {
        if json {
            println!("{}", serde_json::to_string(response)?);
        } else if let (Some(bpm), Some(key)) = (response.tempo_bpm, response.key) {
            println!("[{}/{}] {}: BPM={} Key={}", idx + 1, responses.len(), response.request_id, bpm, key);
        } else {
            println!(
                "[{}/{}] {}: ERROR: {}",
                idx + 1,
                responses.len(),
                response.request_id,
                response.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let ok = responses.iter().filter(|r| r.success).count();
    eprintln!(
        "Done: ok={}/{} wall={:.0}ms",
        ok,
        responses.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}

//! Example: Out-of-process analysis worker
//!
//! Reads one JSON `AnalysisRequest` per line on stdin and writes one JSON
//! `AnalysisResponse` per line on stdout. A supervisor can run this as a
//! child process and kill it outright if it stops responding.
//!
//! Usage:
//!   cargo run --release --example analysis_worker -- [--timeout SECS] < requests.jsonl

use std::env;
use std::io::{self, BufWriter};
use std::time::Duration;

use tempo_key_dsp::worker::serve_json_lines;
use tempo_key_dsp::WorkerConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries responses only
    env_logger::init();

    let mut config = WorkerConfig::default();
    let mut args = env::args().skip(1);
    while let Some(a) = args.next() {
        if a == "--timeout" {
            let v = args.next().ok_or("--timeout requires a value")?.parse::<f32>()?;
            config.timeout = Duration::from_secs_f32(v.max(0.0));
        }
    }

    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    let served = serve_json_lines(stdin, stdout, &config)?;
    log::info!("Served {} requests", served);

    Ok(())
}

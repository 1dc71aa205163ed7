//! Example: Analyze a single audio file
//!
//! Usage:
//!   cargo run --release --example analyze_file -- [--json] <file>
//!
//! Set `RUST_LOG=debug` to see the pipeline stages as they run.

use std::env;
use std::path::Path;

use tempo_key_dsp::{AnalysisConfig, AnalysisOrchestrator, SymphoniaDecoder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let mut json = false;
    let mut path: Option<String> = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            "--help" | "-h" => {
                eprintln!("Usage: analyze_file [--json] <file>");
                return Ok(());
            }
            _ => path = Some(arg),
        }
    }

    let Some(path) = path else {
        eprintln!("ERROR: Provide an audio file path. Use --help for usage.");
        std::process::exit(2);
    };

    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig::default())?;
    let result = orchestrator.analyze_source(&SymphoniaDecoder::new(), Path::new(&path))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Analysis Results:");
    println!("  Tempo: {} BPM ({})", result.tempo_bpm, result.metadata.tempo_source);
    println!("  Key: {} ({})", result.key, result.key.numerical());
    println!("  Duration: {:.2} s @ {} Hz", result.metadata.duration_seconds, result.metadata.sample_rate);
    println!("  Processing time: {:.2} ms", result.metadata.processing_time_ms);
    if let Some(reason) = &result.metadata.fallback_reason {
        println!("  Fallback: {}", reason);
    }
    for warning in &result.metadata.warnings {
        println!("  Warning: {}", warning);
    }

    Ok(())
}

//! Integration tests for the tempo/key analysis engine

use std::f32::consts::PI;
use std::path::PathBuf;
use std::time::Duration;

use tempo_key_dsp::features::chroma::normalize_by_max;
use tempo_key_dsp::features::onset::OnsetEnvelope;
use tempo_key_dsp::worker::{run_isolated, serve_json_lines};
use tempo_key_dsp::{
    analyze, analyze_audio, AnalysisConfig, AnalysisOrchestrator, AnalysisRequest, AnalysisResponse,
    AnalysisStage, AudioDecoder, AudioSignal, Key, Mode, PitchClass, SymphoniaDecoder, TempoSource,
    WorkerConfig,
};

const SR: u32 = 44100;

/// Decaying 300 Hz bursts every `period` samples
fn click_track(period: usize, seconds: f32) -> Vec<f32> {
    let len = (seconds * SR as f32) as usize;
    let burst_len = 2205;
    let mut samples = vec![0.0f32; len];
    let mut start = 0;
    while start + burst_len < len {
        for n in 0..burst_len {
            let t = n as f32 / SR as f32;
            samples[start + n] += (2.0 * PI * 300.0 * t).sin() * (-t / 0.01).exp();
        }
        start += period;
    }
    samples
}

fn tones(freqs: &[f32], seconds: f32) -> Vec<f32> {
    (0..(seconds * SR as f32) as usize)
        .map(|i| {
            let t = i as f32 / SR as f32;
            freqs.iter().map(|f| 0.3 * (2.0 * PI * f * t).sin()).sum()
        })
        .collect()
}

/// Write mono or duplicated-stereo 16-bit PCM to a scratch WAV file
fn write_wav(name: &str, samples: &[f32], channels: u16) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tempo-key-dsp-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);

    let spec = hound::WavSpec {
        channels,
        sample_rate: SR,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(v).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

#[test]
fn test_click_track_120bpm() {
    let samples = click_track(22050, 10.0);
    let result = analyze_audio(&samples, SR, AnalysisConfig::default())
        .expect("Analysis should succeed");

    assert!(
        (118..=122).contains(&result.tempo_bpm),
        "BPM should be close to 120, got {}",
        result.tempo_bpm
    );
    assert_eq!(result.metadata.tempo_source, TempoSource::OnsetIntervals);
    assert!(result.metadata.peak_count.unwrap() >= 8);
    assert!(result.metadata.interval_count.unwrap() >= 4);
    assert!((result.metadata.duration_seconds - 10.0).abs() < 0.01);
    assert_eq!(result.metadata.sample_rate, SR);
    assert_eq!(result.metadata.stages.last(), Some(&AnalysisStage::Complete));
}

#[test]
fn test_c4_sine_has_c_root() {
    let samples = tones(&[261.63], 6.0);
    let result = analyze_audio(&samples, SR, AnalysisConfig::default()).unwrap();
    assert_eq!(result.key.root, PitchClass::C);
    assert!((60..=200).contains(&result.tempo_bpm));
}

#[test]
fn test_triads_classify() {
    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig::default()).unwrap();

    let major = AudioSignal::new(tones(&[261.63, 329.63, 392.0], 3.0), SR).unwrap();
    let detection = orchestrator.estimate_key(&major).unwrap();
    assert_eq!(detection.key, Key::new(PitchClass::C, Mode::Major));

    let minor = AudioSignal::new(tones(&[220.0, 261.63, 329.63], 3.0), SR).unwrap();
    let detection = orchestrator.estimate_key(&minor).unwrap();
    assert_eq!(detection.key, Key::new(PitchClass::A, Mode::Minor));
    assert_eq!(detection.key.to_string(), "A Minor");
}

#[test]
fn test_silence_defaults() {
    let samples = vec![0.0f32; SR as usize * 6];
    let result = analyze_audio(&samples, SR, AnalysisConfig::default()).unwrap();
    assert_eq!(result.tempo_bpm, 120);
    assert_eq!(result.key.to_string(), "C Major");
    assert_eq!(result.metadata.tempo_source, TempoSource::Autocorrelation);
    assert!(result.metadata.fallback_reason.is_some());
}

#[test]
fn test_short_input_skips_tempo_pipeline() {
    let samples = click_track(22050, 3.0);
    let result = analyze_audio(&samples, SR, AnalysisConfig::default()).unwrap();

    assert_eq!(result.tempo_bpm, 120);
    assert_eq!(result.metadata.tempo_source, TempoSource::ShortInputDefault);
    assert!(!result.metadata.stages.contains(&AnalysisStage::FramingTempo));
    assert!(result.metadata.stages.contains(&AnalysisStage::KeyDone));
    assert!(!result.metadata.warnings.is_empty());
}

#[test]
fn test_deterministic() {
    let samples = click_track(22050, 8.0);
    let signal = AudioSignal::new(samples, SR).unwrap();

    let a = analyze(&signal).unwrap();
    let b = analyze(&signal).unwrap();
    assert_eq!(a.tempo_bpm, b.tempo_bpm);
    assert_eq!(a.key, b.key);
    assert_eq!(a.metadata.key_score, b.metadata.key_score);
    assert_eq!(a.metadata.stages, b.metadata.stages);
}

#[test]
fn test_tempo_always_in_range() {
    // Pseudo-random noise, a slow pulse and a fast pulse
    let noise: Vec<f32> = (0..SR as usize * 6)
        .map(|i| ((i.wrapping_mul(2654435761) % 10007) as f32 / 10007.0) - 0.5)
        .collect();
    let inputs = [noise, click_track(66150, 12.0), click_track(8820, 6.0)];

    for samples in &inputs {
        let result = analyze_audio(samples, SR, AnalysisConfig::default()).unwrap();
        assert!(
            (60..=200).contains(&result.tempo_bpm),
            "tempo {} out of range",
            result.tempo_bpm
        );
    }
}

#[test]
fn test_underflow_falls_back_to_autocorrelation() {
    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig::default()).unwrap();

    // Three spikes: too few peaks for the interval estimate
    let mut values = vec![0.0f32; 600];
    for i in [100, 200, 300] {
        values[i] = 1.0;
    }
    let envelope = OnsetEnvelope {
        values,
        hop_size: 512,
        sample_rate: SR,
    };

    // 2 Hz pulse in the waveform
    let sr = 8000u32;
    let samples: Vec<f32> = (0..sr * 6)
        .map(|i| (2.0 * PI * 2.0 * i as f32 / sr as f32).sin())
        .collect();

    let estimate = orchestrator.resolve_tempo(&envelope, &samples, sr).unwrap();
    assert_eq!(estimate.source, TempoSource::Autocorrelation);
    assert_eq!(estimate.bpm, 120);
}

#[test]
fn test_non_finite_input_rejected() {
    let mut samples = vec![0.0f32; SR as usize];
    samples[100] = f32::INFINITY;
    assert!(analyze_audio(&samples, SR, AnalysisConfig::default()).is_err());
    assert!(analyze_audio(&[], SR, AnalysisConfig::default()).is_err());
    assert!(analyze_audio(&[0.0; 16], 0, AnalysisConfig::default()).is_err());
}

#[test]
fn test_normalization_idempotent() {
    let raw = [3.0, 0.0, 1.5, 6.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 1.0];
    let once = normalize_by_max(&raw);
    assert_eq!(once[3], 1.0);
    assert_eq!(normalize_by_max(&once), once);
    assert_eq!(normalize_by_max(&[0.0; 12]), [0.0; 12]);
}

#[test]
fn test_worker_json_round_trip() {
    let signal = AudioSignal::new(click_track(22050, 6.0), SR).unwrap();
    let request = AnalysisRequest::from_signal("track-1", &signal);
    let line = serde_json::to_string(&request).unwrap();

    let mut output = Vec::new();
    let served = serve_json_lines(format!("{}\n", line).as_bytes(), &mut output, &WorkerConfig::default())
        .unwrap();
    assert_eq!(served, 1);

    let response: AnalysisResponse = serde_json::from_slice(&output).unwrap();
    assert!(response.success);
    assert_eq!(response.request_id, "track-1");
    assert!((60..=200).contains(&response.tempo_bpm.unwrap()));
    assert!(response.key.is_some());
}

#[test]
fn test_worker_timeout() {
    let signal = AudioSignal::new(click_track(22050, 20.0), SR).unwrap();
    let config = WorkerConfig {
        timeout: Duration::ZERO,
        ..WorkerConfig::default()
    };
    let response = run_isolated(AnalysisRequest::from_signal("slow", &signal), &config);
    assert!(!response.success);
    assert_eq!(response.request_id, "slow");
    assert!(response.tempo_bpm.is_none());
    assert!(response.error.unwrap().starts_with("Transport error"));
}

#[test]
fn test_decode_wav_and_analyze() {
    let samples = click_track(22050, 10.0);
    let decoder = SymphoniaDecoder::new();
    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig::default()).unwrap();

    let mono = write_wav("clicks_mono.wav", &samples, 1);
    let signal = decoder.decode(&mono).expect("Failed to decode mono WAV");
    assert_eq!(signal.sample_rate(), SR);
    assert_eq!(signal.channel_count(), 1);
    assert_eq!(signal.len(), samples.len());

    let result = orchestrator.analyze_source(&decoder, &mono).unwrap();
    assert!((118..=122).contains(&result.tempo_bpm), "got {}", result.tempo_bpm);

    let stereo = write_wav("clicks_stereo.wav", &samples, 2);
    let signal = decoder.decode(&stereo).expect("Failed to decode stereo WAV");
    assert_eq!(signal.channel_count(), 2);
    assert_eq!(signal.len(), samples.len());

    let _ = std::fs::remove_file(mono);
    let _ = std::fs::remove_file(stereo);
}

#[test]
fn test_missing_file_is_error() {
    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig::default()).unwrap();
    let result = orchestrator.analyze_source(&SymphoniaDecoder::new(), PathBuf::from("no/such/file.wav").as_path());
    assert!(result.is_err());
}

#[test]
fn test_every_request_answered_despite_timeouts_and_odd_ids() {
    let long = AudioSignal::new(click_track(22050, 30.0), SR).unwrap();
    let mut input = String::new();
    for i in 0..3 {
        let request = AnalysisRequest::from_signal(format!("long-{}", i), &long);
        input.push_str(&serde_json::to_string(&request).unwrap());
        input.push('\n');
    }
    input.push_str(
        r#"{"samples":[0.0],"sample_rate":8000,"duration_seconds":0.000125,"channel_count":1,"request_id":"nul\u0000id"}"#,
    );
    input.push('\n');

    let config = WorkerConfig {
        timeout: Duration::from_millis(10),
        ..WorkerConfig::default()
    };
    let mut output = Vec::new();
    let served = serve_json_lines(input.as_bytes(), &mut output, &config).unwrap();
    assert_eq!(served, 4);

    let responses: Vec<AnalysisResponse> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    for response in &responses[..3] {
        assert!(!response.success);
        assert!(response.error.as_deref().unwrap().contains("timed out"));
    }
    assert_eq!(responses[3].request_id, "nul\u{0}id");
}

use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct AnalysisResult {
    bpm: Option<i64>,
    hrv_rmssd_ms: Option<f64>,
    coherence_pct: Option<f64>,
    status: String,
    ready: bool,
}

#[derive(Deserialize)]
struct AnalyzeOutput {
    result: AnalysisResult,
    coherent: bool,
    rr_ms: Vec<f64>,
}

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

fn simulate(out: &Path, bpm: &str, seconds: &str) {
    cargo_bin_cmd!("rppg")
        .args(["simulate", "--bpm", bpm, "--seconds", seconds, "--out"])
        .arg(out)
        .assert()
        .success();
}

#[test]
fn simulated_recording_reports_pulse() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let rec = dir.path().join("rec.csv");
    simulate(&rec, "60", "30");
    let text = std::fs::read_to_string(&rec)?;
    assert!(text.starts_with("timestamp_ms,brightness"));

    let out = cargo_bin_cmd!("rppg")
        .args(["analyze", "--input"])
        .arg(&rec)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: AnalyzeOutput = serde_json::from_slice(&out)?;
    let bpm = value.result.bpm.expect("bpm");
    assert!((55..=65).contains(&bpm), "bpm {bpm}");
    assert!(value.result.ready);
    assert_eq!(value.result.status, "pulse_detected");
    assert!(value.result.hrv_rmssd_ms.expect("rmssd") >= 0.0);
    let coherence = value.result.coherence_pct.expect("coherence");
    assert!((0.0..=100.0).contains(&coherence));
    assert_eq!(value.coherent, coherence > 50.0);
    assert!(value.rr_ms.len() >= 20);
    assert!(value.rr_ms.iter().all(|rr| (300.0..2000.0).contains(rr)));
    Ok(())
}

#[test]
fn config_and_trace_are_applied() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let rec = dir.path().join("rec.csv");
    simulate(&rec, "72", "20");

    let out = cargo_bin_cmd!("rppg")
        .args(["analyze", "--trace", "--input"])
        .arg(&rec)
        .arg("--config")
        .arg(workspace_root().join("test_data/pipeline.toml"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out)?;
    let traced: Vec<AnalysisResult> = text
        .lines()
        .take_while(|line| line.starts_with('{') && line.ends_with('}'))
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert!(traced.len() > 20, "only {} traced results", traced.len());
    assert!(traced.iter().all(|r| r.ready && r.bpm.is_some()));
    let last = traced.last().and_then(|r| r.bpm).expect("bpm");
    assert!((66..=78).contains(&last), "bpm {last}");
    Ok(())
}

#[test]
fn flat_recording_never_becomes_ready() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let rec = dir.path().join("flat.csv");
    let mut text = String::from("timestamp_ms,brightness\n");
    for i in 0..600 {
        text.push_str(&format!("{},{}\n", i * 33, 180.0));
    }
    std::fs::write(&rec, text)?;

    let out = cargo_bin_cmd!("rppg")
        .args(["analyze", "--input"])
        .arg(&rec)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: AnalyzeOutput = serde_json::from_slice(&out)?;
    assert!(!value.result.ready);
    assert_eq!(value.result.bpm, None);
    assert_eq!(value.result.status, "detecting");
    assert!(value.rr_ms.is_empty());
    Ok(())
}

#[test]
fn malformed_recording_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let rec = dir.path().join("bad.csv");
    std::fs::write(&rec, "timestamp_ms,brightness\n0,180\nlater,181\n")?;
    cargo_bin_cmd!("rppg")
        .args(["analyze", "--input"])
        .arg(&rec)
        .assert()
        .failure();
    Ok(())
}

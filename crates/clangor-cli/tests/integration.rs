//! Integration tests for clangor-cli.
//!
//! Tests invoke the `clangor` binary and check its output files.

use std::path::Path;
use std::process::{Command, Output};

use hound::{SampleFormat, WavReader};
use tempfile::TempDir;

/// Helper to get the path to the `clangor` binary built by cargo.
fn clangor_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_clangor"))
}

fn run(args: &[&str]) -> Output {
    clangor_bin()
        .args(args)
        .output()
        .expect("failed to run clangor")
}

fn read_wav(path: &Path) -> (hound::WavSpec, Vec<f32>) {
    let reader = WavReader::open(path).expect("output should be a WAV file");
    let spec = reader.spec();
    let samples = reader.into_samples::<f32>().map(Result::unwrap).collect();
    (spec, samples)
}

// ---------------------------------------------------------------------------
// `clangor presets`
// ---------------------------------------------------------------------------

#[test]
fn cli_presets_lists_factory_presets() {
    let output = run(&["presets"]);
    assert!(output.status.success(), "clangor presets failed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in clangor_config::FACTORY_PRESET_NAMES {
        assert!(stdout.contains(name), "listing should contain '{name}'");
    }
}

#[test]
fn cli_presets_show_prints_toml() {
    let output = run(&["presets", "show", "bell"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let preset = clangor_config::Preset::from_toml(&stdout).expect("show should print TOML");
    assert_eq!(preset.name, "Bell");
}

#[test]
fn cli_presets_export_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snare.toml");
    let path_str = path.to_str().unwrap();

    assert!(run(&["presets", "export", "snare", "-o", path_str]).status.success());
    assert!(path.exists());
    assert!(!run(&["presets", "export", "snare", "-o", path_str]).status.success());
    assert!(
        run(&["presets", "export", "snare", "-o", path_str, "--force"])
            .status
            .success()
    );
}

// ---------------------------------------------------------------------------
// `clangor matrix`
// ---------------------------------------------------------------------------

#[test]
fn cli_matrix_prints_rows_and_error() {
    let output = run(&["matrix", "hadamard", "--size", "4"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("orthogonality error"));
    let rows = stdout
        .lines()
        .filter(|line| line.contains("0.5000"))
        .count();
    assert_eq!(rows, 4, "got:\n{stdout}");
}

#[test]
fn cli_matrix_list_and_unknown_family() {
    let output = run(&["matrix", "--list"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 17);
    assert!(stdout.contains("special-orthogonal"));

    assert!(!run(&["matrix", "sparse"]).status.success());
    assert!(!run(&["matrix", "hadamard", "--size", "0"]).status.success());
}

// ---------------------------------------------------------------------------
// `clangor render`
// ---------------------------------------------------------------------------

#[test]
fn cli_render_factory_stereo() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snare.wav");

    let output = run(&[
        "render",
        "--factory",
        "snare",
        "-o",
        path.to_str().unwrap(),
        "--duration",
        "0.05",
        "--oversample",
        "1",
    ]);
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let (spec, samples) = read_wav(&path);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_format, SampleFormat::Float);
    assert_eq!(samples.len(), 2 * 2400);
    assert!(samples.iter().all(|s| s.is_finite()));
    assert!(samples.iter().any(|&s| s != 0.0));
}

#[test]
fn cli_render_mono_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.wav");
    let b = dir.path().join("b.wav");

    for path in [&a, &b] {
        let output = run(&[
            "render",
            "--factory",
            "glass_pad",
            "-o",
            path.to_str().unwrap(),
            "--mono",
            "--seed",
            "42",
            "--duration",
            "0.05",
        ]);
        assert!(output.status.success());
    }

    let (spec, left) = read_wav(&a);
    assert_eq!(spec.channels, 1);
    assert_eq!(left.len(), 2400);
    assert_eq!(read_wav(&b).1, left);
}

#[test]
fn cli_render_preset_file() {
    let dir = TempDir::new().unwrap();
    let preset_path = dir.path().join("tiny.toml");
    let wav_path = dir.path().join("tiny.wav");
    std::fs::write(
        &preset_path,
        r#"
name = "Tiny"

[instrument]
kind = "drum"
matrix_size = 4

[instrument.render]
sample_rate = 22050
duration_seconds = 0.1
oversample = "x1"
"#,
    )
    .unwrap();

    let output = run(&[
        "render",
        preset_path.to_str().unwrap(),
        "-o",
        wav_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let (spec, samples) = read_wav(&wav_path);
    assert_eq!(spec.sample_rate, 22050);
    assert_eq!(samples.len(), 2 * 2205);
}

#[test]
fn cli_render_strict_rejects_out_of_range() {
    let dir = TempDir::new().unwrap();
    let preset_path = dir.path().join("wild.toml");
    let wav_path = dir.path().join("wild.wav");
    std::fs::write(
        &preset_path,
        r#"
name = "Wild"

[instrument]
kind = "drum"
wire_mix = 7.0

[instrument.render]
duration_seconds = 0.02
oversample = 1
"#,
    )
    .unwrap();
    let preset = preset_path.to_str().unwrap();
    let wav = wav_path.to_str().unwrap();

    let output = run(&["render", preset, "-o", wav, "--strict"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("wire_mix"));
    assert!(!wav_path.exists());

    // Without --strict the value is clamped and the render goes ahead.
    assert!(run(&["render", preset, "-o", wav]).status.success());
    assert!(wav_path.exists());
}

#[test]
fn cli_render_unknown_factory_preset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("x.wav");
    let output = run(&["render", "--factory", "kazoo", "-o", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("preset not found: kazoo"));
}

#[test]
fn cli_render_requires_a_preset() {
    let output = run(&["render", "-o", "never.wav"]);
    assert!(!output.status.success());
}

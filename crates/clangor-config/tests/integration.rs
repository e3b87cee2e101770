//! Integration tests for clangor-config.
//!
//! These tests verify end-to-end functionality across modules.

use std::sync::atomic::AtomicBool;

use clangor_config::{
    ConfigError, Preset, ValidationError, factory_presets, get_factory_preset, validate_preset,
};
use clangor_synth::{Instrument, OversampleFactor, render_channel};
use tempfile::TempDir;

/// Shortens a preset so it renders quickly in a test.
fn shorten(mut preset: Preset) -> Preset {
    let render = preset.instrument.render_params_mut();
    render.oversample = OversampleFactor::X1;
    render.duration_seconds = 0.05;
    preset
}

/// Every factory preset renders finite, non-silent audio.
#[test]
fn test_factory_presets_render() {
    let never = AtomicBool::new(false);
    for preset in factory_presets() {
        let name = preset.name.clone();
        let preset = shorten(preset);
        let output = render_channel(&preset.instrument, 0, &never)
            .unwrap_or_else(|e| panic!("{name} failed to render: {e}"));

        assert_eq!(output.samples.len(), 2400, "{name}");
        assert!(output.samples.iter().all(|s| s.is_finite()), "{name}");
        assert!(output.samples.iter().any(|&s| s != 0.0), "{name} is silent");
    }
}

/// A saved and reloaded preset renders the same samples.
#[test]
fn test_saved_preset_renders_identically() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("clang.toml");

    let preset = shorten(get_factory_preset("clang").unwrap());
    preset.save(&path).unwrap();
    let loaded = Preset::load(&path).unwrap();
    assert_eq!(loaded, preset);

    let never = AtomicBool::new(false);
    let a = render_channel(&preset.instrument, 1, &never).unwrap();
    let b = render_channel(&loaded.instrument, 1, &never).unwrap();
    assert_eq!(a, b);
}

/// Out-of-range values in a preset file are reported, then clamped.
#[test]
fn test_invalid_preset_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("wild.toml");
    std::fs::write(
        &path,
        r#"
name = "Wild"

[instrument]
kind = "pad"
unison_count = 100
reverb_feedback = 1.5

[instrument.render]
duration_seconds = 0.05
oversample = 1
"#,
    )
    .unwrap();

    let preset = Preset::load(&path).unwrap();
    let err = validate_preset(&preset).unwrap_err();
    assert!(matches!(err, ValidationError::Multiple(ref errors) if errors.len() == 2));

    let config_err: ConfigError = err.into();
    assert!(config_err.to_string().contains("unison_count"));

    let preset = preset.clamped();
    let Instrument::Pad(pad) = &preset.instrument else {
        panic!("expected a pad");
    };
    assert_eq!(pad.unison_count, 16);
    assert_eq!(pad.reverb_feedback, 1.0);
    assert_eq!(pad.render.oversample, OversampleFactor::X1);

    let never = AtomicBool::new(false);
    let output = render_channel(&preset.instrument, 0, &never).unwrap();
    assert!(output.samples.iter().all(|s| s.is_finite()));
}

/// Malformed TOML surfaces as a parse error, not a panic.
#[test]
fn test_malformed_preset_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "name = \n[instrument").unwrap();

    assert!(matches!(
        Preset::load(&path),
        Err(ConfigError::TomlParse(_))
    ));
}

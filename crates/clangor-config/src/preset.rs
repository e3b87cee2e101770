//! Preset file format and operations.

use clangor_synth::Instrument;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::validation::{ValidationResult, clamp_instrument, validate_instrument};

/// A named instrument patch.
///
/// Presets are TOML files holding one instrument. Every instrument field
/// has a default, so a preset only lists the knobs it changes.
///
/// # TOML Format
///
/// ```toml
/// name = "Floor Tom"
/// description = "Low harmonic drum with a short pitch drop"
///
/// [instrument]
/// kind = "drum"
/// delay_time_hz = 80.0
/// envelope_mod_amount = -0.3
/// pitch_type = "circular-membrane-mode"
///
/// [instrument.render]
/// oversample = "x16"
/// duration_seconds = 2.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    /// Name of the preset.
    pub name: String,

    /// Optional description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The instrument and all of its parameters.
    #[serde(default)]
    pub instrument: Instrument,
}

impl Preset {
    /// Create a preset wrapping `instrument`.
    pub fn new(name: impl Into<String>, instrument: Instrument) -> Self {
        Self {
            name: name.into(),
            description: None,
            instrument,
        }
    }

    /// Create a preset with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Load a preset from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let preset: Preset = toml::from_str(&content)?;
        Ok(preset)
    }

    /// Load a preset from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the preset to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the preset to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every instrument parameter against its range.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_instrument(&self.instrument)
    }

    /// Clamp every instrument parameter into its range.
    pub fn clamped(mut self) -> Self {
        clamp_instrument(&mut self.instrument);
        self
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::new("Untitled", Instrument::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clangor_synth::{MatrixFamily, OversampleFactor, PadParams, PitchType};
    use tempfile::TempDir;

    #[test]
    fn test_preset_new() {
        let preset = Preset::new("Test Preset", Instrument::default());
        assert_eq!(preset.name, "Test Preset");
        assert!(preset.description.is_none());
        assert_eq!(preset.instrument.kind(), "drum");
    }

    #[test]
    fn test_preset_with_description() {
        let preset = Preset::default().with_description("A test preset");
        assert_eq!(preset.name, "Untitled");
        assert_eq!(preset.description, Some("A test preset".to_string()));
    }

    #[test]
    fn test_preset_from_toml() {
        let toml_str = r#"
name = "Tom"
description = "Low drum"

[instrument]
kind = "drum"
delay_time_hz = 80
matrix_size = 8
pitch_type = "circular-membrane-mode"
cross_feedback_ratio = [1.0, 0.5]

[instrument.render]
oversample = "x16"
seed = 7
"#;
        let preset = Preset::from_toml(toml_str).unwrap();
        assert_eq!(preset.name, "Tom");
        assert_eq!(preset.description.as_deref(), Some("Low drum"));

        let Instrument::Drum(drum) = &preset.instrument else {
            panic!("expected a drum");
        };
        assert_eq!(drum.delay_time_hz, 80.0);
        assert_eq!(drum.matrix_size, 8);
        assert_eq!(drum.pitch_type, PitchType::CircularMembraneMode);
        assert_eq!(drum.cross_feedback_ratio, vec![1.0, 0.5]);
        assert_eq!(drum.render.oversample, OversampleFactor::X16);
        assert_eq!(drum.render.seed, 7);
        // Unlisted knobs keep their defaults.
        assert_eq!(drum.bandpass_q, 1.0);
        assert_eq!(drum.render.sample_rate, 48000.0);
    }

    #[test]
    fn test_preset_minimal_toml() {
        let preset = Preset::from_toml("name = \"Bare\"").unwrap();
        assert_eq!(preset.instrument, Instrument::default());
    }

    #[test]
    fn test_preset_unknown_kind() {
        let toml_str = r#"
name = "Bad"

[instrument]
kind = "kazoo"
"#;
        assert!(matches!(
            Preset::from_toml(toml_str),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_preset_unknown_matrix_family() {
        let toml_str = r#"
name = "Bad"

[instrument]
kind = "pad"
reverb_matrix = "sparse"
"#;
        assert!(Preset::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_preset_toml_roundtrip() {
        let mut pad = PadParams::default();
        pad.chord_notes = vec![0, 4, 7];
        pad.reverb_matrix = MatrixFamily::Hadamard;
        pad.render.oversample = OversampleFactor::X16;
        let preset = Preset::new("Wide", Instrument::Pad(pad)).with_description("roundtrip");

        let toml_str = preset.to_toml().unwrap();
        assert!(toml_str.contains("kind = \"pad\""), "got:\n{toml_str}");
        assert!(toml_str.contains("reverb_matrix = \"hadamard\""), "got:\n{toml_str}");

        let parsed = Preset::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, preset);
    }

    #[test]
    fn test_preset_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("test.toml");

        let preset = Preset::default().with_description("saved");
        preset.save(&path).unwrap();
        assert!(path.exists());

        let loaded = Preset::load(&path).unwrap();
        assert_eq!(loaded, preset);
    }

    #[test]
    fn test_preset_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Preset::load(temp_dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_preset_validate_and_clamp() {
        let mut preset = Preset::default();
        if let Instrument::Drum(drum) = &mut preset.instrument {
            drum.fdn_mix = 5.0;
        }
        assert!(preset.validate().is_err());

        let preset = preset.clamped();
        assert!(preset.validate().is_ok());
    }
}

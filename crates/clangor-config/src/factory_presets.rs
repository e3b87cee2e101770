//! Factory presets bundled with clangor.
//!
//! These presets are always available without external files. They cover
//! the main voicings of both instruments and serve as starting points for
//! user presets.

use crate::Preset;

/// Array of factory preset names for external access.
pub static FACTORY_PRESET_NAMES: &[&str] = &[
    "init",
    "floor_tom",
    "snare",
    "bell",
    "clang",
    "glass_pad",
    "choir_pad",
];

/// TOML content for factory presets.
///
/// These are embedded at compile time and always available.
static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("init", INIT_PRESET),
    ("floor_tom", FLOOR_TOM_PRESET),
    ("snare", SNARE_PRESET),
    ("bell", BELL_PRESET),
    ("clang", CLANG_PRESET),
    ("glass_pad", GLASS_PAD_PRESET),
    ("choir_pad", CHOIR_PAD_PRESET),
];

/// Initialization preset - default drum.
const INIT_PRESET: &str = r#"
name = "Init"
description = "Default drum, every knob at its initial value"

[instrument]
kind = "drum"
"#;

/// Floor tom - low membrane with a short pitch drop.
const FLOOR_TOM_PRESET: &str = r#"
name = "Floor Tom"
description = "Low membrane modes with a short pitch bend"

[instrument]
kind = "drum"
noise_decay_seconds = 0.05
noise_lowpass_hz = 400.0
envelope_mod_amount = 0.3
envelope_attack_seconds = 0.005
envelope_decay_seconds = 0.25
matrix_size = 8
cross_feedback_gain = 0.97
delay_time_hz = 70.0
bandpass_q = 1.5
pitch_type = "circular-membrane-mode"
pitch_random_cents = 4.0
tone_slope = 0.8

[instrument.render]
duration_seconds = 2.0
decay_to = 0.1
"#;

/// Snare - bright hit with wire rattle.
const SNARE_PRESET: &str = r#"
name = "Snare"
description = "Short body with a noisy wire layer"

[instrument]
kind = "drum"
noise_decay_seconds = 0.15
noise_lowpass_hz = 2000.0
wire_frequency_hz = 180.0
wire_decay_seconds = 0.3
wire_mix = 0.6
matrix_size = 6
cross_feedback_gain = 0.9
delay_time_hz = 200.0
bandpass_cut_ratio = 0.5
bandpass_q = 2.0
pitch_type = "harmonic-plus-12"

[instrument.render]
duration_seconds = 1.0
"#;

/// Bell - inharmonic, long ring.
const BELL_PRESET: &str = r#"
name = "Bell"
description = "Prime-ratio partials with narrow bandpasses and a long tail"

[instrument]
kind = "drum"
limiter = "tanh"
noise_decay_seconds = 0.01
noise_lowpass_hz = 5000.0
matrix_size = 12
cross_feedback_gain = 0.999
cross_feedback_ratio = [1.0, 0.9, 0.8, 0.7, 0.6, 0.5]
delay_time_hz = 440.0
delay_interpolation = "cubic"
bandpass_q = 20.0
pitch_type = "prime"
pitch_random_cents = 3.0

[instrument.render]
oversample = "x16"
duration_seconds = 4.0
decay_to = 0.01
"#;

/// Clang - two colliding resonators.
const CLANG_PRESET: &str = r#"
name = "Clang"
description = "Two odd-harmonic networks coupled by collisions"

[instrument]
kind = "drum"
limiter = "limiter"
limiter_threshold = 0.9
matrix_size = 8
cross_feedback_gain = 0.99
delay_time_hz = 150.0
delay_time_mod_amount = 4.0
bandpass_q = 4.0
pitch_type = "harmonic-odd"
fdn_mix = 0.5
secondary_delay_offset = 0.58
collision_distance = 0.05

[instrument.render]
duration_seconds = 3.0
decay_to = 0.05
"#;

/// Glass pad - sparse chord with a bright reverb.
const GLASS_PAD_PRESET: &str = r#"
name = "Glass Pad"
description = "FM stack chord through a Hadamard reverb"

[instrument]
kind = "pad"
frequency_hz = 330.0
fm_index = 2.0
stack_ratio = 2.0
reverb_mix = 0.4
reverb_seconds = 0.08
reverb_matrix = "hadamard"

[instrument.render]
duration_seconds = 5.0
"#;

/// Choir pad - wide detuned unison.
const CHOIR_PAD_PRESET: &str = r#"
name = "Choir Pad"
description = "Six-voice unison across octaves with a deep flanger"

[instrument]
kind = "pad"
frequency_hz = 196.0
unison_count = 6
unison_pitch_spread_cents = 25.0
cents_randomize = 8.0
octave_randomize = 1
chord_notes = [0, 7, 14, 18]
attack_seconds = 0.6
decay_seconds = 4.0
fm_index = 0.6
flanger_taps = 8
lfo_freq_hz = 0.1
lfo_amount = 0.3
reverb_mix = 0.5
reverb_feedback = 0.95
tone_slope = 0.7

[instrument.render]
duration_seconds = 6.0
decay_to = 0.3
"#;

/// Get all factory presets.
///
/// Returns a vector of all built-in presets that ship with the library.
///
/// # Example
///
/// ```rust
/// use clangor_config::factory_presets;
///
/// let presets = factory_presets();
/// println!("Available factory presets:");
/// for preset in &presets {
///     println!("  - {}: {}", preset.name, preset.description.as_deref().unwrap_or(""));
/// }
/// ```
pub fn factory_presets() -> Vec<Preset> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(_, toml)| Preset::from_toml(toml).ok())
        .collect()
}

/// Get a factory preset by name.
///
/// Matches the preset identifier first, then the display name; both
/// comparisons are case-insensitive.
///
/// # Example
///
/// ```rust
/// use clangor_config::get_factory_preset;
///
/// let preset = get_factory_preset("floor_tom").unwrap();
/// assert_eq!(preset.name, "Floor Tom");
/// assert!(get_factory_preset("Floor Tom").is_some());
/// ```
pub fn get_factory_preset(name: &str) -> Option<Preset> {
    let name_lower = name.to_lowercase();
    for (preset_name, toml) in FACTORY_PRESETS_TOML {
        if preset_name.to_lowercase() == name_lower {
            return Preset::from_toml(toml).ok();
        }
    }
    factory_presets()
        .into_iter()
        .find(|preset| preset.name.to_lowercase() == name_lower)
}

/// Get the identifiers of all factory presets.
pub fn factory_preset_names() -> Vec<&'static str> {
    FACTORY_PRESETS_TOML.iter().map(|(name, _)| *name).collect()
}

/// Check if a preset name is a factory preset.
///
/// # Example
///
/// ```rust
/// use clangor_config::is_factory_preset;
///
/// assert!(is_factory_preset("snare"));
/// assert!(is_factory_preset("Glass Pad"));
/// assert!(!is_factory_preset("my_custom_preset"));
/// ```
pub fn is_factory_preset(name: &str) -> bool {
    get_factory_preset(name).is_some()
}

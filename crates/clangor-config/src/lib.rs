//! Presets and parameter validation for clangor instruments.
//!
//! # Features
//!
//! - **Preset System**: load and save instrument presets as TOML
//! - **Validation**: range-check every numeric knob, or clamp it into range
//! - **Factory Presets**: built-in drums and pads
//!
//! # Example
//!
//! ```rust
//! use clangor_config::{Preset, get_factory_preset};
//! use clangor_synth::{Instrument, PadParams};
//!
//! let tom = get_factory_preset("floor_tom").unwrap();
//! assert_eq!(tom.instrument.kind(), "drum");
//!
//! let pad = Preset::new("My Pad", Instrument::Pad(PadParams::default()))
//!     .with_description("A custom pad");
//! assert!(pad.validate().is_ok());
//! let toml = pad.to_toml().unwrap();
//! assert_eq!(Preset::from_toml(&toml).unwrap(), pad);
//! ```

mod error;
mod preset;

/// Parameter range validation and clamping.
pub mod validation;

/// Factory presets bundled with the library.
pub mod factory_presets;

pub use error::ConfigError;
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_preset_names, factory_presets, get_factory_preset,
    is_factory_preset,
};
pub use preset::Preset;
pub use validation::{
    ValidationError, ValidationResult, clamp_drum, clamp_instrument, clamp_pad, clamp_render,
    clamp_value, validate_drum, validate_instrument, validate_pad, validate_preset,
    validate_render,
};

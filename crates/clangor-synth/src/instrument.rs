//! Instrument selection.

use serde::{Deserialize, Serialize};

use crate::RenderParams;
use crate::drum::DrumParams;
use crate::pad::PadParams;

/// Every instrument the renderer can play, tagged by `kind` in TOML.
///
/// ```toml
/// [instrument]
/// kind = "drum"
/// matrix_size = 8
///
/// [instrument.render]
/// duration_seconds = 2.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Instrument {
    /// FDN percussion.
    Drum(DrumParams),
    /// FM pad with flanger and reverb.
    Pad(PadParams),
}

impl Default for Instrument {
    fn default() -> Self {
        Self::Drum(DrumParams::default())
    }
}

impl Instrument {
    /// Tag used in presets.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Drum(_) => "drum",
            Self::Pad(_) => "pad",
        }
    }

    /// Render-wide settings.
    pub fn render_params(&self) -> &RenderParams {
        match self {
            Self::Drum(p) => &p.render,
            Self::Pad(p) => &p.render,
        }
    }

    /// Mutable render-wide settings.
    pub fn render_params_mut(&mut self) -> &mut RenderParams {
        match self {
            Self::Drum(p) => &mut p.render,
            Self::Pad(p) => &mut p.render,
        }
    }
}

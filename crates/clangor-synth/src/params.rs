//! Render settings shared by every instrument.

use clangor_core::{OversampleFactor, output_length};
use serde::{Deserialize, Serialize};

/// Highest internal rate a render may run at, 48 kHz at 64× oversampling.
pub const MAX_UP_RATE: f64 = 3_072_000.0;

/// Render-wide settings, the `[instrument.render]` table of a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Output sample rate in Hz.
    pub sample_rate: f64,
    /// Internal oversampling factor.
    #[serde(with = "crate::serde_str")]
    pub oversample: OversampleFactor,
    /// Base seed for every random draw of the render.
    pub seed: u64,
    /// Offsets the seed per channel so left and right differ.
    pub stereo_seed: bool,
    /// Output length in seconds.
    pub duration_seconds: f64,
    /// Gain reached at the last sample by the post-render fade; 1 disables
    /// the fade.
    pub decay_to: f64,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            oversample: OversampleFactor::X2,
            seed: 0,
            stereo_seed: true,
            duration_seconds: 1.0,
            decay_to: 1.0,
        }
    }
}

impl RenderParams {
    /// Internal sample rate, `sample_rate × fold`.
    pub fn up_rate(&self) -> f64 {
        self.sample_rate * self.oversample.fold() as f64
    }

    /// Output samples per channel.
    pub fn output_length(&self) -> usize {
        output_length(self.sample_rate, self.duration_seconds)
    }
}

//! Clangor Synth - instruments and render driver
//!
//! This crate turns [`clangor_core`] building blocks into playable
//! instruments and renders them to output-rate sample buffers.
//!
//! # Instruments
//!
//! - [`DrumVoice`] / [`DrumParams`] - noise burst through allpass diffusers
//!   into a bandpassed FDN, optionally two FDNs coupled by collisions
//! - [`PadVoice`] / [`PadParams`] - unison × chord × FM-stack oscillators
//!   through a multi-tap flanger and an 8-tap FDN reverb
//!
//! Both parameter structs are `serde` types with defaults for every field,
//! wrapped in the tagged [`Instrument`] enum.
//!
//! # Rendering
//!
//! - [`render_channel`] - one channel, with cooperative cancellation
//! - [`render_stereo`] - both channels on scoped worker threads
//!
//! Every channel builds its own voice from a seed derived with
//! [`channel_seed`](clangor_core::channel_seed), so renders are
//! deterministic and channels share no mutable state.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::AtomicBool;
//!
//! use clangor_synth::{DrumParams, Instrument, OversampleFactor, render_channel};
//!
//! let mut params = DrumParams::default();
//! params.render.oversample = OversampleFactor::X1;
//! params.render.duration_seconds = 0.05;
//!
//! let cancel = AtomicBool::new(false);
//! let output = render_channel(&Instrument::Drum(params), 0, &cancel).unwrap();
//! assert_eq!(output.samples.len(), 2400);
//! ```

pub mod drum;
pub mod error;
pub mod instrument;
pub mod pad;
pub mod params;
pub mod pitch;
pub mod render;
mod serde_str;
pub mod voice;

pub use drum::{DrumParams, DrumVoice, MAX_MATRIX_SIZE};
pub use error::RenderError;
pub use instrument::Instrument;
pub use pad::{JUST_INTONATION, PadParams, PadVoice, REVERB_TAPS, ReverbTap};
pub use params::{MAX_UP_RATE, RenderParams};
pub use pitch::{PitchSeries, PitchType, UnknownPitchType, prime_ratios};
pub use render::{RenderOutput, apply_decay, render_channel, render_stereo, render_voice};
pub use voice::Voice;

pub use clangor_core::{Interpolation, LimiterKind, MatrixFamily, OversampleFactor};

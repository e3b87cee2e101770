//! Clangor Core - feedback delay network resonators
//!
//! This crate holds the sample-level machinery behind clangor's percussive
//! and pad instruments: a seeded random source, filtered delay lines,
//! coupling matrices, an FDN with a divergence guard, collision coupling
//! between two networks, and oversampled rendering with decimation.
//!
//! # Building Blocks
//!
//! ## Randomness
//!
//! - [`RandomStream`] - seeded PCG stream with uniform, exponential, and
//!   normal draws
//! - [`channel_seed`] - per-channel seed derivation for stereo renders
//!
//! ## Delay Primitives
//!
//! - [`DelayLine`] - fractional ring-buffer delay (none/linear/cubic)
//! - [`FilteredDelayLine`] - delay with an SVF in the loop, log-domain time
//!   modulation, and slew-limited input-driven pitch drop
//! - [`MultiTapDelay`] - shared buffer read at several times
//! - [`Allpass`], [`SerialAllpass`] - Schroeder diffusers
//!
//! ## Networks
//!
//! - [`CouplingMatrix`] / [`MatrixFamily`] - 17 generators, most orthogonal
//! - [`FdnCore`] - N taps coupled through a matrix, with a [`CrossGainGuard`]
//! - [`CoupledFdn`] - two networks exchanging collision impulses
//!
//! ## Rendering
//!
//! - [`MultirateContext`] - runs a source at `fold × sample_rate` and
//!   decimates to the output rate
//! - [`OutputLimiter`] - bypass, tanh, or look-ahead brickwall limiting
//!
//! ## Utilities
//!
//! - Filters: [`Svf`], [`Biquad`], [`HighShelf`], [`SlopeFilter`],
//!   [`ComplexLowpass`]
//! - Smoothers: [`EmaFilter`], [`DoubleEmaFilter`], [`EmaHighpass`],
//!   [`RateLimiter`]
//! - Envelopes: [`DoubleEmaAdEnvelope`], [`ExpDecay`],
//!   [`DelayedDecayEnvelope`]
//! - Oscillators: [`SineLfo`], [`FmPair`]
//!
//! # no_std Support
//!
//! The crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature:
//!
//! ```toml
//! [dependencies]
//! clangor-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use clangor_core::{
//!     CouplingMatrix, CrossGainGuard, FdnCore, FilteredDelayLine, FilteredDelayParams,
//!     MatrixFamily,
//! };
//!
//! let taps: Vec<_> = [101.0, 149.0, 211.0, 263.0]
//!     .iter()
//!     .map(|&delay_samples| {
//!         FilteredDelayLine::new(FilteredDelayParams {
//!             delay_samples,
//!             cutoff: 1.0 / delay_samples,
//!             q: 4.0,
//!             ..Default::default()
//!         })
//!     })
//!     .collect();
//! let matrix = CouplingMatrix::build(MatrixFamily::Hadamard, 4, 7);
//! let guard = CrossGainGuard::new(0.9, 48000.0, 1, 4);
//! let mut fdn = FdnCore::new(taps, matrix, guard);
//!
//! let out: Vec<f64> = (0..1000)
//!     .map(|i| fdn.process(if i == 0 { 1.0 } else { 0.0 }, 0.0))
//!     .collect();
//! assert!(out.iter().all(|v| v.is_finite()));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod allpass;
pub mod collision;
pub mod delay;
pub mod envelope;
pub mod fdn;
pub mod filter;
pub mod limiter;
pub mod math;
pub mod matrix;
pub mod multirate;
pub mod oscillator;
pub mod random;
pub mod smoother;

pub use allpass::{Allpass, SerialAllpass};
pub use collision::{CollisionPair, CoupledFdn, EnergyStore, solve_collision};
pub use delay::{
    DelayLine, FilterPlacement, FilteredDelayLine, FilteredDelayParams, Interpolation,
    MAX_DELAY_SAMPLES, MultiTapDelay, UnknownInterpolation,
};
pub use envelope::{DelayedDecayEnvelope, DoubleEmaAdEnvelope, ExpDecay};
pub use fdn::{CrossGainGuard, DelayTap, FdnCore};
pub use filter::{Biquad, ComplexLowpass, HighShelf, SlopeFilter, Svf, SvfMode, SvfOutputs};
pub use limiter::{Limiter, LimiterKind, OutputLimiter, UnknownLimiter};
pub use math::{
    EPSILON, amp_to_db, cents_to_ratio, db_to_amp, exponential_map, flush_denormal, lagrange3,
    lerp, next_prime, uniform_int_map, uniform_map,
};
pub use matrix::{CouplingMatrix, MatrixFamily, UnknownFamily};
pub use multirate::{
    HalfBandIir, MultirateContext, OversampleFactor, SosFilter, UnsupportedFactor, output_length,
};
pub use oscillator::{FmPair, SineLfo};
pub use random::{RandomStream, channel_seed};
pub use smoother::{DoubleEmaFilter, EmaFilter, EmaHighpass, RateLimiter};

//! Filters used inside the delay paths and the output stage.
//!
//! All cutoffs are normalized frequencies (cycles per sample) because the
//! engine runs at a variable oversampled rate and every caller already
//! divides by that rate.
//!
//! # Types
//!
//! - [`Svf`] - TPT state-variable filter with per-sample cutoff and Q
//! - [`Biquad`] - Direct Form I biquad, RBJ coefficients via [`lowpass_coefficients`]
//! - [`HighShelf`] / [`SlopeFilter`] - constant per-octave spectral tilt
//! - [`ComplexLowpass`] - complex one-pole resonator for colouring noise
//!
//! # Reference
//!
//! Zavalishin, "The Art of VA Filter Design", rev. 2.1.2 (2018), Chapter 3.

use core::f64::consts::{PI, TAU};

use libm::{cos, sin, tan};

use crate::math::flush_denormal;

/// Lowest normalized cutoff accepted by [`Svf`].
pub const MIN_CUTOFF: f64 = 1e-6;
/// Highest normalized cutoff accepted by [`Svf`] (just under Nyquist).
pub const MAX_CUTOFF: f64 = 0.4999;
/// Lowest Q accepted by [`Svf`].
pub const MIN_Q: f64 = 1e-3;

/// Output mode selector for [`Svf::process_mode`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SvfMode {
    /// 12 dB/oct lowpass
    Lowpass,
    /// Bandpass normalized to unity gain at the center frequency
    #[default]
    Bandpass,
    /// 12 dB/oct highpass
    Highpass,
}

/// All simultaneous outputs of one [`Svf`] step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SvfOutputs {
    /// Lowpass output
    pub lowpass: f64,
    /// Unity-peak bandpass output
    pub bandpass: f64,
    /// Highpass output
    pub highpass: f64,
}

/// Topology-preserving state-variable filter.
///
/// Coefficients are recomputed from the cutoff and Q passed to every call,
/// so cutoff can be modulated per sample without zipper artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Svf {
    ic1eq: f64,
    ic2eq: f64,
}

impl Svf {
    /// Creates a filter with cleared state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the integrator state.
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    /// Processes one sample and returns every output.
    ///
    /// `cutoff` is clamped to [`MIN_CUTOFF`]..=[`MAX_CUTOFF`] and `q` is
    /// floored at [`MIN_Q`], so degenerate modulation can't blow the
    /// coefficients up.
    #[inline]
    pub fn process(&mut self, input: f64, cutoff: f64, q: f64) -> SvfOutputs {
        let cutoff = if cutoff.is_finite() {
            cutoff.clamp(MIN_CUTOFF, MAX_CUTOFF)
        } else {
            MAX_CUTOFF
        };
        let g = tan(PI * cutoff);
        let k = 1.0 / q.max(MIN_Q);

        let v3 = input - self.ic2eq;
        let v1 = (g * v3 + self.ic1eq) / (1.0 + g * (g + k));
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = flush_denormal(2.0 * v1 - self.ic1eq);
        self.ic2eq = flush_denormal(2.0 * v2 - self.ic2eq);

        SvfOutputs {
            lowpass: v2,
            bandpass: k * v1,
            highpass: input - k * v1 - v2,
        }
    }

    /// Processes one sample and returns the output selected by `mode`.
    #[inline]
    pub fn process_mode(&mut self, input: f64, cutoff: f64, q: f64, mode: SvfMode) -> f64 {
        let out = self.process(input, cutoff, q);
        match mode {
            SvfMode::Lowpass => out.lowpass,
            SvfMode::Bandpass => out.bandpass,
            SvfMode::Highpass => out.highpass,
        }
    }
}

/// Calculates RBJ cookbook lowpass coefficients.
///
/// `cutoff` is normalized (cycles per sample). Returns
/// `(b0, b1, b2, a0, a1, a2)`.
pub fn lowpass_coefficients(cutoff: f64, q: f64) -> (f64, f64, f64, f64, f64, f64) {
    let omega = TAU * cutoff;
    let cos_omega = cos(omega);
    let alpha = sin(omega) / (2.0 * q);

    let b0 = (1.0 - cos_omega) / 2.0;
    let b1 = 1.0 - cos_omega;
    let b2 = (1.0 - cos_omega) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// Second-order IIR section, Direct Form I.
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

impl Biquad {
    /// Creates a passthrough biquad.
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Sets the coefficients, normalizing by `a0`.
    pub fn set_coefficients(&mut self, b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = flush_denormal(output);

        output
    }

    /// Clears the state.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// First-order high shelf: unity gain at DC, `gain` at Nyquist.
#[derive(Debug, Clone, Copy)]
pub struct HighShelf {
    b0: f64,
    b1: f64,
    a1: f64,
    x1: f64,
    y1: f64,
}

impl HighShelf {
    /// Creates a shelf centered at normalized frequency `cutoff`.
    pub fn new(cutoff: f64, gain: f64) -> Self {
        let k = tan(PI * cutoff.clamp(MIN_CUTOFF, 0.49));
        let norm = 1.0 / (1.0 + k);
        Self {
            b0: (gain + k) * norm,
            b1: (k - gain) * norm,
            a1: (k - 1.0) * norm,
            x1: 0.0,
            y1: 0.0,
        }
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let y = self.b0 * input + self.b1 * self.x1 - self.a1 * self.y1;
        self.x1 = input;
        self.y1 = flush_denormal(y);
        y
    }
}

/// Cascade of first-order high shelves one octave apart.
///
/// Each shelf contributes `slope` of gain above its corner, so the cascade
/// tilts the spectrum by roughly `slope` per octave from `start_hz` up.
/// `slope = 1` is flat; `slope < 1` darkens.
#[derive(Debug, Clone)]
pub struct SlopeFilter {
    shelves: [HighShelf; Self::STAGES],
}

impl SlopeFilter {
    /// Number of octave-spaced shelves (1 kHz to 16 kHz).
    pub const STAGES: usize = 5;

    /// Creates the cascade at `sample_rate` starting from `start_hz`.
    pub fn new(sample_rate: f64, start_hz: f64, slope: f64) -> Self {
        let mut shelves = [HighShelf::new(0.25, 1.0); Self::STAGES];
        let mut hz = start_hz;
        for shelf in &mut shelves {
            *shelf = HighShelf::new(hz / sample_rate, slope);
            hz *= 2.0;
        }
        Self { shelves }
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.shelves.iter_mut().fold(input, |x, s| s.process(x))
    }
}

/// One-pole complex resonator used as a coloured lowpass.
///
/// The real part of `y[n] = b·(x[n] + x[n−1]) + a·y[n−1]`, with complex
/// pole `a = R·e^{i2πfc}`. `radius` is clamped to `[0, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct ComplexLowpass {
    a_re: f64,
    a_im: f64,
    b_re: f64,
    b_im: f64,
    x1: f64,
    y_re: f64,
    y_im: f64,
}

impl ComplexLowpass {
    /// Creates the resonator at normalized `cutoff` with pole radius `radius`.
    pub fn new(cutoff: f64, radius: f64) -> Self {
        let radius = radius.clamp(0.0, 0.9999);
        let theta = TAU * cutoff;
        let a_re = radius * cos(theta);
        let a_im = radius * sin(theta);
        Self {
            a_re,
            a_im,
            b_re: (1.0 - a_re) / 2.0,
            b_im: -a_im / 2.0,
            x1: 0.0,
            y_re: 0.0,
            y_im: 0.0,
        }
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let sum = input + self.x1;
        let re = self.b_re * sum + self.a_re * self.y_re - self.a_im * self.y_im;
        let im = self.b_im * sum + self.a_re * self.y_im + self.a_im * self.y_re;
        self.y_re = flush_denormal(re);
        self.y_im = flush_denormal(im);
        self.x1 = input;
        self.y_re
    }
}

//! One-pole smoothers and the slew-rate limiter.
//!
//! The exponential moving average (EMA) family uses the matched one-pole
//! coefficient
//!
//! ```text
//! y  = 1 − cos(2π·fc)
//! kp = √((y + 2)·y) − y
//! ```
//!
//! which places the −3 dB point exactly at the normalized cutoff `fc`
//! (cycles per sample, `0 < fc < 0.5`).

use core::f64::consts::TAU;

use libm::{cos, sqrt};

use crate::math::EPSILON;

/// One-pole coefficient for a normalized cutoff in cycles per sample.
#[inline]
pub fn cutoff_to_kp(cutoff: f64) -> f64 {
    let y = 1.0 - cos(TAU * cutoff);
    sqrt((y + 2.0) * y) - y
}

/// One-pole coefficient whose time constant is `samples` long.
///
/// Times shorter than [`EPSILON`] give `kp = 1` (no smoothing).
#[inline]
pub fn time_to_kp(samples: f64) -> f64 {
    if samples < EPSILON {
        return 1.0;
    }
    cutoff_to_kp(1.0 / samples)
}

/// Single-pole lowpass.
#[derive(Debug, Clone, Copy)]
pub struct EmaFilter {
    kp: f64,
    value: f64,
}

impl Default for EmaFilter {
    fn default() -> Self {
        Self { kp: 1.0, value: 0.0 }
    }
}

impl EmaFilter {
    /// Sets the cutoff as a normalized frequency in `[0, 0.5]`.
    pub fn set_cutoff(&mut self, cutoff: f64) {
        self.kp = cutoff_to_kp(cutoff);
    }

    /// Sets the time constant in samples.
    pub fn set_time(&mut self, samples: f64) {
        self.kp = time_to_kp(samples);
    }

    /// Resets the state to `value`.
    pub fn reset(&mut self, value: f64) {
        self.value = value;
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.value += self.kp * (input - self.value);
        self.value
    }
}

/// Two cascaded one-pole lowpasses sharing one coefficient.
///
/// The cascade has an S-shaped step response, which is why it doubles as
/// an attack/decay curve generator in [`crate::envelope`].
#[derive(Debug, Clone, Copy)]
pub struct DoubleEmaFilter {
    kp: f64,
    v1: f64,
    v2: f64,
}

impl Default for DoubleEmaFilter {
    fn default() -> Self {
        Self {
            kp: 1.0,
            v1: 0.0,
            v2: 0.0,
        }
    }
}

impl DoubleEmaFilter {
    /// Sets the cutoff as a normalized frequency in `[0, 0.5]`.
    pub fn set_cutoff(&mut self, cutoff: f64) {
        self.kp = cutoff_to_kp(cutoff);
    }

    /// Sets the time constant in samples.
    pub fn set_time(&mut self, samples: f64) {
        self.kp = time_to_kp(samples);
    }

    /// Resets both stages to `value`.
    pub fn reset(&mut self, value: f64) {
        self.v1 = value;
        self.v2 = value;
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.v1 += self.kp * (input - self.v1);
        self.v2 += self.kp * (self.v1 - self.v2);
        self.v2
    }
}

/// One-pole highpass (input minus its EMA).
#[derive(Debug, Clone, Copy)]
pub struct EmaHighpass {
    kp: f64,
    v1: f64,
}

impl Default for EmaHighpass {
    fn default() -> Self {
        Self { kp: 1.0, v1: 0.0 }
    }
}

impl EmaHighpass {
    /// Sets the cutoff as a normalized frequency in `[0, 0.5]`.
    pub fn set_cutoff(&mut self, cutoff: f64) {
        self.kp = cutoff_to_kp(cutoff);
    }

    /// Resets the state.
    pub fn reset(&mut self) {
        self.v1 = 0.0;
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.v1 += self.kp * (input - self.v1);
        input - self.v1
    }
}

/// Moves `value` toward `target` by at most `rate` per call.
///
/// Used on delay-time modulation so a sudden jump in the modulation target
/// turns into a bounded ramp.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimiter {
    value: f64,
    target: f64,
}

impl RateLimiter {
    /// Jumps both value and target to `value`.
    pub fn reset(&mut self, value: f64) {
        self.value = value;
        self.target = value;
    }

    /// Sets a new target without moving the output.
    #[inline]
    pub fn push(&mut self, target: f64) {
        self.target = target;
    }

    /// Advances one step of at most `rate` and returns the new value.
    #[inline]
    pub fn process(&mut self, rate: f64) -> f64 {
        let diff = self.target - self.value;
        if diff > rate {
            self.value += rate;
        } else if diff < -rate {
            self.value -= rate;
        } else {
            self.value = self.target;
        }
        self.value
    }

    /// Current output.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }
}

//! Scalar helpers shared by every stage of the engine.
//!
//! # Mapping
//!
//! Randomized parameter derivation maps a uniform draw `u ∈ [0, 1)` onto a
//! target range:
//!
//! - [`uniform_map`] - linear mapping onto `[lo, hi)`
//! - [`uniform_int_map`] - integer mapping onto `[lo, hi]` (inclusive)
//! - [`exponential_map`] - log-uniform mapping onto `[lo, hi)`, for
//!   frequencies and times
//!
//! # Interpolation
//!
//! - [`lerp`] - linear crossfade
//! - [`lagrange3`] - 4-point, third-order Lagrange interpolation
//!
//! # Tuning
//!
//! - [`next_prime`] - prime search used by the prime pitch series
//! - [`CIRCULAR_MEMBRANE_MODES`] - modal ratios of an ideal circular membrane

use libm::{exp, exp2, log, log10};

/// Machine epsilon used as the floor for every guarded division.
pub const EPSILON: f64 = f64::EPSILON;

/// Ratios of the first 16 modes of an ideal circular membrane, relative to
/// the fundamental (Bessel function zeros, rounded to 3 decimals).
pub const CIRCULAR_MEMBRANE_MODES: [f64; 16] = [
    1.000, 1.594, 2.136, 2.296, 2.653, 2.918, 3.156, 3.501, 3.600, 3.652, 4.060, 4.154, 4.231,
    4.601, 4.610, 4.832,
];

/// Linear interpolation: `a + t·(b − a)`.
///
/// ```rust
/// use clangor_core::math::lerp;
///
/// assert_eq!(lerp(1.0, 3.0, 0.5), 2.0);
/// ```
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// Maps `u ∈ [0, 1)` linearly onto `[lo, hi)`.
#[inline]
pub fn uniform_map(u: f64, lo: f64, hi: f64) -> f64 {
    lo + u * (hi - lo)
}

/// Maps `u ∈ [0, 1)` onto the integers `lo..=hi`.
#[inline]
pub fn uniform_int_map(u: f64, lo: i64, hi: i64) -> i64 {
    let span = (hi - lo + 1) as f64;
    (libm::floor(lo as f64 + u * span) as i64).clamp(lo, hi.max(lo))
}

/// Maps `u ∈ [0, 1)` log-uniformly onto `[lo, hi)`.
///
/// Both bounds must be positive; non-positive bounds are floored at
/// [`EPSILON`] so the logarithm stays finite.
#[inline]
pub fn exponential_map(u: f64, lo: f64, hi: f64) -> f64 {
    let log_lo = log(lo.max(EPSILON));
    let log_hi = log(hi.max(EPSILON));
    exp(log_lo + u * (log_hi - log_lo))
}

/// Third-order Lagrange interpolation through four equally spaced points.
///
/// The points sit at positions `-1, 0, 1, 2`; `t ∈ [0, 1)` is the fractional
/// position between `y1` and `y2`.
#[inline]
pub fn lagrange3(y0: f64, y1: f64, y2: f64, y3: f64, t: f64) -> f64 {
    let u = 1.0 + t;
    let d0 = t - 1.0;
    let d1 = t - 2.0;

    let c0 = -t * d0 * d1 / 6.0;
    let c1 = u * d0 * d1 / 2.0;
    let c2 = -u * t * d1 / 2.0;
    let c3 = u * t * d0 / 6.0;
    c0 * y0 + c1 * y1 + c2 * y2 + c3 * y3
}

/// Returns the smallest prime strictly greater than `n`.
pub fn next_prime(n: u64) -> u64 {
    let mut candidate = n + 1;
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

/// Trial-division primality test.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Converts a pitch offset in cents to a frequency ratio.
#[inline]
pub fn cents_to_ratio(cents: f64) -> f64 {
    exp2(cents / 1200.0)
}

/// Converts decibels to linear amplitude.
#[inline]
pub fn db_to_amp(db: f64) -> f64 {
    libm::pow(10.0, db / 20.0)
}

/// Converts linear amplitude to decibels. Silence maps to −∞ clamped at
/// −400 dB.
#[inline]
pub fn amp_to_db(amp: f64) -> f64 {
    (20.0 * log10(amp.abs().max(1e-20))).max(-400.0)
}

/// Flushes values in the f64 subnormal neighbourhood to zero.
///
/// Applied to recursive filter state where a decaying signal would
/// otherwise linger in the subnormal range.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f64) -> f64 {
    if x.abs() < 1e-30 { 0.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_int_map_inclusive() {
        assert_eq!(uniform_int_map(0.0, 0, 3), 0);
        assert_eq!(uniform_int_map(0.999, 0, 3), 3);
        assert_eq!(uniform_int_map(0.5, 2, 2), 2);
    }

    #[test]
    fn test_exponential_map_endpoints() {
        assert!((exponential_map(0.0, 0.01, 1.0) - 0.01).abs() < 1e-12);
        assert!((exponential_map(0.5, 0.01, 1.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_lagrange3_reproduces_cubic() {
        // A cubic through the four nodes is reproduced exactly.
        let f = |x: f64| 0.5 * x * x * x - x * x + 2.0 * x - 1.0;
        for &t in &[0.0, 0.25, 0.5, 0.9] {
            let y = lagrange3(f(-1.0), f(0.0), f(1.0), f(2.0), t);
            assert!((y - f(t)).abs() < 1e-12, "t={t}: {y} vs {}", f(t));
        }
    }

    #[test]
    fn test_next_prime() {
        assert_eq!(next_prime(2), 3);
        assert_eq!(next_prime(3), 5);
        assert_eq!(next_prime(13), 17);
        assert_eq!(next_prime(0), 2);
    }

    #[test]
    fn test_db_round_trip() {
        assert!((db_to_amp(-6.0206) - 0.5).abs() < 1e-4);
        assert!((amp_to_db(0.1) + 20.0).abs() < 1e-9);
        assert_eq!(amp_to_db(0.0), -400.0);
    }

    #[test]
    fn test_cents_to_ratio_octave() {
        assert!((cents_to_ratio(1200.0) - 2.0).abs() < 1e-12);
        assert!((cents_to_ratio(0.0) - 1.0).abs() < 1e-12);
    }
}

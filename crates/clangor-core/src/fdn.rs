//! Feedback delay network with an adaptive cross-gain guard.
//!
//! # Per-sample update
//!
//! ```text
//! swap(front, back)
//! front    = M · back
//! front[i] = tap_i.process(input / N + g · front[i], modulation)
//! total    = Σ front[i]
//! ```
//!
//! `front` and `back` are two owned buffers whose roles swap every sample,
//! so the matrix always reads the previous step's outputs while writing the
//! new ones.
//!
//! # Divergence guard
//!
//! When `|total|` exceeds the threshold (N by default) the cross gain `g`
//! shrinks: by `0.85^(1/fold)` per sample when `|total| > 100`, otherwise
//! by a slow rate that takes about 1024 peak-hold windows to reach −313 dB.
//! Below the threshold the gain holds, or relaxes back toward its base when
//! recovery is enabled. The gain never leaves `[min(1e-4, base), base]`.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use libm::{log, pow};

use crate::delay::FilteredDelayLine;
use crate::math::EPSILON;
use crate::matrix::CouplingMatrix;

/// Output magnitude above which the guard switches to its fast rate.
pub const FAST_GUARD_LEVEL: f64 = 100.0;
/// Lowest cross gain the guard drives toward.
pub const MIN_CROSS_GAIN: f64 = 1e-4;

/// One delay path of an [`FdnCore`].
pub trait DelayTap {
    /// Processes one sample with log-domain modulation `modulation`.
    fn process(&mut self, input: f64, modulation: f64) -> f64;

    /// Clears all internal state.
    fn reset(&mut self);
}

impl DelayTap for FilteredDelayLine {
    #[inline]
    fn process(&mut self, input: f64, modulation: f64) -> f64 {
        FilteredDelayLine::process(self, input, modulation)
    }

    fn reset(&mut self) {
        FilteredDelayLine::reset(self);
    }
}

/// Adaptive cross-gain state.
#[derive(Debug, Clone, Copy)]
pub struct CrossGainGuard {
    base: f64,
    gain: f64,
    min_bound: f64,
    threshold: f64,
    fast_rate: f64,
    slow_rate: f64,
    recovery_rate: Option<f64>,
}

impl CrossGainGuard {
    /// Creates a guard for an N-tap network running at `sample_rate` with
    /// oversampling `fold`.
    ///
    /// - fast rate `0.85^(1/fold)`
    /// - slow rate `ε^(1/(1024·h))` with peak-hold `h = 128/48000 · sample_rate`
    /// - threshold `N`
    pub fn new(base: f64, sample_rate: f64, fold: usize, taps: usize) -> Self {
        let base = if base.is_finite() { base.max(0.0) } else { 0.0 };
        let fold = fold.max(1) as f64;
        let peak_hold = (128.0 / 48000.0 * sample_rate).max(1.0);
        Self {
            base,
            gain: base,
            min_bound: MIN_CROSS_GAIN.min(base),
            threshold: taps.max(1) as f64,
            fast_rate: pow(0.85, 1.0 / fold),
            slow_rate: pow(EPSILON, 1.0 / (1024.0 * peak_hold)),
            recovery_rate: None,
        }
    }

    /// Overrides the energy threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.abs().max(EPSILON);
        self
    }

    /// Lets the gain relax back toward base while the output stays below
    /// threshold; the gap shrinks to ε after `samples` samples. Zero (or
    /// negative) disables recovery.
    pub fn with_recovery(mut self, samples: f64) -> Self {
        self.recovery_rate = (samples.is_finite() && samples >= 1.0)
            .then(|| libm::exp(log(EPSILON) / samples));
        self
    }

    /// Current cross gain.
    #[inline]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Base (maximum) cross gain.
    pub fn base(&self) -> f64 {
        self.base
    }

    /// Lowest gain the guard can reach.
    pub fn min_bound(&self) -> f64 {
        self.min_bound
    }

    /// Energy threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Updates the gain from this sample's aggregate output.
    #[inline]
    pub fn update(&mut self, total: f64) {
        let level = if total.is_finite() { total.abs() } else { f64::INFINITY };
        if level > self.threshold {
            self.gain *= if level > FAST_GUARD_LEVEL {
                self.fast_rate
            } else {
                self.slow_rate
            };
        } else if let Some(rate) = self.recovery_rate {
            self.gain = self.base - (self.base - self.gain) * rate;
        }
        self.gain = self.gain.clamp(self.min_bound, self.base);
    }

    /// Restores the base gain.
    pub fn reset(&mut self) {
        self.gain = self.base;
    }
}

/// Feedback delay network of N taps coupled through a [`CouplingMatrix`].
#[derive(Debug, Clone)]
pub struct FdnCore<T: DelayTap = FilteredDelayLine> {
    taps: Vec<T>,
    matrix: CouplingMatrix,
    front: Vec<f64>,
    back: Vec<f64>,
    guard: CrossGainGuard,
}

impl<T: DelayTap> FdnCore<T> {
    /// Creates a network from its taps, matrix, and guard.
    ///
    /// A matrix whose size doesn't match the tap count is replaced by the
    /// identity.
    pub fn new(taps: Vec<T>, matrix: CouplingMatrix, guard: CrossGainGuard) -> Self {
        let n = taps.len();
        let matrix = if matrix.size() == n {
            matrix
        } else {
            CouplingMatrix::identity(n)
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(taps = n, base_gain = guard.base(), "FDN built");

        Self {
            taps,
            matrix,
            front: vec![0.0; n],
            back: vec![0.0; n],
            guard,
        }
    }

    /// Number of taps.
    pub fn size(&self) -> usize {
        self.taps.len()
    }

    /// Current cross gain.
    pub fn cross_gain(&self) -> f64 {
        self.guard.gain()
    }

    /// Guard state.
    pub fn guard(&self) -> &CrossGainGuard {
        &self.guard
    }

    /// Delay taps, in matrix order.
    pub fn taps(&self) -> &[T] {
        &self.taps
    }

    /// Coupling matrix.
    pub fn matrix(&self) -> &CouplingMatrix {
        &self.matrix
    }

    /// Per-tap outputs of the latest step.
    pub fn outputs(&self) -> &[f64] {
        &self.front
    }

    /// Processes one sample and returns the summed tap outputs.
    #[inline]
    pub fn process(&mut self, input: f64, modulation: f64) -> f64 {
        if self.taps.is_empty() {
            return 0.0;
        }

        core::mem::swap(&mut self.front, &mut self.back);
        self.matrix.mul_vec(&self.back, &mut self.front);

        let input = input / self.taps.len() as f64;
        let gain = self.guard.gain();
        let mut total = 0.0;
        for (tap, value) in self.taps.iter_mut().zip(self.front.iter_mut()) {
            *value = tap.process(input + gain * *value, modulation);
            total += *value;
        }

        self.guard.update(total);
        total
    }

    /// Clears taps and buffers and restores the base gain.
    pub fn reset(&mut self) {
        for tap in &mut self.taps {
            tap.reset();
        }
        self.front.fill(0.0);
        self.back.fill(0.0);
        self.guard.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::FilteredDelayParams;
    use crate::filter::SvfMode;

    /// Plain integer delay, for checking the update order.
    struct PureDelay {
        line: crate::delay::DelayLine,
        delay: f64,
    }

    impl DelayTap for PureDelay {
        fn process(&mut self, input: f64, _modulation: f64) -> f64 {
            self.line.process(input, self.delay)
        }

        fn reset(&mut self) {
            self.line.clear();
        }
    }

    fn pure(delay: usize) -> PureDelay {
        PureDelay {
            line: crate::delay::DelayLine::new(delay + 4),
            delay: delay as f64,
        }
    }

    #[test]
    fn test_single_pure_tap_recirculates() {
        let guard = CrossGainGuard::new(0.5, 48000.0, 1, 1);
        let mut fdn = FdnCore::new(vec![pure(4)], CouplingMatrix::identity(1), guard);
        let out: Vec<f64> = (0..20)
            .map(|i| fdn.process(if i == 0 { 1.0 } else { 0.0 }, 0.0))
            .collect();
        // Each pass adds the 4-sample delay plus one step through `back`.
        assert_eq!(out[4], 1.0);
        assert_eq!(out[9], 0.5);
        assert_eq!(out[14], 0.25);
    }

    #[test]
    fn test_input_split_across_taps() {
        let guard = CrossGainGuard::new(0.0, 48000.0, 1, 4);
        let taps = (0..4).map(|_| pure(2)).collect();
        let mut fdn = FdnCore::new(taps, CouplingMatrix::identity(4), guard);
        fdn.process(1.0, 0.0);
        fdn.process(0.0, 0.0);
        let total = fdn.process(0.0, 0.0);
        assert!((total - 1.0).abs() < 1e-12);
        assert!(fdn.outputs().iter().all(|&v| (v - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_matrix_size_mismatch_falls_back() {
        let guard = CrossGainGuard::new(0.5, 48000.0, 1, 2);
        let fdn = FdnCore::new(vec![pure(3), pure(5)], CouplingMatrix::identity(3), guard);
        assert_eq!(fdn.matrix().size(), 2);
    }

    #[test]
    fn test_guard_rates() {
        let guard = CrossGainGuard::new(1.0, 48000.0 * 16.0, 16, 8);
        assert!((guard.fast_rate - 0.85f64.powf(1.0 / 16.0)).abs() < 1e-15);
        assert!(guard.slow_rate < 1.0 && guard.slow_rate > 0.999);
        assert_eq!(guard.threshold(), 8.0);
    }

    #[test]
    fn test_guard_fast_and_slow_branches() {
        let mut guard = CrossGainGuard::new(1.0, 48000.0, 1, 4);
        guard.update(5.0);
        let slow = guard.gain();
        assert!(slow < 1.0 && slow > 0.99);
        guard.update(-500.0);
        assert!((guard.gain() - slow * 0.85).abs() < 1e-12);
        // Below threshold the gain holds.
        guard.update(0.1);
        assert!((guard.gain() - slow * 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_guard_recovery() {
        let mut guard = CrossGainGuard::new(1.0, 48000.0, 1, 4).with_recovery(100.0);
        guard.update(1000.0);
        assert!(guard.gain() < 1.0);
        for _ in 0..200 {
            guard.update(0.0);
        }
        assert!((guard.gain() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_guard_bounds() {
        let mut guard = CrossGainGuard::new(2.0, 48000.0, 1, 1);
        for _ in 0..10_000 {
            guard.update(f64::NAN);
        }
        assert_eq!(guard.gain(), MIN_CROSS_GAIN);
        let zero = CrossGainGuard::new(0.0, 48000.0, 1, 1);
        assert_eq!(zero.min_bound(), 0.0);
    }

    #[test]
    fn test_reset_restores_state() {
        let taps = (0..2)
            .map(|i| {
                FilteredDelayLine::new(FilteredDelayParams {
                    delay_samples: 30.0 + i as f64,
                    mode: SvfMode::Lowpass,
                    cutoff: 0.2,
                    ..Default::default()
                })
            })
            .collect();
        let guard = CrossGainGuard::new(10.0, 48000.0, 1, 2);
        let mut fdn = FdnCore::new(taps, CouplingMatrix::householder(&[1.0, 1.0]), guard);
        let first: Vec<f64> = (0..200).map(|i| fdn.process((i % 3) as f64, 0.0)).collect();
        assert!(fdn.cross_gain() < 10.0);
        fdn.reset();
        assert_eq!(fdn.cross_gain(), 10.0);
        let second: Vec<f64> = (0..200).map(|i| fdn.process((i % 3) as f64, 0.0)).collect();
        assert_eq!(first, second);
    }
}

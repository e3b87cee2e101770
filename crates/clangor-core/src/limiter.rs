//! Look-ahead peak limiter and the output-stage selector.
//!
//! # Algorithm
//!
//! 1. A monotonic deque tracks the peak of `|x|` over the last
//!    `attack + sustain` samples.
//! 2. The target gain is `min(1, threshold / peak)`.
//! 3. Gain reductions apply instantly; recoveries follow a one-pole release.
//! 4. A box average over `attack` samples smooths the gain curve.
//! 5. The input is delayed by `attack − 1` samples to line up with the
//!    smoothed gain.
//!
//! Every gain value inside the averaging window was computed from a peak
//! window that contains the delayed sample, so the average never exceeds
//! `threshold / |x|` and the output never exceeds `threshold`.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::collections::VecDeque;
use core::fmt;
use core::str::FromStr;

use libm::{ceil, tanh};

use crate::math::EPSILON;
use crate::smoother::time_to_kp;

/// Brickwall look-ahead limiter.
#[derive(Debug, Clone)]
pub struct Limiter {
    threshold: f64,
    hold: usize,
    attack: usize,
    release_kp: f64,
    clock: usize,
    peaks: VecDeque<(usize, f64)>,
    gain: f64,
    window: VecDeque<f64>,
    window_sum: f64,
    since_resum: usize,
    delay: VecDeque<f64>,
}

impl Limiter {
    /// Creates a limiter; times are in samples.
    ///
    /// `attack` (at least 1) is both the look-ahead and the smoothing
    /// length, `sustain` extends the peak hold, `release` is the recovery
    /// time constant (0 recovers instantly).
    pub fn new(attack: f64, sustain: f64, release: f64, threshold: f64) -> Self {
        let attack = finite_samples(attack).max(1);
        let sustain = finite_samples(sustain);
        let mut window = VecDeque::with_capacity(attack);
        window.extend(core::iter::repeat_n(1.0, attack));
        let mut delay = VecDeque::with_capacity(attack);
        delay.extend(core::iter::repeat_n(0.0, attack - 1));

        Self {
            threshold: threshold.abs().max(EPSILON),
            hold: attack + sustain,
            attack,
            release_kp: time_to_kp(release.max(0.0)),
            clock: 0,
            peaks: VecDeque::new(),
            gain: 1.0,
            window,
            window_sum: attack as f64,
            since_resum: 0,
            delay,
        }
    }

    /// Look-ahead latency in samples.
    pub fn latency(&self) -> usize {
        self.attack - 1
    }

    /// Output ceiling.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn peak(&mut self, level: f64) -> f64 {
        while self.peaks.back().is_some_and(|&(_, v)| v <= level) {
            self.peaks.pop_back();
        }
        self.peaks.push_back((self.clock, level));
        while self
            .peaks
            .front()
            .is_some_and(|&(i, _)| i + self.hold <= self.clock)
        {
            self.peaks.pop_front();
        }
        self.clock += 1;
        self.peaks.front().map_or(0.0, |&(_, v)| v)
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let level = if input.is_finite() { input.abs() } else { f64::MAX };
        let peak = self.peak(level);
        let target = if peak > self.threshold { self.threshold / peak } else { 1.0 };

        if target < self.gain {
            self.gain = target;
        } else {
            self.gain += self.release_kp * (target - self.gain);
            self.gain = self.gain.min(target);
        }

        let oldest = self.window.pop_front().unwrap_or(1.0);
        self.window.push_back(self.gain);
        self.window_sum += self.gain - oldest;
        self.since_resum += 1;
        if self.since_resum >= self.attack {
            self.window_sum = self.window.iter().sum();
            self.since_resum = 0;
        }
        let smoothed = (self.window_sum / self.attack as f64).min(1.0);

        self.delay.push_back(if input.is_finite() { input } else { 0.0 });
        let delayed = self.delay.pop_front().unwrap_or(0.0);
        (delayed * smoothed).clamp(-self.threshold, self.threshold)
    }
}

fn finite_samples(samples: f64) -> usize {
    if samples.is_finite() && samples > 0.0 {
        ceil(samples) as usize
    } else {
        0
    }
}

/// Output-stage selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LimiterKind {
    /// No limiting
    Bypass,
    /// `tanh(x / threshold)`
    Tanh,
    /// Look-ahead [`Limiter`]
    #[default]
    Limiter,
}

impl LimiterKind {
    /// Every kind, in menu order.
    pub const ALL: [LimiterKind; 3] = [Self::Bypass, Self::Limiter, Self::Tanh];

    /// Name used in presets.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bypass => "bypass",
            Self::Tanh => "tanh",
            Self::Limiter => "limiter",
        }
    }
}

impl fmt::Display for LimiterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown limiter kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLimiter;

impl fmt::Display for UnknownLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("limiter must be one of: bypass, limiter, tanh")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownLimiter {}

impl FromStr for LimiterKind {
    type Err = UnknownLimiter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or(UnknownLimiter)
    }
}

/// Final stage of a voice.
#[derive(Debug, Clone)]
pub enum OutputLimiter {
    /// Passes the signal through.
    Bypass,
    /// Soft saturation scaled by `1 / threshold`.
    Tanh {
        /// Reciprocal of the threshold.
        inv_gain: f64,
    },
    /// Brickwall limiter.
    Limiter(Limiter),
}

impl OutputLimiter {
    /// Builds the stage for `kind`; times are in samples.
    pub fn new(kind: LimiterKind, attack: f64, sustain: f64, release: f64, threshold: f64) -> Self {
        match kind {
            LimiterKind::Bypass => Self::Bypass,
            LimiterKind::Tanh => Self::Tanh {
                inv_gain: 1.0 / threshold.abs().max(EPSILON),
            },
            LimiterKind::Limiter => Self::Limiter(Limiter::new(attack, sustain, release, threshold)),
        }
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        match self {
            Self::Bypass => input,
            Self::Tanh { inv_gain } => tanh(input * *inv_gain),
            Self::Limiter(limiter) => limiter.process(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_never_exceeds_threshold() {
        let mut lim = Limiter::new(32.0, 16.0, 100.0, 0.5);
        for i in 0..10_000 {
            let x = 3.0 * libm::sin(i as f64 * 0.37) * if i % 1000 < 20 { 10.0 } else { 1.0 };
            let y = lim.process(x);
            assert!(y.abs() <= 0.5 + 1e-12, "sample {i}: {y}");
        }
    }

    #[test]
    fn test_limiter_transparent_below_threshold() {
        let mut lim = Limiter::new(8.0, 0.0, 0.0, 1.0);
        let input: Vec<f64> = (0..200).map(|i| 0.5 * libm::sin(i as f64 * 0.1)).collect();
        let out: Vec<f64> = input.iter().map(|&x| lim.process(x)).collect();
        let latency = lim.latency();
        assert_eq!(latency, 7);
        for i in latency..200 {
            assert!((out[i] - input[i - latency]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_limiter_recovers() {
        let mut lim = Limiter::new(4.0, 0.0, 10.0, 1.0);
        lim.process(100.0);
        let mut y = 0.0;
        for _ in 0..2000 {
            y = lim.process(0.5);
        }
        assert!((y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_limiter_handles_non_finite() {
        let mut lim = Limiter::new(4.0, 2.0, 0.0, 1.0);
        for x in [f64::NAN, f64::INFINITY, 1.0, -2.0] {
            assert!(lim.process(x).is_finite());
        }
    }

    #[test]
    fn test_output_limiter_kinds() {
        let mut bypass = OutputLimiter::new(LimiterKind::Bypass, 1.0, 0.0, 0.0, 1.0);
        assert_eq!(bypass.process(5.0), 5.0);
        let mut tanh_stage = OutputLimiter::new(LimiterKind::Tanh, 1.0, 0.0, 0.0, 2.0);
        assert!((tanh_stage.process(2.0) - libm::tanh(1.0)).abs() < 1e-12);
        assert_eq!("limiter".parse::<LimiterKind>(), Ok(LimiterKind::Limiter));
    }
}

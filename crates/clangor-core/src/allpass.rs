//! Schroeder allpass sections and serial allpass chains.
//!
//! A chain of long allpasses smears a click into a dense, metallic burst
//! without changing its long-term spectrum, which is how the percussion
//! voice turns a noise burst into a "hit" before it reaches the FDN.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec::Vec;

use libm::{ceil, floor, round};

use crate::delay::DelayLine;
use crate::math::{EPSILON, flush_denormal};
use crate::random::RandomStream;

/// Lowest stage rate accepted by [`SerialAllpass::randomized`]; caps each
/// stage at one second of delay.
const MIN_TIME_HZ: f64 = 1.0;

/// Schroeder allpass with an integer delay of `delay` samples.
///
/// ```text
/// v[n] = x[n] − g·v[n−D]
/// y[n] = v[n−D] + g·v[n]
/// ```
#[derive(Debug, Clone)]
pub struct Allpass {
    line: DelayLine,
    delay: usize,
    gain: f64,
}

impl Allpass {
    /// Creates an allpass of `delay` samples (at least 1) and feedback `gain`.
    pub fn new(delay: usize, gain: f64) -> Self {
        let delay = delay.max(1);
        let mut line = DelayLine::new(delay + 2);
        line.set_interpolation(crate::delay::Interpolation::None);
        Self {
            line,
            delay,
            gain: gain.clamp(-0.9999, 0.9999),
        }
    }

    /// Delay length in samples.
    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let delayed = self.line.read((self.delay - 1) as f64);
        let v = flush_denormal(input - self.gain * delayed);
        self.line.write(v);
        delayed + self.gain * v
    }
}

/// Allpasses in series; the output is the sum of every stage's output.
#[derive(Debug, Clone)]
pub struct SerialAllpass {
    stages: Vec<Allpass>,
}

impl SerialAllpass {
    /// Feedback gain of every stage built by [`SerialAllpass::randomized`].
    pub const GAIN: f64 = 0.95;

    /// Builds a chain from explicit stage lengths.
    pub fn new(delays: &[usize], gain: f64) -> Self {
        Self {
            stages: delays.iter().map(|&d| Allpass::new(d, gain)).collect(),
        }
    }

    /// Builds `stages` allpasses whose lengths are a random partition of
    /// `sample_rate · stages / max_time_hz` samples.
    ///
    /// Every stage is at least 2 samples long. The total equals the target
    /// (rounded), so the chain's overall time scale is fixed and only its
    /// inner structure is random. Draws `stages` values from `rng`.
    pub fn randomized(
        rng: &mut RandomStream,
        sample_rate: f64,
        stages: usize,
        max_time_hz: f64,
    ) -> Self {
        let stages = stages.max(1);
        let n = stages as f64;
        let target = ceil(sample_rate * n / max_time_hz.max(MIN_TIME_HZ));
        let scaler = if target.is_finite() {
            (target - 2.0 * n).max(0.0)
        } else {
            0.0
        };

        let weights: Vec<f64> = (0..stages).map(|_| rng.next_f64()).collect();
        let total = weights.iter().sum::<f64>().max(EPSILON);

        let mut fraction = 0.0;
        let mut delays: Vec<usize> = weights
            .iter()
            .map(|w| {
                let samples = 2.0 + scaler * w / total;
                let whole = floor(samples);
                fraction += samples - whole;
                whole as usize
            })
            .collect();
        delays[0] += round(fraction) as usize;

        Self::new(&delays, Self::GAIN)
    }

    /// Stage lengths in samples.
    pub fn delays(&self) -> Vec<usize> {
        self.stages.iter().map(Allpass::delay).collect()
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let mut sig = input;
        let mut sum = 0.0;
        for stage in &mut self.stages {
            sig = stage.process(sig);
            sum += sig;
        }
        sum
    }
}

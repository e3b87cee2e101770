//! Ring-buffer delay lines.
//!
//! # Types
//!
//! - [`DelayLine`] - fixed-capacity ring buffer with fractional reads
//! - [`FilteredDelayLine`] - delay line with an embedded bandpass/lowpass
//!   and slew-limited, amplitude-driven delay-time modulation (one FDN tap)
//! - [`MultiTapDelay`] - one write, several summed fractional reads
//!
//! # Read convention
//!
//! `read(t)` returns the sample written `t` samples before the most recent
//! write, so `process(x, t)` (write, then read) implements `y[n] = x[n − t]`.
//! Read times are clamped to `[0, capacity − 2]`; the buffer never reads
//! across its own write cursor.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use libm::{ceil, exp, floor};

use crate::filter::{Svf, SvfMode};
use crate::math::{EPSILON, lagrange3};
use crate::smoother::RateLimiter;

/// Smallest capacity any delay line is allocated with.
const MIN_CAPACITY: usize = 8;

/// Longest nominal delay a [`FilteredDelayLine`] allocates for (about six
/// minutes at 48 kHz, or 5.5 s at 64× oversampling).
pub const MAX_DELAY_SAMPLES: f64 = 16_777_216.0;

/// Interpolation method for fractional reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Truncate to the integer sample
    None,
    /// Linear interpolation between two samples
    #[default]
    Linear,
    /// 4-point third-order Lagrange interpolation
    Cubic,
}

impl Interpolation {
    /// Every method, in menu order.
    pub const ALL: [Interpolation; 3] = [Self::None, Self::Linear, Self::Cubic];

    /// Name used in presets.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Linear => "linear",
            Self::Cubic => "cubic",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown interpolation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownInterpolation;

impl fmt::Display for UnknownInterpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interpolation must be one of: none, linear, cubic")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownInterpolation {}

impl FromStr for Interpolation {
    type Err = UnknownInterpolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|method| method.name().eq_ignore_ascii_case(s))
            .ok_or(UnknownInterpolation)
    }
}

/// Fixed-capacity ring buffer with fractional reads.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f64>,
    write_pos: usize,
    interpolation: Interpolation,
}

impl DelayLine {
    /// Creates a delay line holding `capacity` samples (at least 8).
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(MIN_CAPACITY)],
            write_pos: 0,
            interpolation: Interpolation::Linear,
        }
    }

    /// Creates a delay line able to hold `max_delay` samples plus margin.
    pub fn with_max_delay(max_delay: f64) -> Self {
        let max_delay = if max_delay.is_finite() { max_delay.max(0.0) } else { 0.0 };
        Self::new(ceil(max_delay) as usize + 4)
    }

    /// Sets the interpolation method for fractional reads.
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Longest delay time a read accepts.
    pub fn max_delay(&self) -> f64 {
        (self.buffer.len() - 2) as f64
    }

    #[inline]
    fn tap(&self, offset: usize) -> f64 {
        let len = self.buffer.len();
        self.buffer[(self.write_pos + len - 1 - offset % len) % len]
    }

    /// Reads the sample written `delay` samples before the latest write.
    #[inline]
    pub fn read(&self, delay: f64) -> f64 {
        let delay = if delay.is_finite() {
            delay.clamp(0.0, self.max_delay())
        } else {
            0.0
        };
        let int = floor(delay) as usize;
        let frac = delay - int as f64;

        match self.interpolation {
            Interpolation::None => self.tap(int),
            Interpolation::Linear => {
                let a = self.tap(int);
                let b = self.tap(int + 1);
                a + (b - a) * frac
            }
            Interpolation::Cubic => {
                let y0 = if int == 0 { self.tap(0) } else { self.tap(int - 1) };
                lagrange3(y0, self.tap(int), self.tap(int + 1), self.tap(int + 2), frac)
            }
        }
    }

    /// Writes one sample and advances the cursor.
    #[inline]
    pub fn write(&mut self, sample: f64) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Writes `sample`, then reads at `delay`.
    #[inline]
    pub fn process(&mut self, sample: f64, delay: f64) -> f64 {
        self.write(sample);
        self.read(delay)
    }

    /// Clears the buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Which signal a [`FilteredDelayLine`] stores in its buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterPlacement {
    /// The filtered input is written; the buffer output is returned as is.
    #[default]
    PreDelay,
    /// The dry input is written; the filter runs on the buffer output.
    PostDelay,
}

/// Construction parameters of a [`FilteredDelayLine`].
#[derive(Clone, Copy, Debug)]
pub struct FilteredDelayParams {
    /// Nominal delay in samples.
    pub delay_samples: f64,
    /// Filter cutoff, normalized (cycles per sample).
    pub cutoff: f64,
    /// Filter Q.
    pub q: f64,
    /// Gain from `|input|` to delay-time reduction in samples.
    pub mod_amount: f64,
    /// Largest per-sample change of the delay-time modulation, in samples.
    pub max_slew: f64,
    /// Filter response.
    pub mode: SvfMode,
    /// Filter position relative to the buffer.
    pub placement: FilterPlacement,
    /// Read interpolation.
    pub interpolation: Interpolation,
}

impl Default for FilteredDelayParams {
    fn default() -> Self {
        Self {
            delay_samples: 100.0,
            cutoff: 0.01,
            q: core::f64::consts::FRAC_1_SQRT_2,
            mod_amount: 0.0,
            max_slew: 0.5,
            mode: SvfMode::Bandpass,
            placement: FilterPlacement::PreDelay,
            interpolation: Interpolation::Linear,
        }
    }
}

/// One FDN tap: a filtered, modulated delay line.
///
/// Per sample:
///
/// 1. `scale = exp(modulation)` multiplies the filter cutoff and divides the
///    delay time, so positive modulation raises the pitch of the tap.
/// 2. The slew limiter chases `|mod_amount · input|` and shortens the delay
///    by its value; loud input bends the pitch like a struck membrane.
/// 3. The effective delay is clamped to `[2, capacity − 2]`.
///
/// Capacity is twice the nominal delay plus margin, which bounds how far
/// negative modulation can stretch the delay.
#[derive(Debug, Clone)]
pub struct FilteredDelayLine {
    line: DelayLine,
    filter: Svf,
    time_slew: RateLimiter,
    delay_samples: f64,
    cutoff: f64,
    q: f64,
    mod_amount: f64,
    max_slew: f64,
    mode: SvfMode,
    placement: FilterPlacement,
}

impl FilteredDelayLine {
    /// Creates a tap from `params`.
    pub fn new(params: FilteredDelayParams) -> Self {
        let nominal = if params.delay_samples.is_finite() {
            params.delay_samples.clamp(2.0, MAX_DELAY_SAMPLES)
        } else {
            2.0
        };
        let mut line = DelayLine::with_max_delay(2.0 * nominal + 2.0);
        line.set_interpolation(params.interpolation);

        let mut tap = Self {
            line,
            filter: Svf::new(),
            time_slew: RateLimiter::default(),
            delay_samples: 2.0,
            cutoff: params.cutoff,
            q: params.q,
            mod_amount: params.mod_amount,
            max_slew: params.max_slew.max(0.0),
            mode: params.mode,
            placement: params.placement,
        };
        tap.set_delay_samples(nominal);
        tap
    }

    /// Sets the nominal delay, clamped to `[2, capacity − 2]`.
    pub fn set_delay_samples(&mut self, samples: f64) {
        let samples = if samples.is_finite() { samples } else { 2.0 };
        self.delay_samples = samples.clamp(2.0, self.line.max_delay());
    }

    /// Nominal delay in samples.
    pub fn delay_samples(&self) -> f64 {
        self.delay_samples
    }

    /// Buffer capacity in samples.
    pub fn capacity(&self) -> usize {
        self.line.capacity()
    }

    /// Current value of the slew-limited delay-time offset.
    pub fn time_offset(&self) -> f64 {
        self.time_slew.value()
    }

    /// Processes one sample with log-domain modulation `modulation`.
    #[inline]
    pub fn process(&mut self, input: f64, modulation: f64) -> f64 {
        let scale = exp(modulation);
        let cutoff = self.cutoff * scale;

        self.time_slew.push((self.mod_amount * input).abs());
        let offset = self.time_slew.process(self.max_slew);
        let time = ((self.delay_samples - offset) / scale.max(EPSILON))
            .clamp(2.0, self.line.max_delay());

        match self.placement {
            FilterPlacement::PreDelay => {
                let filtered = self.filter.process_mode(input, cutoff, self.q, self.mode);
                self.line.process(filtered, time)
            }
            FilterPlacement::PostDelay => {
                let delayed = self.line.process(input, time);
                self.filter.process_mode(delayed, cutoff, self.q, self.mode)
            }
        }
    }

    /// Clears buffer, filter, and modulation state.
    pub fn reset(&mut self) {
        self.line.clear();
        self.filter.reset();
        self.time_slew.reset(0.0);
    }
}

/// Delay line with several read taps summed into one output.
#[derive(Debug, Clone)]
pub struct MultiTapDelay {
    line: DelayLine,
    times: Vec<f64>,
}

impl MultiTapDelay {
    /// Creates a delay of `max_delay` samples with `taps` read taps.
    pub fn new(max_delay: f64, taps: usize) -> Self {
        Self {
            line: DelayLine::with_max_delay(max_delay),
            times: vec![0.0; taps.max(1)],
        }
    }

    /// Number of taps.
    pub fn taps(&self) -> usize {
        self.times.len()
    }

    /// Sets the read time of every tap; extra entries are ignored.
    pub fn set_times(&mut self, times: &[f64]) {
        for (dst, &src) in self.times.iter_mut().zip(times) {
            *dst = src;
        }
    }

    /// Writes `input` and returns the sum of all taps.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.line.write(input);
        self.times.iter().map(|&t| self.line.read(t)).sum()
    }
}

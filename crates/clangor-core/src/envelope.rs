//! Envelope generators.
//!
//! - [`DoubleEmaAdEnvelope`] - smooth attack-decay built from two
//!   [`DoubleEmaFilter`]s, used as a pitch-bend modulation source
//! - [`ExpDecay`] - geometric decay from a start gain
//! - [`DelayedDecayEnvelope`] - table-driven attack, transition, and −60 dB
//!   decay, read with 4-point Lagrange interpolation

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use libm::{expm1, floor, pow};

use crate::math::{EPSILON, lagrange3, lerp};
use crate::smoother::DoubleEmaFilter;

/// Attack-decay envelope: `gain · attack(t) · decay(t)`.
///
/// The attack curve rises from 0 toward 1 and the decay curve falls from
/// 1 toward 0, both as double-EMA step responses, so the product starts
/// and ends with zero slope.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleEmaAdEnvelope {
    attack: DoubleEmaFilter,
    decay: DoubleEmaFilter,
    gain: f64,
}

impl DoubleEmaAdEnvelope {
    /// Creates an idle envelope (output 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the envelope with peak scale `gain` and the given attack and
    /// decay time constants in samples.
    pub fn note_on(&mut self, gain: f64, attack_samples: f64, decay_samples: f64) {
        self.gain = gain;
        self.attack.set_time(attack_samples);
        self.attack.reset(0.0);
        self.decay.set_time(decay_samples);
        self.decay.reset(1.0);
    }

    /// Next envelope value.
    #[inline]
    pub fn process(&mut self) -> f64 {
        self.gain * self.attack.process(1.0) * self.decay.process(0.0)
    }
}

/// Geometric decay `start · rate^n`.
#[derive(Debug, Clone, Copy)]
pub struct ExpDecay {
    value: f64,
    rate: f64,
}

impl ExpDecay {
    /// Decays from `start` to `start · target` over `samples` samples.
    pub fn new(start: f64, target: f64, samples: f64) -> Self {
        Self {
            value: start,
            rate: pow(target.clamp(EPSILON, 1.0), 1.0 / samples.max(1.0)),
        }
    }

    /// Current value, without advancing.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Returns the current value and advances one sample.
    #[inline]
    pub fn process(&mut self) -> f64 {
        let out = self.value;
        self.value *= self.rate;
        out
    }
}

/// Table-driven envelope with a delayed peak.
///
/// The 2048-point table holds, in order:
///
/// 1. an `expm1` attack from 0 to `attack_height`
/// 2. a 2 ms linear transition to 1
/// 3. an exponential decay from 1 to −60 dB
///
/// The whole table spans `attack + 2 ms + decay` seconds.
#[derive(Debug, Clone)]
pub struct DelayedDecayEnvelope {
    table: Vec<f64>,
    phase: f64,
    delta: f64,
}

impl DelayedDecayEnvelope {
    /// Table length (excluding interpolation guard points).
    pub const TABLE_SIZE: usize = 2048;
    /// Length of the attack-to-decay transition.
    pub const TRANSITION_SECONDS: f64 = 0.002;

    /// Builds the table for a render at `sample_rate`.
    pub fn new(
        sample_rate: f64,
        attack_seconds: f64,
        attack_height: f64,
        decay_seconds: f64,
    ) -> Self {
        let attack_seconds = attack_seconds.max(0.0);
        let decay_seconds = decay_seconds.max(0.0);
        let length_seconds = attack_seconds + decay_seconds + Self::TRANSITION_SECONDS;
        let size = Self::TABLE_SIZE;
        let sizef = size as f64;

        // One leading and two trailing guard points for interpolation.
        let mut table = vec![0.0; size + 3];
        let body = &mut table[1..=size];

        let attack_end = (floor(sizef * attack_seconds / length_seconds) as usize).min(size);
        for (i, v) in body[..attack_end].iter_mut().enumerate() {
            *v = attack_height * expm1(core::f64::consts::LN_2 * i as f64 / attack_end as f64);
        }

        let transition_end = (attack_end
            + floor(sizef * Self::TRANSITION_SECONDS / length_seconds) as usize)
            .min(size);
        let transition_len = (transition_end - attack_end).max(1) as f64;
        for (i, v) in body[attack_end..transition_end].iter_mut().enumerate() {
            *v = lerp(attack_height, 1.0, i as f64 / transition_len);
        }

        let width = (size - transition_end).max(1) as f64;
        let decay = pow(1e-3, 1.0 / width);
        let mut gain = 1.0;
        for v in &mut body[transition_end..] {
            *v = gain;
            gain *= decay;
        }

        Self {
            table,
            phase: 0.0,
            delta: sizef / (sample_rate * length_seconds).max(1.0),
        }
    }

    /// Whether the table has been read to its end.
    pub fn is_finished(&self) -> bool {
        self.phase >= (self.table.len() - 4) as f64
    }

    /// Next envelope value; 0 once finished.
    #[inline]
    pub fn process(&mut self) -> f64 {
        if self.is_finished() {
            return 0.0;
        }
        let i0 = floor(self.phase) as usize;
        let fraction = self.phase - i0 as f64;
        self.phase += self.delta;
        lagrange3(
            self.table[i0],
            self.table[i0 + 1],
            self.table[i0 + 2],
            self.table[i0 + 3],
            fraction,
        )
    }
}

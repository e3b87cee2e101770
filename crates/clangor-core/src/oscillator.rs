//! Phase-accumulator oscillators.
//!
//! Frequencies are normalized (cycles per sample) and phases are in turns.

use core::f64::consts::TAU;

use libm::{floor, sin};

use crate::envelope::DelayedDecayEnvelope;

#[inline]
fn wrap(phase: f64) -> f64 {
    phase - floor(phase)
}

/// Sine oscillator whose frequency is supplied per sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct SineLfo {
    phase: f64,
}

impl SineLfo {
    /// Creates an oscillator starting at `phase` turns.
    pub fn new(phase: f64) -> Self {
        Self { phase: wrap(phase) }
    }

    /// Advances by `freq` and returns the new sine value.
    #[inline]
    pub fn process(&mut self, freq: f64) -> f64 {
        self.phase = wrap(self.phase + freq);
        sin(TAU * self.phase)
    }
}

/// Two-operator FM voice: an enveloped modulator phase-modulates a sine
/// carrier.
///
/// ```text
/// m = index · env · sin(2π·φ₁)
/// y = sin(2π·φ₀ + m)
/// ```
#[derive(Debug, Clone)]
pub struct FmPair {
    carrier_phase: f64,
    carrier_freq: f64,
    modulator_phase: f64,
    modulator_freq: f64,
    envelope: DelayedDecayEnvelope,
    index: f64,
}

impl FmPair {
    /// Creates a pair from carrier and modulator frequency and start phase.
    pub fn new(
        carrier: (f64, f64),
        modulator: (f64, f64),
        envelope: DelayedDecayEnvelope,
        index: f64,
    ) -> Self {
        Self {
            carrier_freq: carrier.0,
            carrier_phase: wrap(carrier.1),
            modulator_freq: modulator.0,
            modulator_phase: wrap(modulator.1),
            envelope,
            index,
        }
    }

    /// Next output sample.
    #[inline]
    pub fn process(&mut self) -> f64 {
        self.modulator_phase = wrap(self.modulator_phase + self.modulator_freq);
        let modulation =
            self.index * self.envelope.process() * sin(TAU * self.modulator_phase);

        self.carrier_phase = wrap(self.carrier_phase + self.carrier_freq);
        sin(TAU * self.carrier_phase + modulation)
    }
}

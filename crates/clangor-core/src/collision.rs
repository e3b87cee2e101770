//! Collision coupling between two FDN instances.
//!
//! Each network's aggregate output is treated as the position of a body on
//! a line, and its sample-to-sample change as that body's velocity. When
//! the bodies come closer than `distance` they exchange an impulse
//!
//! ```text
//! sum = (|p0| + |p1|) / (|v0| + |v1|)     (division skipped below ε)
//! j0  =  sum · v1
//! j1  = −sum · v0
//! ```
//!
//! which is an elastic-collision analogy, not a momentum-conserving law.
//! Each impulse is spread over about a millisecond by an [`EnergyStore`]
//! before it is added to the network's excitation, so a collision never
//! injects a single-sample spike into the feedback loop.

use libm::{exp, log};

use crate::fdn::{DelayTap, FdnCore};
use crate::math::{EPSILON, lerp};

/// Leaky accumulator that spreads an impulse over `decay_samples`.
#[derive(Debug, Clone, Copy)]
pub struct EnergyStore {
    sum: f64,
    decay: f64,
    gain: f64,
}

impl EnergyStore {
    /// Creates a store that fades to ε over `decay_samples`.
    pub fn new(decay_samples: f64) -> Self {
        let decay = -log(EPSILON) / decay_samples.max(1.0);
        Self {
            sum: 0.0,
            decay,
            gain: exp(-decay),
        }
    }

    /// Accumulates `value` (when above ε) and returns the decayed sum.
    #[inline]
    pub fn process(&mut self, value: f64) -> f64 {
        if value.abs() > EPSILON {
            self.sum = (self.sum + value) * self.decay;
        }
        self.sum *= self.gain;
        self.sum
    }

    /// Current accumulated value.
    pub fn value(&self) -> f64 {
        self.sum
    }

    /// Clears the accumulator.
    pub fn reset(&mut self) {
        self.sum = 0.0;
    }
}

/// Impulses exchanged by two bodies at `p0`, `p1` with velocities `v0`,
/// `v1`.
///
/// Returns `(0, 0)` when the gap `p0 − p1` is at least `distance`, and
/// always when `distance ≤ 0` (coupling disabled).
#[inline]
pub fn solve_collision(p0: f64, p1: f64, v0: f64, v1: f64, distance: f64) -> (f64, f64) {
    if distance.is_nan() || distance <= 0.0 || p0 - p1 >= distance {
        return (0.0, 0.0);
    }

    let mut sum = p0.abs() + p1.abs();
    let speed = v0.abs() + v1.abs();
    if speed >= EPSILON {
        sum /= speed;
    }
    (sum * v1, -sum * v0)
}

/// Positions, velocities, and energy stores of two coupled bodies.
#[derive(Debug, Clone)]
pub struct CollisionPair {
    position: [f64; 2],
    velocity: [f64; 2],
    impulse: [f64; 2],
    distance: f64,
    stores: [EnergyStore; 2],
}

impl CollisionPair {
    /// Creates a pair that collides below `distance`, with energy stores
    /// of `decay_samples`.
    pub fn new(distance: f64, decay_samples: f64) -> Self {
        Self {
            position: [0.0; 2],
            velocity: [0.0; 2],
            impulse: [0.0; 2],
            distance,
            stores: [EnergyStore::new(decay_samples); 2],
        }
    }

    /// Solves this sample's collision and returns the diffused impulse for
    /// each side.
    #[inline]
    pub fn exchange(&mut self) -> [f64; 2] {
        let (j0, j1) = solve_collision(
            self.position[0],
            self.position[1],
            self.velocity[0],
            self.velocity[1],
            self.distance,
        );
        self.impulse = [j0, j1];
        [self.stores[0].process(j0), self.stores[1].process(j1)]
    }

    /// Records each body's new position and derives its velocity.
    #[inline]
    pub fn advance(&mut self, positions: [f64; 2]) {
        for ((p, v), new) in self.position.iter_mut().zip(&mut self.velocity).zip(positions) {
            *v = new - *p;
            *p = new;
        }
    }

    /// Current positions.
    pub fn positions(&self) -> [f64; 2] {
        self.position
    }

    /// Current velocities.
    pub fn velocities(&self) -> [f64; 2] {
        self.velocity
    }

    /// Raw impulses of the latest [`exchange`](Self::exchange).
    pub fn last_impulse(&self) -> [f64; 2] {
        self.impulse
    }

    /// Collision distance.
    pub fn distance(&self) -> f64 {
        self.distance
    }
}

/// Two FDNs driven by the same excitation and coupled by collisions.
#[derive(Debug, Clone)]
pub struct CoupledFdn<T: DelayTap> {
    networks: [FdnCore<T>; 2],
    pair: CollisionPair,
}

impl<T: DelayTap> CoupledFdn<T> {
    /// Couples `primary` and `secondary`.
    pub fn new(primary: FdnCore<T>, secondary: FdnCore<T>, pair: CollisionPair) -> Self {
        Self {
            networks: [primary, secondary],
            pair,
        }
    }

    /// Runs one step and returns both positions.
    ///
    /// 1. Impulses are solved from the previous positions and velocities.
    /// 2. Each network processes `excitation` plus its diffused impulse.
    /// 3. Positions and velocities advance to the new outputs.
    #[inline]
    pub fn process(&mut self, excitation: f64, modulation: f64) -> [f64; 2] {
        let kicks = self.pair.exchange();
        let out = [
            self.networks[0].process(excitation + kicks[0], modulation),
            self.networks[1].process(excitation + kicks[1], modulation),
        ];
        self.pair.advance(out);
        out
    }

    /// Runs one step and crossfades the two positions by `mix`.
    #[inline]
    pub fn process_mix(&mut self, excitation: f64, modulation: f64, mix: f64) -> f64 {
        let [a, b] = self.process(excitation, modulation);
        lerp(a, b, mix)
    }

    /// Collision state.
    pub fn pair(&self) -> &CollisionPair {
        &self.pair
    }

    /// Both networks.
    pub fn networks(&self) -> &[FdnCore<T>; 2] {
        &self.networks
    }
}

//! Integration tests for clangor-core.
//!
//! Exercises the network as a whole: seeded determinism, matrix
//! orthogonality, the cross-gain guard under hostile input, collision
//! coupling with the distance at zero, and decimation accuracy.

use clangor_core::{
    CollisionPair, CouplingMatrix, CoupledFdn, CrossGainGuard, FdnCore, FilteredDelayLine,
    FilteredDelayParams, MatrixFamily, MultirateContext, OversampleFactor, RandomStream, SvfMode,
    output_length,
};

const SAMPLE_RATE: f64 = 48000.0;
const TAU: f64 = core::f64::consts::TAU;

fn rms(signal: &[f64]) -> f64 {
    libm::sqrt(signal.iter().map(|v| v * v).sum::<f64>() / signal.len() as f64)
}

fn to_db(linear: f64) -> f64 {
    20.0 * libm::log10(linear.max(1e-12))
}

/// Builds a network whose tap times, cutoffs, and matrix all come from `seed`.
fn random_network(seed: u64, taps: usize, base_gain: f64) -> FdnCore {
    let mut rng = RandomStream::new(seed);
    let lines = (0..taps)
        .map(|_| {
            let delay_samples = rng.exponential(40.0, 400.0);
            FilteredDelayLine::new(FilteredDelayParams {
                delay_samples,
                cutoff: rng.exponential(0.5, 1.5) / delay_samples,
                q: rng.uniform(0.5, 8.0),
                mod_amount: rng.uniform(0.0, 50.0),
                ..Default::default()
            })
        })
        .collect();
    let matrix = CouplingMatrix::build(MatrixFamily::SpecialOrthogonal, taps, rng.next_u64());
    let guard = CrossGainGuard::new(base_gain, SAMPLE_RATE, 1, taps);
    FdnCore::new(lines, matrix, guard)
}

fn impulse(i: usize) -> f64 {
    if i == 0 { 1.0 } else { 0.0 }
}

// ============================================================================
// 1. Determinism
// ============================================================================

#[test]
fn same_seed_renders_identical_output() {
    let mut a = random_network(1234, 8, 0.98);
    let mut b = random_network(1234, 8, 0.98);
    for i in 0..20_000 {
        let x = impulse(i);
        assert_eq!(a.process(x, 0.0).to_bits(), b.process(x, 0.0).to_bits(), "sample {i}");
    }
}

#[test]
fn different_seeds_diverge() {
    let mut a = random_network(1, 8, 0.98);
    let mut b = random_network(2, 8, 0.98);
    let differs = (0..5000).any(|i| a.process(impulse(i), 0.0) != b.process(impulse(i), 0.0));
    assert!(differs);
}

// ============================================================================
// 2. Matrices
// ============================================================================

#[test]
fn householder_is_orthogonal_and_symmetric() {
    let mut rng = RandomStream::new(99);
    for size in [1, 2, 3, 5, 8, 13, 32] {
        let v: Vec<f64> = (0..size).map(|_| rng.normal()).collect();
        let m = CouplingMatrix::householder(&v);
        assert!(m.orthogonality_error() < 1e-12, "size {size}");
        assert!(m.is_symmetric(1e-15));
    }
}

#[test]
fn orthogonal_families_preserve_energy() {
    for family in MatrixFamily::ALL.into_iter().filter(|f| f.is_orthogonal()) {
        let m = CouplingMatrix::build(family, 12, 5);
        let x: Vec<f64> = (0..12).map(|i| (i as f64 * 0.7).sin()).collect();
        let mut y = vec![0.0; 12];
        m.mul_vec(&x, &mut y);
        let ex: f64 = x.iter().map(|v| v * v).sum();
        let ey: f64 = y.iter().map(|v| v * v).sum();
        assert!((ex - ey).abs() < 1e-9, "{family}");
    }
}

// ============================================================================
// 3. Cross-gain guard
// ============================================================================

#[test]
fn cross_gain_stays_bounded_under_hostile_input() {
    let taps = (0..4)
        .map(|i| {
            FilteredDelayLine::new(FilteredDelayParams {
                delay_samples: 50.0 + 17.0 * i as f64,
                cutoff: 0.02,
                q: 20.0,
                ..Default::default()
            })
        })
        .collect();
    let matrix = CouplingMatrix::householder(&[1.0, 1.0, 1.0, 1.0]);
    let guard = CrossGainGuard::new(100.0, SAMPLE_RATE, 1, 4);
    let mut fdn = FdnCore::new(taps, matrix, guard);
    let min = fdn.guard().min_bound();

    let mut rng = RandomStream::new(7);
    for i in 0..48_000 {
        let y = fdn.process(1e4 * rng.uniform(-1.0, 1.0), 0.0);
        assert!(y.is_finite(), "sample {i}");
        let g = fdn.cross_gain();
        assert!(g >= min && g <= 100.0, "sample {i}: gain {g}");
    }
    assert!(fdn.cross_gain() < 100.0);
}

#[test]
fn guard_keeps_unstable_network_finite() {
    let mut fdn = random_network(42, 16, 4.0);
    for i in 0..96_000 {
        let y = fdn.process(impulse(i), 0.0);
        assert!(y.is_finite(), "sample {i}");
    }
    assert!(fdn.cross_gain() < 4.0);
}

// ============================================================================
// 4. Single tap
// ============================================================================

#[test]
fn single_tap_impulse_decays_each_period() {
    let d = 100.0;
    let tap = FilteredDelayLine::new(FilteredDelayParams {
        delay_samples: d,
        cutoff: 1.0 / (d + 1.0),
        q: 2.0,
        mode: SvfMode::Bandpass,
        ..Default::default()
    });
    let guard = CrossGainGuard::new(0.9, SAMPLE_RATE, 1, 1);
    let mut fdn = FdnCore::new(vec![tap], CouplingMatrix::identity(1), guard);

    let period = d as usize + 1;
    let out: Vec<f64> = (0..period * 150).map(|i| fdn.process(impulse(i), 0.0)).collect();
    let peaks: Vec<f64> = out
        .chunks(period)
        .map(|w| w.iter().fold(0.0f64, |m, v| m.max(v.abs())))
        .collect();

    // The first window only holds the first arrival.
    for pair in peaks[1..].windows(2) {
        assert!(pair[1] < pair[0], "{} !< {}", pair[1], pair[0]);
    }
    assert_eq!(fdn.cross_gain(), 0.9);
}

// ============================================================================
// 5. Collision coupling
// ============================================================================

#[test]
fn zero_distance_matches_independent_networks() {
    let primary = random_network(10, 6, 0.97);
    let secondary = random_network(11, 6, 0.97);
    let mut solo = [primary.clone(), secondary.clone()];
    let mut coupled = CoupledFdn::new(primary, secondary, CollisionPair::new(0.0, 48.0));

    let mut rng = RandomStream::new(3);
    for i in 0..10_000 {
        let x = if i < 64 { rng.uniform(-1.0, 1.0) } else { 0.0 };
        let [a, b] = coupled.process(x, 0.0);
        assert_eq!(a.to_bits(), solo[0].process(x, 0.0).to_bits(), "sample {i}");
        assert_eq!(b.to_bits(), solo[1].process(x, 0.0).to_bits(), "sample {i}");
    }
}

#[test]
fn positive_distance_changes_output() {
    let primary = random_network(10, 6, 0.97);
    let secondary = random_network(11, 6, 0.97);
    let mut solo = primary.clone();
    let mut coupled = CoupledFdn::new(primary, secondary, CollisionPair::new(1.0, 48.0));

    let mut differs = false;
    for i in 0..10_000 {
        let x = 0.5 * impulse(i);
        let [a, _] = coupled.process(x, 0.0);
        assert!(a.is_finite());
        differs |= a != solo.process(x, 0.0);
    }
    assert!(differs);
}

// ============================================================================
// 6. Decimation
// ============================================================================

fn tone_through(factor: OversampleFactor, hz: f64) -> f64 {
    let up = SAMPLE_RATE * factor.fold() as f64;
    let mut ctx = MultirateContext::new(factor);
    let mut n = 0usize;
    let out = ctx.render(9600, || {
        let y = libm::sin(TAU * hz * n as f64 / up);
        n += 1;
        y
    });
    to_db(rms(&out[4800..]) / core::f64::consts::FRAC_1_SQRT_2)
}

#[test]
fn decimation_rejects_content_above_output_nyquist() {
    for factor in [OversampleFactor::X2, OversampleFactor::X16, OversampleFactor::X64] {
        for hz in [30_000.0, 36_000.0] {
            let db = tone_through(factor, hz);
            assert!(db < -60.0, "{factor}x at {hz} Hz: {db:.1} dB");
        }
    }
}

#[test]
fn decimation_rejects_first_stage_fold_back() {
    // At 96 kHz these land on 23 kHz and 1 kHz, both inside the half-band passband.
    for factor in [OversampleFactor::X16, OversampleFactor::X64] {
        for hz in [73_000.0, 95_000.0] {
            let db = tone_through(factor, hz);
            assert!(db < -60.0, "{factor}x at {hz} Hz: {db:.1} dB");
        }
    }
}

#[test]
fn decimation_passes_audio_band() {
    for factor in OversampleFactor::ALL {
        let db = tone_through(factor, 1000.0);
        assert!(db.abs() < 0.1, "{factor}x: {db:.3} dB");
    }
}

#[test]
fn render_length_is_floor_of_duration() {
    let len = output_length(SAMPLE_RATE, 0.0123);
    assert_eq!(len, 590);

    let mut calls = 0usize;
    let mut ctx = MultirateContext::new(OversampleFactor::X64);
    let out = ctx.render(len, || {
        calls += 1;
        0.0
    });
    assert_eq!(out.len(), 590);
    assert_eq!(calls, 590 * 64);
}

//! Percussion voice: noise burst into allpass diffusers into a resonant FDN.
//!
//! # Signal Flow
//!
//! ```text
//! noise ─► complex LP ─► long allpass ─► tanh ─┬─────────────► lerp(wire_mix) ─► × N ─►
//!                                              └─► wire allpass × env ─┘
//!
//!    ─► FDN (or two FDNs coupled by collisions, crossfaded by fdn_mix)
//!    ─► DC highpass ─► tone slope ─► limiter
//! ```
//!
//! The FDN taps are bandpassed delays tuned to a [`PitchType`] series. A
//! double-EMA envelope bends their pitch through the log-domain modulation
//! input, and loud excitation shortens them through the tap's slew-limited
//! time modulation.
//!
//! # Random draw order
//!
//! Long allpass (4), wire allpass (4), primary taps (2 each), secondary taps
//! (2 each, only with `fdn_mix > ε`), then one draw per sample while the
//! noise burst is audible.

use clangor_core::{
    CollisionPair, ComplexLowpass, CouplingMatrix, CoupledFdn, CrossGainGuard,
    DoubleEmaAdEnvelope, EPSILON, ExpDecay, FdnCore, FilteredDelayLine, FilteredDelayParams,
    Interpolation, LimiterKind, OutputLimiter, RandomStream, SerialAllpass, SlopeFilter, Svf,
    SvfMode, lerp,
};
use core::f64::consts::{FRAC_1_SQRT_2, LN_2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::RenderParams;
use crate::pitch::{PitchSeries, PitchType};
use crate::voice::Voice;

/// Largest FDN the percussion voice builds.
pub const MAX_MATRIX_SIZE: usize = 64;
/// Longest FDN tap delay; lower tunings saturate here.
pub const MAX_TAP_SECONDS: f64 = 0.1;

/// Allpass stages in the hit and wire diffusers.
const ALLPASS_STAGES: usize = 4;
/// Pole radius of the noise colouring filter.
const NOISE_LOWPASS_RADIUS: f64 = 0.9;
/// Noise burst level reached after `noise_decay_seconds`.
const NOISE_DECAY_TARGET: f64 = 1e-3;
/// Start level of the wire envelope before `tanh`.
const WIRE_ENVELOPE_START: f64 = 4.0;
/// Collision energy-store decay time.
const COLLISION_DECAY_SECONDS: f64 = 0.001;
/// Limiter hold time.
const LIMITER_SUSTAIN_SECONDS: f64 = 0.001;
/// Corner of the first tone-slope shelf.
const SLOPE_START_HZ: f64 = 1000.0;
/// Sample rate at which `delay_time_mod_amount` is specified.
const MOD_REFERENCE_RATE: f64 = 48000.0;

/// Parameters of a [`DrumVoice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrumParams {
    /// Render-wide settings.
    pub render: RenderParams,

    /// Output stage.
    #[serde(with = "crate::serde_str")]
    pub limiter: LimiterKind,
    /// Output ceiling (limiter) or saturation scale (tanh).
    pub limiter_threshold: f64,
    /// Limiter look-ahead and gain smoothing time.
    pub limiter_smoothing_seconds: f64,

    /// Time for the noise burst to fall by 60 dB.
    pub noise_decay_seconds: f64,
    /// Colour of the noise burst.
    pub noise_lowpass_hz: f64,
    /// Inverse of the average stage time of the long allpass.
    pub allpass_max_time_hz: f64,

    /// Inverse of the average stage time of the wire allpass.
    pub wire_frequency_hz: f64,
    /// Decay time of the wire envelope.
    pub wire_decay_seconds: f64,
    /// Crossfade from the hit to the wire signal.
    pub wire_mix: f64,

    /// Pitch bend depth in octaves.
    pub envelope_mod_amount: f64,
    /// Pitch bend attack time.
    pub envelope_attack_seconds: f64,
    /// Pitch bend decay time.
    pub envelope_decay_seconds: f64,

    /// Number of FDN taps.
    pub matrix_size: usize,
    /// Base cross gain of the FDN.
    pub cross_feedback_gain: f64,
    /// Per-tap weights of the Householder vector (squared before use);
    /// missing entries are 1.
    pub cross_feedback_ratio: Vec<f64>,

    /// Fundamental of the delay taps.
    pub delay_time_hz: f64,
    /// Blend from unison (0) to the full pitch series (1) for delay times.
    pub delay_time_spread: f64,
    /// Gain from input level to delay shortening, in samples at 48 kHz.
    pub delay_time_mod_amount: f64,
    /// Read interpolation of the delay taps.
    #[serde(with = "crate::serde_str")]
    pub delay_interpolation: Interpolation,
    /// Bandpass cutoff offset from the tap pitch, in octaves.
    pub bandpass_cut_ratio: f64,
    /// Blend from unison (0) to the full pitch series (1) for cutoffs.
    pub bandpass_cut_spread: f64,
    /// Bandpass Q.
    pub bandpass_q: f64,
    /// Partial series of the taps.
    #[serde(with = "crate::serde_str")]
    pub pitch_type: PitchType,
    /// Random detune range per tap, ± cents.
    pub pitch_random_cents: f64,

    /// Crossfade from the primary to the secondary FDN; above ε the
    /// secondary is built and coupled by collisions.
    pub fdn_mix: f64,
    /// Pitch offset of the secondary FDN in octaves.
    pub secondary_delay_offset: f64,
    /// Gap below which the two FDNs collide; 0 disables coupling.
    pub collision_distance: f64,

    /// DC blocker corner; 0 disables it.
    pub dc_highpass_hz: f64,
    /// Gain per octave above 1 kHz; 1 is flat.
    pub tone_slope: f64,
}

impl Default for DrumParams {
    fn default() -> Self {
        Self {
            render: RenderParams::default(),
            limiter: LimiterKind::Limiter,
            limiter_threshold: 1.0,
            limiter_smoothing_seconds: 0.02,
            noise_decay_seconds: 0.08,
            noise_lowpass_hz: 50.0,
            allpass_max_time_hz: 3000.0,
            wire_frequency_hz: 100.0,
            wire_decay_seconds: 2.0,
            wire_mix: 0.0,
            envelope_mod_amount: 0.0,
            envelope_attack_seconds: 0.02,
            envelope_decay_seconds: 2.0,
            matrix_size: 6,
            cross_feedback_gain: 0.98,
            cross_feedback_ratio: Vec::new(),
            delay_time_hz: 120.0,
            delay_time_spread: 1.0,
            delay_time_mod_amount: 0.0,
            delay_interpolation: Interpolation::Linear,
            bandpass_cut_ratio: 0.0,
            bandpass_cut_spread: 1.0,
            bandpass_q: 1.0,
            pitch_type: PitchType::Harmonic,
            pitch_random_cents: 0.0,
            fdn_mix: 0.0,
            secondary_delay_offset: 0.0,
            collision_distance: 0.0,
            dc_highpass_hz: 4.0,
            tone_slope: 1.0,
        }
    }
}

impl DrumParams {
    /// Tap count clamped to `1..=MAX_MATRIX_SIZE`.
    pub fn tap_count(&self) -> usize {
        self.matrix_size.clamp(1, MAX_MATRIX_SIZE)
    }

    /// Whether the secondary FDN is built.
    pub fn is_coupled(&self) -> bool {
        self.fdn_mix > EPSILON
    }
}

/// Resonator section of a [`DrumVoice`].
#[derive(Debug, Clone)]
enum Resonator {
    Single(FdnCore),
    Coupled { networks: CoupledFdn<FilteredDelayLine>, mix: f64 },
}

impl Resonator {
    #[inline]
    fn process(&mut self, excitation: f64, modulation: f64) -> f64 {
        match self {
            Self::Single(fdn) => fdn.process(excitation, modulation),
            Self::Coupled { networks, mix } => networks.process_mix(excitation, modulation, *mix),
        }
    }
}

/// One channel of the percussion instrument.
#[derive(Debug, Clone)]
pub struct DrumVoice {
    rng: RandomStream,
    noise: ExpDecay,
    noise_lowpass: ComplexLowpass,
    envelope: DoubleEmaAdEnvelope,
    hit: SerialAllpass,
    wire: SerialAllpass,
    wire_envelope: ExpDecay,
    wire_mix: f64,
    resonator: Resonator,
    excitation_gain: f64,
    dc_highpass: Option<(Svf, f64)>,
    slope: Option<SlopeFilter>,
    limiter: OutputLimiter,
    preroll_limit: usize,
}

impl DrumVoice {
    /// Builds a voice from `params`, drawing every random value from `seed`.
    pub fn new(params: &DrumParams, seed: u64) -> Self {
        let render = &params.render;
        let up_rate = render.up_rate();
        let fold = render.oversample.fold();
        let taps = params.tap_count();
        let mut rng = RandomStream::new(seed);

        let mut envelope = DoubleEmaAdEnvelope::new();
        envelope.note_on(
            params.envelope_mod_amount * LN_2,
            up_rate * params.envelope_attack_seconds,
            up_rate * params.envelope_decay_seconds,
        );

        let hit =
            SerialAllpass::randomized(&mut rng, up_rate, ALLPASS_STAGES, params.allpass_max_time_hz);
        let wire =
            SerialAllpass::randomized(&mut rng, up_rate, ALLPASS_STAGES, params.wire_frequency_hz);

        let series = PitchSeries::new(params.pitch_type, taps);
        let primary = build_network(params, &series, up_rate, fold, &mut rng, 1.0);
        let resonator = if params.is_coupled() {
            let offset = libm::exp2(params.secondary_delay_offset);
            let secondary = build_network(params, &series, up_rate, fold, &mut rng, offset);
            let pair = CollisionPair::new(
                params.collision_distance,
                up_rate * COLLISION_DECAY_SECONDS,
            );
            Resonator::Coupled {
                networks: CoupledFdn::new(primary, secondary, pair),
                mix: params.fdn_mix,
            }
        } else {
            Resonator::Single(primary)
        };

        debug!(
            taps,
            coupled = params.is_coupled(),
            pitch = ?params.pitch_type,
            up_rate,
            "drum voice built"
        );

        Self {
            rng,
            noise: ExpDecay::new(
                1.0,
                NOISE_DECAY_TARGET,
                up_rate * params.noise_decay_seconds,
            ),
            noise_lowpass: ComplexLowpass::new(
                params.noise_lowpass_hz / up_rate,
                NOISE_LOWPASS_RADIUS,
            ),
            envelope,
            hit,
            wire,
            wire_envelope: ExpDecay::new(
                WIRE_ENVELOPE_START,
                EPSILON,
                up_rate * params.wire_decay_seconds,
            ),
            wire_mix: params.wire_mix,
            resonator,
            excitation_gain: taps as f64,
            dc_highpass: (params.dc_highpass_hz > 0.0)
                .then(|| (Svf::new(), params.dc_highpass_hz / up_rate)),
            slope: (params.tone_slope < 1.0)
                .then(|| SlopeFilter::new(up_rate, SLOPE_START_HZ, params.tone_slope)),
            limiter: OutputLimiter::new(
                params.limiter,
                params.limiter_smoothing_seconds * up_rate,
                LIMITER_SUSTAIN_SECONDS * up_rate,
                0.0,
                params.limiter_threshold,
            ),
            preroll_limit: libm::ceil(up_rate).max(1.0) as usize,
        }
    }
}

/// Delay in samples of a tap tuned to `hz`, capped at [`MAX_TAP_SECONDS`].
fn tap_delay_samples(up_rate: f64, hz: f64) -> f64 {
    (up_rate / hz.max(EPSILON)).min(MAX_TAP_SECONDS * up_rate)
}

/// Builds one FDN; `offset` scales every tap frequency.
///
/// Draws two values per tap: the delay detune, then the cutoff detune.
fn build_network(
    params: &DrumParams,
    series: &PitchSeries,
    up_rate: f64,
    fold: usize,
    rng: &mut RandomStream,
    offset: f64,
) -> FdnCore {
    let taps = series.len();
    let delay_hz = offset * params.delay_time_hz;
    let cut_hz = delay_hz * libm::exp2(params.bandpass_cut_ratio);
    let detune = LN_2 * params.pitch_random_cents / 1200.0;
    let mod_amount =
        params.delay_time_mod_amount * fold as f64 * render_scaler(&params.render);

    let mut ratio = |index: usize, spread: f64| {
        lerp(1.0, series.ratio(index), spread) * libm::exp(rng.uniform(-detune, detune))
    };

    let lines = (0..taps)
        .map(|i| {
            let delay_ratio = ratio(i, params.delay_time_spread);
            let cut_ratio = ratio(i, params.bandpass_cut_spread);
            FilteredDelayLine::new(FilteredDelayParams {
                delay_samples: tap_delay_samples(up_rate, delay_hz * delay_ratio),
                cutoff: cut_hz * cut_ratio / up_rate,
                q: params.bandpass_q,
                mod_amount,
                mode: SvfMode::Bandpass,
                interpolation: params.delay_interpolation,
                ..Default::default()
            })
        })
        .collect();

    let weights: Vec<f64> = (0..taps)
        .map(|i| {
            let w = params.cross_feedback_ratio.get(i).copied().unwrap_or(1.0);
            w * w
        })
        .collect();
    let matrix = CouplingMatrix::householder(&weights);
    let guard = CrossGainGuard::new(params.cross_feedback_gain, up_rate, fold, taps);
    FdnCore::new(lines, matrix, guard)
}

/// Output-rate scaling of the time modulation depth.
fn render_scaler(render: &RenderParams) -> f64 {
    render.sample_rate / MOD_REFERENCE_RATE
}

impl Voice for DrumVoice {
    #[inline]
    fn process(&mut self) -> f64 {
        let mut sig = 0.0;
        if self.noise.value() > EPSILON {
            let gain = self.noise.process();
            sig += self.noise_lowpass.process(gain * self.rng.uniform(-1.0, 1.0));
        }

        let env = self.envelope.process();

        let hit = libm::tanh(self.hit.process(sig));
        let wire = self.wire.process(hit) * libm::tanh(self.wire_envelope.process());
        sig = lerp(hit, wire, self.wire_mix);

        sig = self.resonator.process(sig * self.excitation_gain, env);

        if let Some((filter, cutoff)) = &mut self.dc_highpass {
            sig = filter.process_mode(sig, *cutoff, FRAC_1_SQRT_2, SvfMode::Highpass);
        }
        if let Some(slope) = &mut self.slope {
            sig = slope.process(sig);
        }
        self.limiter.process(sig)
    }

    /// Skips the silent lead-in of the resonator and limiter delay, giving
    /// up after one second of internal samples.
    fn first_sample(&mut self) -> f64 {
        for _ in 0..self.preroll_limit {
            let sig = self.process();
            if sig != 0.0 {
                return sig;
            }
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clangor_core::OversampleFactor;

    fn quick_params() -> DrumParams {
        DrumParams {
            render: RenderParams {
                oversample: OversampleFactor::X1,
                seed: 11,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn run(voice: &mut DrumVoice, len: usize) -> Vec<f64> {
        let first = voice.first_sample();
        core::iter::once(first)
            .chain((1..len).map(|_| voice.process()))
            .collect()
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let params = quick_params();
        let a = run(&mut DrumVoice::new(&params, 5), 4000);
        let b = run(&mut DrumVoice::new(&params, 5), 4000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_differs() {
        let params = quick_params();
        let a = run(&mut DrumVoice::new(&params, 5), 4000);
        let b = run(&mut DrumVoice::new(&params, 6), 4000);
        assert_ne!(a, b);
    }

    #[test]
    fn test_first_sample_skips_silence() {
        let mut voice = DrumVoice::new(&quick_params(), 1);
        assert_ne!(voice.first_sample(), 0.0);
    }

    #[test]
    fn test_limiter_holds_threshold() {
        let params = DrumParams {
            limiter_threshold: 0.25,
            cross_feedback_gain: 1.5,
            ..quick_params()
        };
        let out = run(&mut DrumVoice::new(&params, 2), 20_000);
        assert!(out.iter().all(|v| v.abs() <= 0.25), "ceiling exceeded");
        assert!(out.iter().any(|v| v.abs() > 0.0));
    }

    #[test]
    fn test_coupled_mode_is_finite() {
        let params = DrumParams {
            fdn_mix: 0.5,
            collision_distance: 0.1,
            secondary_delay_offset: 0.5,
            envelope_mod_amount: 1.0,
            delay_time_mod_amount: 20.0,
            ..quick_params()
        };
        let voice = DrumVoice::new(&params, 3);
        assert!(matches!(voice.resonator, Resonator::Coupled { .. }));
        let out = run(&mut voice.clone(), 20_000);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_matrix_size_is_clamped() {
        let empty = DrumParams {
            matrix_size: 0,
            ..quick_params()
        };
        assert_eq!(empty.tap_count(), 1);
        let huge = DrumParams {
            matrix_size: 1000,
            ..quick_params()
        };
        assert_eq!(huge.tap_count(), MAX_MATRIX_SIZE);
        let mut voice = DrumVoice::new(&empty, 0);
        assert!(voice.first_sample().is_finite());
    }

    #[test]
    fn test_short_ratio_list_is_padded() {
        let params = DrumParams {
            matrix_size: 4,
            cross_feedback_ratio: vec![0.5],
            ..quick_params()
        };
        let mut rng = RandomStream::new(0);
        let series = PitchSeries::new(params.pitch_type, 4);
        let fdn = build_network(&params, &series, 48000.0, 1, &mut rng, 1.0);
        assert_eq!(fdn.size(), 4);
        assert!(fdn.matrix().orthogonality_error() < 1e-12);
    }

    #[test]
    fn test_bypass_tanh_and_limiter_differ() {
        let mut outputs = Vec::new();
        for limiter in LimiterKind::ALL {
            let params = DrumParams {
                limiter,
                ..quick_params()
            };
            outputs.push(run(&mut DrumVoice::new(&params, 4), 6000));
        }
        assert_ne!(outputs[0], outputs[1]);
        assert_ne!(outputs[0], outputs[2]);
    }

    #[test]
    fn test_params_from_partial_toml() {
        let params: DrumParams = toml::from_str(
            r#"
            matrix_size = 12
            pitch_type = "circular-membrane-mode"
            delay_interpolation = "cubic"
            limiter = "tanh"

            [render]
            oversample = 16
            "#,
        )
        .unwrap();
        assert_eq!(params.matrix_size, 12);
        assert_eq!(params.pitch_type, PitchType::CircularMembraneMode);
        assert_eq!(params.delay_interpolation, Interpolation::Cubic);
        assert_eq!(params.limiter, LimiterKind::Tanh);
        assert_eq!(params.render.oversample, OversampleFactor::X16);
        assert_eq!(params.delay_time_hz, DrumParams::default().delay_time_hz);
    }

    #[test]
    fn test_low_tuning_caps_tap_memory() {
        let params = DrumParams {
            delay_time_hz: 1.0,
            delay_time_spread: 0.0,
            pitch_random_cents: 0.0,
            matrix_size: MAX_MATRIX_SIZE,
            ..quick_params()
        };
        let voice = DrumVoice::new(&params, 3);
        let Resonator::Single(fdn) = &voice.resonator else {
            panic!("expected a single network");
        };
        let limit = (2.0 * MAX_TAP_SECONDS * params.render.up_rate()) as usize + 16;
        assert_eq!(fdn.size(), MAX_MATRIX_SIZE);
        for tap in fdn.taps() {
            assert!(tap.capacity() <= limit, "capacity {}", tap.capacity());
        }
    }

    #[test]
    fn test_tap_delay_is_capped() {
        assert_eq!(tap_delay_samples(48000.0, 100.0), 480.0);
        assert_eq!(tap_delay_samples(48000.0, 1.0), 4800.0);
        assert_eq!(tap_delay_samples(48000.0, 0.0), 4800.0);
    }

    #[test]
    fn test_pitch_type_accepts_menu_index() {
        let params: DrumParams = toml::from_str("pitch_type = 6").unwrap();
        assert_eq!(params.pitch_type, PitchType::CircularMembraneMode);

        let text = toml::to_string(&params).unwrap();
        assert!(text.contains("pitch_type = \"circular-membrane-mode\""), "got:\n{text}");
        assert!(toml::from_str::<DrumParams>("pitch_type = 9").is_err());
    }
}

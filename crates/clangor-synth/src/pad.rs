//! FM pad voice: stacked FM oscillators into a flanger and an FDN reverb.
//!
//! # Signal Flow
//!
//! ```text
//! Σ FmPair / count ─► open ramp ─► flanger (multi-tap, exp LFO) ─► + reverb_mix · FDN ─► tone slope
//! ```
//!
//! Oscillators are laid out as unison voices × chord notes × FM stack. The
//! stack spaces carriers by powers of `stack_ratio` (wrapped into
//! `stack_octave_wrap` octaves) and staggers their attacks, so the upper
//! partials bloom one after another.
//!
//! The reverb is an 8-tap FDN of plain delays, each followed by a double-EMA
//! lowpass and an EMA highpass.

use clangor_core::fdn::FAST_GUARD_LEVEL;
use clangor_core::{
    CouplingMatrix, CrossGainGuard, DelayLine, DelayTap, DelayedDecayEnvelope, DoubleEmaFilter,
    EmaHighpass, FdnCore, FmPair, MatrixFamily, MultiTapDelay, RandomStream, SineLfo,
    SlopeFilter, lerp, uniform_int_map,
};
use core::f64::consts::LN_2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::RenderParams;
use crate::voice::Voice;

/// Just-intonation ratios selectable as chord notes, one per index.
pub const JUST_INTONATION: [f64; 26] = [
    1.0 / 1.0,
    16.0 / 15.0,
    15.0 / 14.0,
    14.0 / 13.0,
    10.0 / 9.0,
    9.0 / 8.0,
    8.0 / 7.0,
    6.0 / 5.0,
    5.0 / 4.0,
    4.0 / 3.0,
    45.0 / 32.0,
    25.0 / 18.0,
    7.0 / 5.0,
    17.0 / 12.0,
    64.0 / 45.0,
    36.0 / 25.0,
    10.0 / 7.0,
    24.0 / 17.0,
    3.0 / 2.0,
    8.0 / 5.0,
    5.0 / 3.0,
    16.0 / 9.0,
    9.0 / 5.0,
    7.0 / 4.0,
    15.0 / 8.0,
    13.0 / 7.0,
];

/// Taps of the reverb FDN.
pub const REVERB_TAPS: usize = 8;
/// Longest reverb tap time.
pub const MAX_REVERB_SECONDS: f64 = 1.0;
/// Most unison voices.
pub const MAX_UNISON: usize = 16;
/// Most oscillators per FM stack.
pub const MAX_STACK: usize = 8;
/// Most flanger taps.
pub const MAX_FLANGER_TAPS: usize = 64;

const FLANGER_MAX_SECONDS: f64 = 0.1;
const OPEN_RAMP_SECONDS: f64 = 0.002;
const ATTACK_HEIGHT: f64 = 0.25;
const SLOPE_START_HZ: f64 = 1000.0;

/// Parameters of a [`PadVoice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadParams {
    /// Render-wide settings.
    pub render: RenderParams,

    /// Root frequency.
    pub frequency_hz: f64,
    /// Unison voices per chord note.
    pub unison_count: usize,
    /// Detune of the last unison voice, in cents.
    pub unison_pitch_spread_cents: f64,
    /// Extra random detune per unison voice, up to this many cents.
    pub cents_randomize: f64,
    /// Random octave shift per unison voice, up to this many octaves.
    pub octave_randomize: u32,

    /// Oscillators per FM stack.
    pub stack_count: usize,
    /// Carrier ratio between neighbouring stack oscillators.
    pub stack_ratio: f64,
    /// Octave span that stack ratios wrap into; 0 disables wrapping.
    pub stack_octave_wrap: f64,
    /// Chord notes as indices into [`JUST_INTONATION`].
    pub chord_notes: Vec<usize>,

    /// Attack of the first stack oscillator; later ones are multiples.
    pub attack_seconds: f64,
    /// Decay of every FM envelope.
    pub decay_seconds: f64,
    /// Peak phase-modulation depth in radians.
    pub fm_index: f64,

    /// Flanger read taps.
    pub flanger_taps: usize,
    /// Inverse of the longest flanger tap time.
    pub delay_base_hz: f64,
    /// Random pitch range of each tap time, `[1/r, r]`.
    pub delay_random_ratio: f64,
    /// Flanger LFO rate.
    pub lfo_freq_hz: f64,
    /// Flanger LFO depth in octaves.
    pub lfo_amount: f64,
    /// Flanger LFO start phase in cycles, before a random offset.
    pub lfo_initial_phase: f64,
    /// Crossfade from dry to flanger.
    pub flanger_mix: f64,

    /// Reverb return level.
    pub reverb_mix: f64,
    /// Reverb feedback gain.
    pub reverb_feedback: f64,
    /// Longest reverb tap time.
    pub reverb_seconds: f64,
    /// Highpass corner of each reverb tap.
    pub reverb_highpass_hz: f64,
    /// Reverb feedback matrix.
    #[serde(with = "crate::serde_str")]
    pub reverb_matrix: MatrixFamily,

    /// Gain per octave above 1 kHz; 1 is flat.
    pub tone_slope: f64,
}

impl Default for PadParams {
    fn default() -> Self {
        Self {
            render: RenderParams {
                duration_seconds: 4.0,
                ..Default::default()
            },
            frequency_hz: 220.0,
            unison_count: 2,
            unison_pitch_spread_cents: 12.0,
            cents_randomize: 0.0,
            octave_randomize: 0,
            stack_count: 3,
            stack_ratio: 1.5,
            stack_octave_wrap: 1.0,
            chord_notes: vec![0, 8, 18],
            attack_seconds: 0.2,
            decay_seconds: 3.0,
            fm_index: 1.0,
            flanger_taps: 4,
            delay_base_hz: 200.0,
            delay_random_ratio: 1.1,
            lfo_freq_hz: 0.25,
            lfo_amount: 0.1,
            lfo_initial_phase: 0.0,
            flanger_mix: 0.5,
            reverb_mix: 0.3,
            reverb_feedback: 0.9,
            reverb_seconds: 0.1,
            reverb_highpass_hz: 20.0,
            reverb_matrix: MatrixFamily::SpecialOrthogonal,
            tone_slope: 1.0,
        }
    }
}

impl PadParams {
    /// Chord ratios in table order; unknown indices are skipped and an
    /// empty chord falls back to the root.
    pub fn chord_ratios(&self) -> Vec<f64> {
        let mut notes: Vec<usize> = self
            .chord_notes
            .iter()
            .copied()
            .filter(|&i| i < JUST_INTONATION.len())
            .collect();
        notes.sort_unstable();
        notes.dedup();
        if notes.is_empty() {
            return vec![1.0];
        }
        notes.into_iter().map(|i| JUST_INTONATION[i]).collect()
    }

    /// Carrier ratio of stack oscillator `index`.
    pub fn stack_carrier_ratio(&self, index: usize) -> f64 {
        let octaves = index as f64 * libm::log2(self.stack_ratio.max(f64::MIN_POSITIVE));
        if self.stack_octave_wrap > 0.0 {
            libm::exp2(octaves % self.stack_octave_wrap)
        } else {
            libm::exp2(octaves)
        }
    }

    /// Seconds until the last stack envelope ends.
    pub fn dry_seconds(&self) -> f64 {
        let stack = self.stack_count.clamp(1, MAX_STACK) as f64;
        stack * self.attack_seconds.max(0.0)
            + self.decay_seconds.max(0.0)
            + DelayedDecayEnvelope::TRANSITION_SECONDS
    }
}

/// One reverb path: delay, double-EMA lowpass, EMA highpass.
#[derive(Debug, Clone)]
pub struct ReverbTap {
    line: DelayLine,
    time: f64,
    lowpass: DoubleEmaFilter,
    highpass: EmaHighpass,
}

impl ReverbTap {
    /// Creates a tap delaying by `time` samples, with normalized lowpass and
    /// highpass corners.
    pub fn new(time: f64, lowpass_cutoff: f64, highpass_cutoff: f64) -> Self {
        let mut lowpass = DoubleEmaFilter::default();
        lowpass.set_cutoff(lowpass_cutoff);
        let mut highpass = EmaHighpass::default();
        highpass.set_cutoff(highpass_cutoff);
        Self {
            line: DelayLine::with_max_delay(time),
            time,
            lowpass,
            highpass,
        }
    }
}

impl DelayTap for ReverbTap {
    #[inline]
    fn process(&mut self, input: f64, _modulation: f64) -> f64 {
        let delayed = self.line.process(input, self.time);
        self.highpass.process(self.lowpass.process(delayed))
    }

    fn reset(&mut self) {
        self.line.clear();
        self.lowpass.reset(0.0);
        self.highpass.reset();
    }
}

/// One channel of the FM pad.
#[derive(Debug, Clone)]
pub struct PadVoice {
    oscillators: Vec<FmPair>,
    oscillator_gain: f64,
    open: DoubleEmaFilter,
    flanger: MultiTapDelay,
    base_times: Vec<f64>,
    times: Vec<f64>,
    flanger_gain: f64,
    flanger_mix: f64,
    lfo: SineLfo,
    lfo_freq: f64,
    lfo_scale: f64,
    reverb: FdnCore<ReverbTap>,
    reverb_mix: f64,
    slope: Option<SlopeFilter>,
    dry_length: usize,
}

impl PadVoice {
    /// Builds a voice from `params`, drawing every random value from `seed`.
    ///
    /// Draw order: matrix seed, reverb taps (2 each), flanger taps, LFO
    /// phase, stack modulators, then per unison voice its detune, octave,
    /// and two phases per oscillator.
    pub fn new(params: &PadParams, seed: u64) -> Self {
        let render = &params.render;
        let up_rate = render.up_rate();
        let fold = render.oversample.fold();
        let mut rng = RandomStream::new(seed);

        let reverb = build_reverb(params, up_rate, fold, &mut rng);

        let taps = params.flanger_taps.clamp(1, MAX_FLANGER_TAPS);
        let random_ratio = params.delay_random_ratio.max(1.0);
        let base_times: Vec<f64> = (0..taps)
            .map(|i| {
                let position = (i + 1) as f64 / taps as f64;
                let pitch = rng.exponential(1.0 / random_ratio, random_ratio);
                position * up_rate / (params.delay_base_hz * pitch).max(f64::MIN_POSITIVE)
            })
            .collect();
        let lfo = SineLfo::new(params.lfo_initial_phase + rng.next_f64());

        let mut open = DoubleEmaFilter::default();
        open.set_time(OPEN_RAMP_SECONDS * up_rate);
        open.reset(0.0);

        let oscillators = build_oscillators(params, up_rate, &mut rng);
        let dry_length = libm::ceil(render.sample_rate * params.dry_seconds()) as usize;

        debug!(
            oscillators = oscillators.len(),
            flanger_taps = taps,
            matrix = %params.reverb_matrix,
            up_rate,
            "pad voice built"
        );

        Self {
            oscillator_gain: 1.0 / oscillators.len().max(1) as f64,
            oscillators,
            open,
            flanger: MultiTapDelay::new(FLANGER_MAX_SECONDS * up_rate, taps),
            times: vec![0.0; taps],
            base_times,
            flanger_gain: 1.0 / taps as f64,
            flanger_mix: params.flanger_mix,
            lfo,
            lfo_freq: params.lfo_freq_hz / up_rate,
            lfo_scale: LN_2 * params.lfo_amount,
            reverb,
            reverb_mix: params.reverb_mix,
            slope: (params.tone_slope < 1.0)
                .then(|| SlopeFilter::new(up_rate, SLOPE_START_HZ, params.tone_slope)),
            dry_length,
        }
    }

    /// Number of FM oscillators.
    pub fn oscillator_count(&self) -> usize {
        self.oscillators.len()
    }
}

fn build_reverb(
    params: &PadParams,
    up_rate: f64,
    fold: usize,
    rng: &mut RandomStream,
) -> FdnCore<ReverbTap> {
    let matrix = CouplingMatrix::build(params.reverb_matrix, REVERB_TAPS, rng.next_u64());
    let longest = up_rate * params.reverb_seconds.clamp(0.0, MAX_REVERB_SECONDS);
    let highpass = params.reverb_highpass_hz / up_rate;
    let taps = (0..REVERB_TAPS)
        .map(|_| {
            let time = longest * rng.exponential(0.01, 1.0);
            let lowpass = rng.exponential(4000.0 / up_rate, 0.49998);
            ReverbTap::new(time, lowpass, highpass)
        })
        .collect();
    let guard = CrossGainGuard::new(params.reverb_feedback, up_rate, fold, REVERB_TAPS)
        .with_threshold(FAST_GUARD_LEVEL);
    FdnCore::new(taps, matrix, guard)
}

fn build_oscillators(params: &PadParams, up_rate: f64, rng: &mut RandomStream) -> Vec<FmPair> {
    let stack = params.stack_count.clamp(1, MAX_STACK);
    let unison = params.unison_count.clamp(1, MAX_UNISON);

    let carriers: Vec<f64> = (0..stack).map(|i| params.stack_carrier_ratio(i)).collect();
    let modulators: Vec<f64> = carriers
        .iter()
        .map(|&carrier| {
            let octave = libm::exp2(4.0 - libm::floor(libm::log2(carrier)));
            octave + rng.uniform(-4.0 / 12.0, 2.0 / 12.0)
        })
        .collect();
    let envelopes: Vec<DelayedDecayEnvelope> = (0..stack)
        .map(|i| {
            DelayedDecayEnvelope::new(
                up_rate,
                (i + 1) as f64 * params.attack_seconds,
                ATTACK_HEIGHT,
                params.decay_seconds,
            )
        })
        .collect();
    let chord = params.chord_ratios();

    let base_freq = params.frequency_hz / up_rate;
    let mut oscillators = Vec::with_capacity(unison * chord.len() * stack);
    for u in 0..unison {
        let position = if unison > 1 {
            u as f64 / (unison - 1) as f64
        } else {
            0.0
        };
        let cents = params.unison_pitch_spread_cents * position
            + rng.uniform(0.0, params.cents_randomize);
        let octave = uniform_int_map(rng.next_f64(), 0, i64::from(params.octave_randomize));
        let unison_freq = base_freq * libm::exp2(octave as f64 + cents / 1200.0);

        for &note in &chord {
            let note_freq = unison_freq * note;
            for ((&carrier, &modulator), envelope) in
                carriers.iter().zip(&modulators).zip(&envelopes)
            {
                let carrier_phase = rng.next_f64();
                let modulator_phase = rng.next_f64();
                oscillators.push(FmPair::new(
                    (note_freq * carrier, carrier_phase),
                    (note_freq * modulator, modulator_phase),
                    envelope.clone(),
                    params.fm_index,
                ));
            }
        }
    }
    oscillators
}

impl Voice for PadVoice {
    #[inline]
    fn process(&mut self) -> f64 {
        let sum: f64 = self.oscillators.iter_mut().map(FmPair::process).sum();
        let mut sig = sum * self.oscillator_gain * self.open.process(1.0);

        let lfo = libm::exp(self.lfo_scale * self.lfo.process(self.lfo_freq));
        for (time, &base) in self.times.iter_mut().zip(&self.base_times) {
            *time = base * lfo;
        }
        self.flanger.set_times(&self.times);
        let flanger = self.flanger.process(sig) * self.flanger_gain;
        sig = lerp(sig, flanger, self.flanger_mix);

        sig += self.reverb_mix * self.reverb.process(sig * REVERB_TAPS as f64, 0.0);

        if let Some(slope) = &mut self.slope {
            sig = slope.process(sig);
        }
        sig
    }

    fn dry_length(&self) -> Option<usize> {
        Some(self.dry_length)
    }
}

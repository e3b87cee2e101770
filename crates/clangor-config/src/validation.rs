//! Parameter range validation and clamping.
//!
//! Every numeric instrument knob has a fixed range. The `validate_*`
//! functions report values outside it; the `clamp_*` functions pull them
//! back in. The synth engine assumes clamped input, so anything that comes
//! from a user goes through one or the other before rendering.
//!
//! # Example
//!
//! ```rust
//! use clangor_config::{clamp_drum, validate_drum};
//! use clangor_synth::DrumParams;
//!
//! let mut params = DrumParams::default();
//! params.wire_mix = 3.0;
//! assert!(validate_drum(&params).is_err());
//!
//! clamp_drum(&mut params);
//! assert_eq!(params.wire_mix, 1.0);
//! assert!(validate_drum(&params).is_ok());
//! ```

use clangor_synth::pad::{MAX_FLANGER_TAPS, MAX_REVERB_SECONDS, MAX_STACK, MAX_UNISON};
use clangor_synth::{
    DrumParams, Instrument, JUST_INTONATION, MAX_MATRIX_SIZE, MAX_UP_RATE, PadParams,
    RenderParams,
};
use thiserror::Error;

use crate::Preset;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Parameter value out of range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the parameter.
        param: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Parameter is NaN or infinite.
    #[error("parameter '{param}' is not finite")]
    NotFinite {
        /// Name of the parameter.
        param: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Walks the numeric fields of a parameter struct.
///
/// `field` receives the current value and its range and returns the value
/// to store back.
trait Visitor {
    fn field(&mut self, name: &str, value: f64, min: f64, max: f64) -> f64;

    fn float(&mut self, name: &str, value: &mut f64, min: f64, max: f64) {
        *value = self.field(name, *value, min, max);
    }

    fn count(&mut self, name: &str, value: &mut usize, min: usize, max: usize) {
        *value = self.field(name, *value as f64, min as f64, max as f64) as usize;
    }
}

/// Collects range errors without changing anything.
#[derive(Default)]
struct Checker {
    errors: Vec<ValidationError>,
}

impl Visitor for Checker {
    fn field(&mut self, name: &str, value: f64, min: f64, max: f64) -> f64 {
        if !value.is_finite() {
            self.errors.push(ValidationError::NotFinite {
                param: name.to_string(),
            });
        } else if value < min || value > max {
            self.errors.push(ValidationError::OutOfRange {
                param: name.to_string(),
                value,
                min,
                max,
            });
        }
        value
    }
}

impl Checker {
    fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

struct Clamper;

impl Visitor for Clamper {
    fn field(&mut self, _name: &str, value: f64, min: f64, max: f64) -> f64 {
        clamp_value(value, min, max)
    }
}

/// Clamps `value` into `[min, max]`; NaN maps to `min`.
pub fn clamp_value(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

fn visit_render(p: &mut RenderParams, v: &mut impl Visitor) {
    // Delay memory grows with the internal rate, so high factors lower the ceiling.
    let max_rate = (MAX_UP_RATE / p.oversample.fold() as f64).min(384000.0);
    v.float("sample_rate", &mut p.sample_rate, 8000.0, max_rate);
    v.float("duration_seconds", &mut p.duration_seconds, 0.0, 600.0);
    v.float("decay_to", &mut p.decay_to, 0.0, 1.0);
}

fn visit_drum(p: &mut DrumParams, v: &mut impl Visitor) {
    visit_render(&mut p.render, v);
    v.float("limiter_threshold", &mut p.limiter_threshold, 0.01, 2.0);
    v.float(
        "limiter_smoothing_seconds",
        &mut p.limiter_smoothing_seconds,
        0.0001,
        0.2,
    );

    v.float("noise_decay_seconds", &mut p.noise_decay_seconds, 0.0001, 16.0);
    v.float("noise_lowpass_hz", &mut p.noise_lowpass_hz, 1.0, 20000.0);
    v.float("allpass_max_time_hz", &mut p.allpass_max_time_hz, 1.0, 20000.0);

    v.float("wire_frequency_hz", &mut p.wire_frequency_hz, 1.0, 20000.0);
    v.float("wire_decay_seconds", &mut p.wire_decay_seconds, 0.0001, 16.0);
    v.float("wire_mix", &mut p.wire_mix, 0.0, 1.0);

    v.float("envelope_mod_amount", &mut p.envelope_mod_amount, -4.0, 4.0);
    v.float(
        "envelope_attack_seconds",
        &mut p.envelope_attack_seconds,
        0.0,
        16.0,
    );
    v.float(
        "envelope_decay_seconds",
        &mut p.envelope_decay_seconds,
        0.0,
        16.0,
    );

    v.count("matrix_size", &mut p.matrix_size, 1, MAX_MATRIX_SIZE);
    v.float("cross_feedback_gain", &mut p.cross_feedback_gain, 0.0, 4.0);
    p.cross_feedback_ratio.truncate(MAX_MATRIX_SIZE);
    for (i, ratio) in p.cross_feedback_ratio.iter_mut().enumerate() {
        v.float(&format!("cross_feedback_ratio[{i}]"), ratio, 0.0, 1.0);
    }

    v.float("delay_time_hz", &mut p.delay_time_hz, 1.0, 20000.0);
    v.float("delay_time_spread", &mut p.delay_time_spread, 0.0, 1.0);
    v.float(
        "delay_time_mod_amount",
        &mut p.delay_time_mod_amount,
        0.0,
        4096.0,
    );
    v.float("bandpass_cut_ratio", &mut p.bandpass_cut_ratio, -8.0, 8.0);
    v.float("bandpass_cut_spread", &mut p.bandpass_cut_spread, 0.0, 1.0);
    v.float("bandpass_q", &mut p.bandpass_q, 0.0001, 100.0);
    v.float("pitch_random_cents", &mut p.pitch_random_cents, 0.0, 1200.0);

    v.float("fdn_mix", &mut p.fdn_mix, 0.0, 1.0);
    v.float(
        "secondary_delay_offset",
        &mut p.secondary_delay_offset,
        -4.0,
        4.0,
    );
    v.float("collision_distance", &mut p.collision_distance, 0.0, 2.0);

    v.float("dc_highpass_hz", &mut p.dc_highpass_hz, 0.0, 120.0);
    v.float("tone_slope", &mut p.tone_slope, 0.0, 1.0);
}

fn visit_pad(p: &mut PadParams, v: &mut impl Visitor) {
    visit_render(&mut p.render, v);
    v.float("frequency_hz", &mut p.frequency_hz, 1.0, 20000.0);
    v.count("unison_count", &mut p.unison_count, 1, MAX_UNISON);
    v.float(
        "unison_pitch_spread_cents",
        &mut p.unison_pitch_spread_cents,
        0.0,
        1200.0,
    );
    v.float("cents_randomize", &mut p.cents_randomize, 0.0, 1200.0);
    p.octave_randomize =
        v.field("octave_randomize", f64::from(p.octave_randomize), 0.0, 8.0) as u32;

    v.count("stack_count", &mut p.stack_count, 1, MAX_STACK);
    v.float("stack_ratio", &mut p.stack_ratio, 0.0, 16.0);
    v.float("stack_octave_wrap", &mut p.stack_octave_wrap, 0.0, 16.0);
    p.chord_notes.truncate(JUST_INTONATION.len());
    for (i, note) in p.chord_notes.iter_mut().enumerate() {
        v.count(&format!("chord_notes[{i}]"), note, 0, JUST_INTONATION.len() - 1);
    }

    v.float("attack_seconds", &mut p.attack_seconds, 0.0, 16.0);
    v.float("decay_seconds", &mut p.decay_seconds, 0.0, 16.0);
    v.float("fm_index", &mut p.fm_index, 0.0, 16.0);

    v.count("flanger_taps", &mut p.flanger_taps, 1, MAX_FLANGER_TAPS);
    v.float("delay_base_hz", &mut p.delay_base_hz, 1.0, 20000.0);
    v.float("delay_random_ratio", &mut p.delay_random_ratio, 1.0, 16.0);
    v.float("lfo_freq_hz", &mut p.lfo_freq_hz, 0.0, 100.0);
    v.float("lfo_amount", &mut p.lfo_amount, 0.0, 4.0);
    v.float("lfo_initial_phase", &mut p.lfo_initial_phase, 0.0, 1.0);
    v.float("flanger_mix", &mut p.flanger_mix, 0.0, 1.0);

    v.float("reverb_mix", &mut p.reverb_mix, 0.0, 1.0);
    v.float("reverb_feedback", &mut p.reverb_feedback, 0.0, 1.0);
    v.float(
        "reverb_seconds",
        &mut p.reverb_seconds,
        0.0,
        MAX_REVERB_SECONDS,
    );
    v.float("reverb_highpass_hz", &mut p.reverb_highpass_hz, 0.0, 1000.0);
    v.float("tone_slope", &mut p.tone_slope, 0.0, 1.0);
}

fn visit_instrument(instrument: &mut Instrument, v: &mut impl Visitor) {
    match instrument {
        Instrument::Drum(p) => visit_drum(p, v),
        Instrument::Pad(p) => visit_pad(p, v),
    }
}

/// Validates render settings.
pub fn validate_render(params: &RenderParams) -> ValidationResult<()> {
    let mut checker = Checker::default();
    visit_render(&mut params.clone(), &mut checker);
    checker.finish()
}

/// Validates every numeric knob of a drum.
pub fn validate_drum(params: &DrumParams) -> ValidationResult<()> {
    let mut checker = Checker::default();
    visit_drum(&mut params.clone(), &mut checker);
    checker.finish()
}

/// Validates every numeric knob of a pad.
pub fn validate_pad(params: &PadParams) -> ValidationResult<()> {
    let mut checker = Checker::default();
    visit_pad(&mut params.clone(), &mut checker);
    checker.finish()
}

/// Validates whichever instrument is given.
pub fn validate_instrument(instrument: &Instrument) -> ValidationResult<()> {
    let mut checker = Checker::default();
    visit_instrument(&mut instrument.clone(), &mut checker);
    checker.finish()
}

/// Validates a preset's instrument.
pub fn validate_preset(preset: &Preset) -> ValidationResult<()> {
    validate_instrument(&preset.instrument)
}

/// Clamps render settings into range.
pub fn clamp_render(params: &mut RenderParams) {
    visit_render(params, &mut Clamper);
}

/// Clamps every drum knob into range.
///
/// Cross-feedback ratios beyond [`MAX_MATRIX_SIZE`] are dropped.
pub fn clamp_drum(params: &mut DrumParams) {
    visit_drum(params, &mut Clamper);
}

/// Clamps every pad knob into range.
pub fn clamp_pad(params: &mut PadParams) {
    visit_pad(params, &mut Clamper);
}

/// Clamps whichever instrument is given.
pub fn clamp_instrument(instrument: &mut Instrument) {
    visit_instrument(instrument, &mut Clamper);
}

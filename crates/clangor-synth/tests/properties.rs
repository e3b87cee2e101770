//! Property-based tests for clangor-synth.
//!
//! Random instrument settings must always render a full-length, finite
//! buffer; the engine clamps whatever it cannot use.

use std::sync::atomic::AtomicBool;

use clangor_synth::{
    DrumParams, Instrument, LimiterKind, OversampleFactor, PadParams, PitchSeries, PitchType,
    RenderParams, render_channel,
};
use proptest::prelude::*;

fn quick_render(seed: u64) -> RenderParams {
    RenderParams {
        oversample: OversampleFactor::X1,
        duration_seconds: 0.02,
        seed,
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Any drum settings render a finite buffer of the requested length.
    #[test]
    fn drum_renders_are_finite(
        seed in any::<u32>(),
        matrix_size in 0usize..16,
        pitch in 0usize..9,
        limiter in 0usize..3,
        cross_feedback_gain in 0.0f64..2.0,
        delay_time_hz in 20.0f64..4000.0,
        delay_time_mod_amount in 0.0f64..200.0,
        bandpass_q in 0.01f64..20.0,
        bandpass_cut_ratio in -4.0f64..4.0,
        envelope_mod_amount in -2.0f64..2.0,
        fdn_mix in 0.0f64..1.0,
        collision_distance in 0.0f64..1.0,
    ) {
        let instrument = Instrument::Drum(DrumParams {
            render: quick_render(u64::from(seed)),
            matrix_size,
            pitch_type: PitchType::ALL[pitch],
            limiter: LimiterKind::ALL[limiter],
            cross_feedback_gain,
            delay_time_hz,
            delay_time_mod_amount,
            bandpass_q,
            bandpass_cut_ratio,
            pitch_random_cents: 50.0,
            envelope_mod_amount,
            fdn_mix,
            collision_distance,
            tone_slope: 0.8,
            ..Default::default()
        });
        let out = render_channel(&instrument, 0, &AtomicBool::new(false)).unwrap();
        prop_assert_eq!(out.samples.len(), 960);
        prop_assert!(out.samples.iter().all(|v| v.is_finite()));
    }

    /// Any pad settings render a finite buffer of the requested length.
    #[test]
    fn pad_renders_are_finite(
        seed in any::<u32>(),
        unison_count in 0usize..4,
        stack_count in 0usize..4,
        stack_ratio in 0.5f64..3.0,
        stack_octave_wrap in 0.0f64..3.0,
        chord_notes in prop::collection::vec(0usize..40, 0..5),
        fm_index in 0.0f64..10.0,
        flanger_taps in 0usize..8,
        delay_random_ratio in 0.5f64..4.0,
        reverb_feedback in 0.0f64..1.0,
        reverb_seconds in 0.0f64..0.2,
        matrix in 0usize..17,
    ) {
        let instrument = Instrument::Pad(PadParams {
            render: quick_render(u64::from(seed)),
            unison_count,
            stack_count,
            stack_ratio,
            stack_octave_wrap,
            chord_notes,
            fm_index,
            flanger_taps,
            delay_random_ratio,
            reverb_feedback,
            reverb_seconds,
            reverb_matrix: clangor_synth::MatrixFamily::from_index(matrix),
            ..Default::default()
        });
        let out = render_channel(&instrument, 1, &AtomicBool::new(false)).unwrap();
        prop_assert_eq!(out.samples.len(), 960);
        prop_assert!(out.samples.iter().all(|v| v.is_finite()));
        prop_assert!(out.dry_length.is_some_and(|n| n <= 960));
    }

    /// Every series is finite and never below unison.
    #[test]
    fn pitch_series_are_at_least_unison(pitch in 0usize..9, len in 0usize..64) {
        let series = PitchSeries::new(PitchType::ALL[pitch], len);
        prop_assert_eq!(series.len(), len);
        for i in 0..len {
            let r = series.ratio(i);
            prop_assert!(r.is_finite() && r >= 1.0);
        }
    }
}

//! Criterion benchmarks for clangor-synth voices
//!
//! Run with: cargo bench -p clangor-synth
#![allow(missing_docs)]

use clangor_synth::{DrumParams, DrumVoice, OversampleFactor, PadParams, PadVoice, Voice};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const BLOCK_SIZE: usize = 512;

fn bench_drum(c: &mut Criterion) {
    let mut group = c.benchmark_group("DrumVoice");

    for matrix_size in [4, 8, 16, 32] {
        for (name, fdn_mix) in [("single", 0.0), ("coupled", 0.5)] {
            let params = DrumParams {
                matrix_size,
                fdn_mix,
                collision_distance: 0.1,
                ..Default::default()
            };
            group.bench_with_input(
                BenchmarkId::new(name, matrix_size),
                &params,
                |b, params| {
                    let mut voice = DrumVoice::new(params, 1);
                    b.iter(|| {
                        for _ in 0..BLOCK_SIZE {
                            black_box(voice.process());
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_pad(c: &mut Criterion) {
    let mut group = c.benchmark_group("PadVoice");

    for unison_count in [1, 4, 8] {
        let params = PadParams {
            unison_count,
            ..Default::default()
        };
        group.bench_with_input(
            BenchmarkId::new("process", unison_count),
            &params,
            |b, params| {
                let mut voice = PadVoice::new(params, 1);
                b.iter(|| {
                    for _ in 0..BLOCK_SIZE {
                        black_box(voice.process());
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("VoiceBuild");

    group.bench_function("drum", |b| {
        let params = DrumParams::default();
        b.iter(|| black_box(DrumVoice::new(&params, black_box(7))));
    });
    group.bench_function("pad", |b| {
        let mut params = PadParams::default();
        params.render.oversample = OversampleFactor::X16;
        b.iter(|| black_box(PadVoice::new(&params, black_box(7))));
    });

    group.finish();
}

criterion_group!(benches, bench_drum, bench_pad, bench_build);
criterion_main!(benches);

//! Benchmarks for DSP primitives and the full render path.
//!
//! Run with: cargo bench
//!
//! These benchmarks measure the performance of core operations to ensure
//! they complete well within real-time audio deadlines.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Low-level primitives (oscillator, filter, envelope, noise)
//!   - scenarios/*  Full engine renders (8-voice chord, mono glide line)

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use polyblit::dsp::envelope::Envelope;
use polyblit::dsp::filter::Filter;
use polyblit::dsp::noise::NoiseGenerator;
use polyblit::dsp::oscillator::Oscillator;
use polyblit::patch::{Patch, PolyMode};
use polyblit::synth::{GlideMode, Synth};

/// Common buffer sizes used in audio applications.
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut osc = Oscillator::new();
        osc.period = 100.3;
        let mut buffer = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("blit", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.next_sample();
                }
                black_box(&mut buffer);
            })
        });
    }

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        let mut filter = Filter::new();
        filter.sample_rate = 48_000.0;
        filter.update_coefficients(1_000.0, 2.0);
        let mut buffer = input.clone();

        group.bench_with_input(BenchmarkId::new("lowpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for sample in buffer.iter_mut() {
                    *sample = filter.render(*sample);
                }
                black_box(&mut buffer);
            })
        });
    }

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut env = Envelope::new();
        env.attack_multiplier = 0.999;
        env.decay_multiplier = 0.9999;
        env.sustain_level = 0.7;
        env.release_multiplier = 0.999;
        env.attack();
        let mut buffer = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("adsr", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = env.next_value();
                }
                black_box(&mut buffer);
            })
        });
    }

    group.finish();
}

fn bench_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/noise");

    for &size in BLOCK_SIZES {
        let mut noise = NoiseGenerator::new();
        let mut buffer = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("lcg", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = noise.next_value();
                }
                black_box(&mut buffer);
            })
        });
    }

    group.finish();
}

fn bench_synth(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/synth");

    for &size in BLOCK_SIZES {
        // Worst realistic case: all eight voices sounding, vibrato and
        // filter LFO running, second oscillator and noise mixed in.
        let mut patch = Patch::super_saw();
        patch.noise_level = 0.3;
        patch.filter_lfo_depth = 0.4;

        let mut synth = Synth::new();
        synth.allocate_resources(48_000.0, size);
        synth.apply_patch(&patch);
        synth.reset();
        for note in [36, 43, 48, 55, 60, 64, 67, 72] {
            synth.midi_message(0x90, note, 100);
        }

        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("chord_8_voices", size), &size, |b, _| {
            b.iter(|| {
                synth.render(black_box(&mut left), Some(black_box(&mut right)));
            })
        });
    }

    for &size in BLOCK_SIZES {
        let mut patch = Patch::glide_bass();
        patch.poly_mode = PolyMode::Mono;
        patch.glide_mode = GlideMode::Always;

        let mut synth = Synth::new();
        synth.allocate_resources(48_000.0, size);
        synth.apply_patch(&patch);
        synth.reset();
        synth.midi_message(0x90, 36, 110);

        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("mono_glide", size), &size, |b, _| {
            b.iter(|| {
                synth.render(black_box(&mut left), Some(black_box(&mut right)));
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_oscillator,
    bench_filter,
    bench_envelope,
    bench_noise,
    bench_synth,
);
criterion_main!(benches);

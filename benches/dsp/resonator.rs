//! Benchmarks for a single two-pole resonator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use resonators::dsp::resonator::{Resonator, ResonatorOptions, ResonatorParams, Timing};

use crate::BLOCK_SIZES;

pub fn bench_resonator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/resonator");
    let options = ResonatorOptions::default();

    for &size in BLOCK_SIZES {
        let timing = Timing::new(48_000.0, size);
        let mut buffer = vec![0.0f32; size];

        // Ringing after a single impulse
        let mut res = Resonator::with_params(options, timing, ResonatorParams::new(440.0, 0.5, 0.3));
        res.render(1.0);
        group.bench_with_input(BenchmarkId::new("render", size), &size, |b, _| {
            b.iter(|| {
                for y in buffer.iter_mut() {
                    *y = res.render(black_box(0.0));
                }
            })
        });

        // Commit once per block, as a control change would
        let mut res = Resonator::with_params(options, timing, ResonatorParams::new(440.0, 0.5, 0.3));
        let mut freq = 440.0;
        group.bench_with_input(BenchmarkId::new("commit_per_block", size), &size, |b, _| {
            b.iter(|| {
                freq = if freq > 880.0 { 440.0 } else { freq * 1.01 };
                res.set_parameters(ResonatorParams::new(freq, 0.5, 0.3));
                res.commit();
                for y in buffer.iter_mut() {
                    *y = res.render(black_box(0.0));
                }
            })
        });
    }

    group.finish();
}

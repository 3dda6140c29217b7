//! Benchmarks for resonator banks of typical model sizes.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use resonators::dsp::bank::{BankOptions, ResonatorBank};
use resonators::dsp::resonator::{ResonatorParams, Timing};

use crate::BLOCK_SIZES;

const BANK_SIZES: &[usize] = &[8, 40, 128];

/// Inharmonic partials above 110 Hz.
fn partials(n: usize) -> Vec<ResonatorParams> {
    (0..n)
        .map(|i| {
            let k = i as f32 + 1.0;
            ResonatorParams::new(110.0 * k * (1.0 + 0.01 * k), 1.0 / k, 0.2 + 0.005 * k)
        })
        .collect()
}

pub fn bench_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/bank");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for &n in BANK_SIZES {
            let options = BankOptions {
                total: n,
                max_size: n,
                ..Default::default()
            };
            let mut bank = ResonatorBank::new(options, Timing::new(48_000.0, size));
            bank.set_bank(&partials(n)).unwrap();
            bank.commit();
            bank.render(1.0);

            let id = format!("{}_resonators", n);
            group.bench_with_input(BenchmarkId::new(id, size), &size, |b, _| {
                b.iter(|| {
                    for y in buffer.iter_mut() {
                        *y = bank.render(black_box(0.0));
                    }
                })
            });
        }
    }

    group.finish();
}

//! Benchmarks for multi-voice rendering.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use resonators::dsp::resonator::ResonatorParams;
use resonators::model::Model;
use resonators::{Resonators, ResonatorsConfig};

use crate::BLOCK_SIZES;

const PITCHES: &[&str] = &["c3", "e3", "g3", "c4", "e4", "g4", "c5", "e5"];

fn marimba() -> Model {
    let ratios = [1.0, 4.0, 9.2, 12.6, 16.0, 20.0, 24.0, 30.0];
    Model::new(
        "marimba",
        220.0,
        ratios
            .iter()
            .enumerate()
            .map(|(i, r)| ResonatorParams::new(220.0 * r, 0.9 / (i as f32 + 1.0), 0.1 + 0.05 * i as f32))
            .collect(),
    )
}

fn voices(n: usize, block: usize) -> Resonators {
    let mut res = Resonators::new(ResonatorsConfig::new(n, 48_000.0, block));
    for v in 0..n {
        res.load_voice(v, marimba()).unwrap();
        res.set_pitch(v, PITCHES[v % PITCHES.len()]).unwrap();
    }
    res
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for n in [1, 4, 8] {
            let mut res = voices(n, size);
            res.render_summed(1.0);
            group.bench_with_input(BenchmarkId::new(format!("{}_summed", n), size), &size, |b, _| {
                b.iter(|| {
                    for y in buffer.iter_mut() {
                        *y = res.render_summed(black_box(0.0));
                    }
                })
            });
        }

        // One excitation per voice
        let mut res = voices(8, size);
        let excitation = [0.0f32; 8];
        let mut frame = [0.0f32; 8];
        group.bench_with_input(BenchmarkId::new("8_per_voice", size), &size, |b, _| {
            b.iter(|| {
                for _ in 0..size {
                    res.render_into(black_box(&excitation), &mut frame);
                }
            })
        });
    }

    group.finish();
}

/// Split renderer with a pitch change queued before every block.
pub fn bench_control(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/control");

    for &size in BLOCK_SIZES {
        let (mut control, mut renderer) = voices(4, size).split();
        let silence = vec![0.0f32; size];
        let mut buffer = vec![0.0f32; size];
        let mut step = 0;

        group.bench_with_input(BenchmarkId::new("retune_4_voices", size), &size, |b, _| {
            b.iter(|| {
                step = (step + 1) % PITCHES.len();
                control.set_pitch(step % 4, PITCHES[step]).unwrap();
                renderer.process_block(black_box(&silence), &mut buffer);
            })
        });
    }

    group.finish();
}

//! Benchmarks for saw generation, single and stacked.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use supersaw::dsp::oscillator::SawOscillator;
use supersaw::graph::{
    node::{GraphNode, RenderCtx},
    oscillator::{OscillatorBank, MAX_UNISON},
};

use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let ctx = RenderCtx::new(48_000.0, 0.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Single PolyBLEP saw
        let mut saw = SawOscillator::new(440.0, 48_000.0, 0.0);
        group.bench_with_input(BenchmarkId::new("saw", size), &size, |b, _| {
            b.iter(|| {
                buffer.fill(0.0);
                saw.render_add(black_box(&mut buffer));
            })
        });

        // Banks: cost should scale with the oscillator count
        for count in [1, 3, 7, MAX_UNISON] {
            let Ok(mut bank) = OscillatorBank::new(110.0, count, 12.0, 48_000.0) else {
                continue;
            };
            group.bench_with_input(
                BenchmarkId::new(format!("bank_{count}"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        bank.render_block(black_box(&mut buffer), black_box(&ctx));
                    })
                },
            );
        }
    }

    group.finish();
}

//! Benchmarks for scheduled envelope evaluation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use supersaw::dsp::envelope::{EnvelopeParameters, EnvelopeScheduler};
use supersaw::graph::node::RenderCtx;
use supersaw::EnvelopeTiming;

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let Ok(params) = EnvelopeParameters::for_unison(&EnvelopeTiming::default(), 3) else {
        return;
    };

    for &size in BLOCK_SIZES {
        let mut buffer = vec![1.0f32; size];

        // Mid-attack: exponential approach to peak
        let mut attacking = EnvelopeScheduler::new(params);
        let _ = attacking.start(0.0);
        let ctx = RenderCtx::new(48_000.0, 0.0);
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                buffer.fill(1.0);
                attacking.apply(black_box(&mut buffer), black_box(&ctx));
            })
        });

        // Held: exponential approach, exp() per sample
        let mut sustaining = EnvelopeScheduler::new(params);
        let _ = sustaining.start(0.0);
        let ctx = RenderCtx::new(48_000.0, 0.5);
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                buffer.fill(1.0);
                sustaining.apply(black_box(&mut buffer), black_box(&ctx));
            })
        });

        // Release tail
        let mut releasing = EnvelopeScheduler::new(params);
        let _ = releasing.start(0.0);
        let _ = releasing.stop(0.5);
        let ctx = RenderCtx::new(48_000.0, 0.6);
        group.bench_with_input(BenchmarkId::new("release", size), &size, |b, _| {
            b.iter(|| {
                buffer.fill(1.0);
                releasing.apply(black_box(&mut buffer), black_box(&ctx));
            })
        });
    }

    group.finish();
}

//! Benchmarks for polyphonic rendering.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use supersaw::{SynthConfig, VoiceManager};

use crate::BLOCK_SIZES;

fn held_chord(notes: &[i32], num_saws: usize) -> Option<VoiceManager> {
    let config = SynthConfig::default().with_num_saws(num_saws);
    let mut synth = VoiceManager::new(config).ok()?;
    for &note in notes {
        synth.note_on_at(note, 0.0).ok()?;
    }
    Some(synth)
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    let triad = [57, 60, 64];
    let cluster: Vec<i32> = (48..64).collect();

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === TRIAD ===
        // Default supersaw: 3 voices x 3 saws
        if let Some(mut synth) = held_chord(&triad, 3) {
            group.bench_with_input(BenchmarkId::new("triad_3_saws", size), &size, |b, _| {
                b.iter(|| synth.render_block(black_box(&mut buffer)))
            });
        }

        // === WIDE TRIAD ===
        // Same chord, 7 saws per voice
        if let Some(mut synth) = held_chord(&triad, 7) {
            group.bench_with_input(BenchmarkId::new("triad_7_saws", size), &size, |b, _| {
                b.iter(|| synth.render_block(black_box(&mut buffer)))
            });
        }

        // === CLUSTER ===
        // 16 simultaneous voices, 7 saws each
        if let Some(mut synth) = held_chord(&cluster, 7) {
            group.bench_with_input(BenchmarkId::new("cluster_16", size), &size, |b, _| {
                b.iter(|| synth.render_block(black_box(&mut buffer)))
            });
        }

        // === CHURN ===
        // Note on/off every block, exercising allocation, release and reclaim
        if let Some(mut synth) = held_chord(&[], 3) {
            let mut step = 0i32;
            group.bench_with_input(BenchmarkId::new("churn", size), &size, |b, _| {
                b.iter(|| {
                    let note = 48 + step % 24;
                    let _ = synth.note_on(note);
                    let _ = synth.note_off(48 + (step + 12) % 24);
                    step += 1;
                    synth.render_block(black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}

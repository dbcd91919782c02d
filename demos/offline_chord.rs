//! Render a chord offline and print its level over time.
//!
//! Run with: cargo run --example offline_chord

use supersaw::{SynthConfig, VoiceManager};
use tracing::info;

const SAMPLE_RATE: f32 = 48_000.0;
const BLOCK: usize = 512;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let config = SynthConfig::default()
        .with_sample_rate(SAMPLE_RATE)
        .with_num_saws(7)
        .with_detune(15.0);
    let mut synth = VoiceManager::new(config)?;

    // C minor, released after one second
    for note in [48, 51, 55, 60] {
        synth.note_on_at(note, 0.0)?;
    }
    synth.all_notes_off_at(1.0)?;

    let mut block = vec![0.0f32; BLOCK];
    let mut peak = 0.0f32;
    let mut frames = 0usize;
    while synth.now() < 1.6 {
        synth.render_block_with(&mut block, |note| info!(note, "voice finished"));
        peak = block.iter().fold(peak, |acc, s| acc.max(s.abs()));
        frames += BLOCK;

        // Report every 100 ms
        if frames % 4_800 < BLOCK {
            info!(
                time = synth.now(),
                peak,
                sounding = synth.sounding_count(),
                "level"
            );
            peak = 0.0;
        }
    }

    Ok(())
}

//! supersaw - plays a short chord progression on the default output device
//!
//! Run with: cargo run --release

mod app;

use app::Player;
use supersaw::SynthConfig;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let config = SynthConfig::default().with_num_saws(5).with_detune(12.0);

    // i - VI - III - VII in A minor, then a rising arpeggio
    Player::new(config)
        .bpm(96.0)
        .step(&[57, 60, 64], 2.0)
        .step(&[53, 57, 60], 2.0)
        .step(&[48, 52, 55], 2.0)
        .step(&[55, 59, 62], 2.0)
        .arpeggio(&[45, 52, 57, 60, 64, 69], 0.5)
        .run()
}

//! Whole-synth scenario benchmarks.
//!
//! These drive a `VoiceManager` the way a host would: chords held across
//! many blocks, with voices starting and releasing along the way.

mod voices;

pub use voices::bench_voices;

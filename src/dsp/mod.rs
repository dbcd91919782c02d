//! Low-level DSP primitives used by the higher level graph nodes.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! so they can live directly inside voice structs. They stay focused on the
//! signal and automation math; voice and polyphony orchestration lives in
//! `synth`.

/// Timestamped parameter automation (set, ramp, exponential target).
pub mod automation;
/// Attack/decay/release envelope scheduled onto an automation curve.
pub mod envelope;
/// Band-limited sawtooth generator.
pub mod oscillator;

pub use envelope::{EnvelopeScheduler, EnvelopeStage};

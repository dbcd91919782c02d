pub mod config;
pub mod dsp;
pub mod error;
pub mod graph; // Block-rendered sources and mix targets
pub mod io;
pub mod synth; // Voice management and polyphony
pub mod tuning;

pub use config::{EnvelopeTiming, StealPolicy, SynthConfig};
pub use error::SynthError;
pub use synth::manager::{NoteOnOutcome, VoiceManager};

/// Equal-tempered note index (MIDI numbering, 69 = A4). No range is enforced.
pub type Note = i32;

/// Position on the engine clock, in seconds.
pub type TimeStamp = f64;

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f64 = 1.0 / 48_000.0;

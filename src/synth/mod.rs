// Voices, polyphony, and the control path from the host thread

pub mod manager;
pub mod message;
pub mod poly;
pub mod voice;

pub use manager::{NoteOnOutcome, VoiceManager};
pub use message::{MessageReceiver, SynthMessage, VoiceObserver};
#[cfg(feature = "rtrb")]
pub use poly::SynthHandle;
pub use poly::PolySynth;

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use crate::{Note, TimeStamp};

/// Control events sent from the host thread to the render thread.
///
/// A `time` of `None` means "as soon as the message is picked up", which is
/// the start of the next rendered block.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn { note: Note, time: Option<TimeStamp> },
    NoteOff { note: Note, time: Option<TimeStamp> },
    SetVoiceCount(usize),
    SetDetune(f32),
    AllNotesOff,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

/// Told about every voice whose release tail has finished.
pub trait VoiceObserver {
    /// Returns `false` if the notification could not be delivered.
    fn voice_finished(&mut self, note: Note) -> bool;
}

impl VoiceObserver for () {
    fn voice_finished(&mut self, _note: Note) -> bool {
        true
    }
}

#[cfg(feature = "rtrb")]
impl VoiceObserver for Producer<Note> {
    fn voice_finished(&mut self, note: Note) -> bool {
        self.push(note).is_ok()
    }
}

use crate::{io::midi::MidiEvent, synth::message::SynthMessage, Note};

/// All Notes Off controller number.
pub const ALL_NOTES_OFF_CC: u8 = 123;

/// Translate a MIDI event on `channel_filter` into an untimed synth message.
///
/// Velocity is ignored (voices have no velocity response); a note on with
/// velocity 0 is a note off, as MIDI running status uses it.
pub fn midi_to_synth(midi: MidiEvent, channel_filter: u8) -> Option<SynthMessage> {
    match midi {
        MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        } if channel == channel_filter => {
            let note = Note::from(key);
            Some(if velocity == 0 {
                SynthMessage::NoteOff { note, time: None }
            } else {
                SynthMessage::NoteOn { note, time: None }
            })
        }
        MidiEvent::NoteOff { channel, key, .. } if channel == channel_filter => {
            Some(SynthMessage::NoteOff {
                note: Note::from(key),
                time: None,
            })
        }
        MidiEvent::ControlChange {
            channel,
            controller: ALL_NOTES_OFF_CC,
            ..
        } if channel == channel_filter => Some(SynthMessage::AllNotesOff),
        _ => None,
    }
}

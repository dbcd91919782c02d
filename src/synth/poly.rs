#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};
#[cfg(feature = "rtrb")]
use tracing::warn;

use crate::{
    config::SynthConfig,
    synth::{
        manager::VoiceManager,
        message::{MessageReceiver, SynthMessage, VoiceObserver},
    },
    SynthError,
};
#[cfg(feature = "rtrb")]
use crate::{
    config::{validate_detune, validate_num_saws},
    Note, TimeStamp,
};

/*
Render-Thread Front End
=======================

`VoiceManager` is single-threaded: whoever owns it calls `note_on`,
`note_off`, and `render_block`. In a live setup that owner is the audio
callback, and the host talks to it through a lock-free queue:

  host thread                           audio thread
  ───────────                           ────────────
  SynthHandle::note_on(60) ──► queue ──► PolySynth::render_block
                                           ├─ drain messages into the manager
                                           ├─ render the mix
  SynthHandle::poll_finished ◄── queue ◄──┘ report voices that finished

Messages are applied at the start of the block that picks them up, so an
untimed note lands on a block boundary. Messages with an explicit time are
scheduled exactly (the envelope curve handles sub-block timing).

Nothing here allocates once the synth is built.

Mix targets are boxed trait objects, so they don't travel through the queue.
Install them on the thread that owns the synth, before handing it to the
audio callback or from inside it:

  let (mut synth, handle) = PolySynth::with_queue(config, 256)?;
  synth.voice_manager_mut().connect(OutputGain::new(0.8));
*/

pub struct PolySynth<R, N = ()> {
    manager: VoiceManager,
    rx: R,
    observer: N,
    rejected_messages: u64,
    dropped_notifications: u64,
}

impl<R: MessageReceiver> PolySynth<R> {
    pub fn new(config: SynthConfig, rx: R) -> Result<Self, SynthError> {
        Self::with_observer(config, rx, ())
    }
}

impl<R: MessageReceiver, N: VoiceObserver> PolySynth<R, N> {
    pub fn with_observer(config: SynthConfig, rx: R, observer: N) -> Result<Self, SynthError> {
        Ok(Self {
            manager: VoiceManager::new(config)?,
            rx,
            observer,
            rejected_messages: 0,
            dropped_notifications: 0,
        })
    }

    pub fn voice_manager(&self) -> &VoiceManager {
        &self.manager
    }

    /// Owning-thread access, e.g. to `connect` a mix target.
    pub fn voice_manager_mut(&mut self) -> &mut VoiceManager {
        &mut self.manager
    }

    /// Messages the manager refused (invalid values, full automation).
    pub fn rejected_messages(&self) -> u64 {
        self.rejected_messages
    }

    /// Finished-voice notifications the observer could not take (full queue).
    pub fn dropped_notifications(&self) -> u64 {
        self.dropped_notifications
    }

    pub fn render_block(&mut self, out: &mut [f32]) {
        // Process control messages
        while let Some(msg) = self.rx.pop() {
            if self.apply(msg).is_err() {
                self.rejected_messages += 1;
            }
        }

        let observer = &mut self.observer;
        let dropped = &mut self.dropped_notifications;
        self.manager.render_block_with(out, |note| {
            if !observer.voice_finished(note) {
                *dropped += 1;
            }
        });
    }

    fn apply(&mut self, msg: SynthMessage) -> Result<(), SynthError> {
        let now = self.manager.now();
        match msg {
            SynthMessage::NoteOn { note, time } => {
                self.manager.note_on_at(note, time.unwrap_or(now))?;
            }
            SynthMessage::NoteOff { note, time } => {
                self.manager.note_off_at(note, time.unwrap_or(now))?;
            }
            SynthMessage::SetVoiceCount(count) => self.manager.set_voice_count(count)?,
            SynthMessage::SetDetune(cents) => self.manager.set_detune(cents)?,
            SynthMessage::AllNotesOff => {
                self.manager.all_notes_off_at(now)?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "rtrb")]
impl PolySynth<Consumer<SynthMessage>, Producer<Note>> {
    /// Build a synth for the audio thread and a handle for the host thread,
    /// connected by queues that hold `capacity` messages each way.
    pub fn with_queue(
        config: SynthConfig,
        capacity: usize,
    ) -> Result<(Self, SynthHandle), SynthError> {
        let (tx, rx) = RingBuffer::<SynthMessage>::new(capacity);
        let (finished_tx, finished_rx) = RingBuffer::<Note>::new(capacity);
        let synth = Self::with_observer(config, rx, finished_tx)?;

        Ok((
            synth,
            SynthHandle {
                tx,
                finished: finished_rx,
            },
        ))
    }
}

/// Host-side control of a `PolySynth` running on another thread.
#[cfg(feature = "rtrb")]
pub struct SynthHandle {
    tx: Producer<SynthMessage>,
    finished: Consumer<Note>,
}

#[cfg(feature = "rtrb")]
impl SynthHandle {
    pub fn note_on(&mut self, note: Note) -> Result<(), SynthError> {
        self.send(SynthMessage::NoteOn { note, time: None })
    }

    pub fn note_on_at(&mut self, note: Note, at: TimeStamp) -> Result<(), SynthError> {
        self.send(SynthMessage::NoteOn {
            note,
            time: Some(at),
        })
    }

    pub fn note_off(&mut self, note: Note) -> Result<(), SynthError> {
        self.send(SynthMessage::NoteOff { note, time: None })
    }

    pub fn note_off_at(&mut self, note: Note, at: TimeStamp) -> Result<(), SynthError> {
        self.send(SynthMessage::NoteOff {
            note,
            time: Some(at),
        })
    }

    pub fn set_voice_count(&mut self, count: usize) -> Result<(), SynthError> {
        validate_num_saws(count)?;
        self.send(SynthMessage::SetVoiceCount(count))
    }

    pub fn set_detune(&mut self, cents: f32) -> Result<(), SynthError> {
        validate_detune(cents)?;
        self.send(SynthMessage::SetDetune(cents))
    }

    pub fn all_notes_off(&mut self) -> Result<(), SynthError> {
        self.send(SynthMessage::AllNotesOff)
    }

    /// Next note whose voice finished its release, if any.
    pub fn poll_finished(&mut self) -> Option<Note> {
        self.finished.pop().ok()
    }

    pub fn send(&mut self, msg: SynthMessage) -> Result<(), SynthError> {
        self.tx.push(msg).map_err(|_| {
            warn!(?msg, "control queue full, dropping message");
            SynthError::QueueFull
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Script(Vec<SynthMessage>);

    impl MessageReceiver for Script {
        fn pop(&mut self) -> Option<SynthMessage> {
            if self.0.is_empty() {
                None
            } else {
                Some(self.0.remove(0))
            }
        }
    }

    #[test]
    fn applies_messages_before_rendering() {
        let script = Script(vec![
            SynthMessage::SetVoiceCount(5),
            SynthMessage::NoteOn {
                note: 60,
                time: None,
            },
        ]);
        let mut synth = PolySynth::new(SynthConfig::default(), script).unwrap();

        let mut buffer = vec![0.0f32; 128];
        synth.render_block(&mut buffer);

        let voice = synth.voice_manager().voice(60).unwrap();
        assert_eq!(voice.bank().count(), 5);
        assert!(buffer.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn counts_rejected_messages() {
        let script = Script(vec![
            SynthMessage::SetVoiceCount(0),
            SynthMessage::SetDetune(f32::NAN),
        ]);
        let mut synth = PolySynth::new(SynthConfig::default(), script).unwrap();
        synth.render_block(&mut [0.0; 16]);

        assert_eq!(synth.rejected_messages(), 2);
        assert_eq!(synth.voice_manager().config().num_saws, 3);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn handle_drives_synth_and_hears_back() {
        let config = SynthConfig::default().with_sample_rate(1_000.0);
        let (mut synth, mut handle) = PolySynth::with_queue(config, 16).unwrap();

        handle.note_on(64).unwrap();
        handle.note_off_at(64, 0.1).unwrap();

        let mut buffer = vec![0.0f32; 100];
        for _ in 0..7 {
            synth.render_block(&mut buffer);
        }

        assert_eq!(handle.poll_finished(), Some(64));
        assert_eq!(handle.poll_finished(), None);
    }

    #[test]
    fn connected_target_applies_to_queued_notes() {
        let script = Script(vec![SynthMessage::NoteOn {
            note: 60,
            time: None,
        }]);
        let mut synth = PolySynth::new(SynthConfig::default(), script).unwrap();
        let bus = synth
            .voice_manager_mut()
            .connect(crate::graph::mix::OutputGain::new(0.0));

        let mut buffer = vec![1.0f32; 256];
        synth.render_block(&mut buffer);

        assert_eq!(synth.voice_manager().voice(60).unwrap().bus(), Some(bus));
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn counts_notifications_the_host_never_drained() {
        let config = SynthConfig::default().with_sample_rate(1_000.0);
        let (mut synth, mut handle) = PolySynth::with_queue(config, 2).unwrap();
        let mut buffer = vec![0.0f32; 100];

        handle.note_on(60).unwrap();
        handle.note_on(64).unwrap();
        synth.render_block(&mut buffer);
        handle.note_on(67).unwrap();
        handle.all_notes_off().unwrap();

        // Released at 0.1, all three finish together at 0.5
        for _ in 0..6 {
            synth.render_block(&mut buffer);
        }

        assert_eq!(synth.dropped_notifications(), 1);
        assert!(handle.poll_finished().is_some());
        assert!(handle.poll_finished().is_some());
        assert_eq!(handle.poll_finished(), None);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn handle_validates_before_sending() {
        let (_synth, mut handle) = PolySynth::with_queue(SynthConfig::default(), 1).unwrap();
        assert!(handle.set_voice_count(0).is_err());
        assert!(handle.set_detune(-1.0).is_err());

        handle.all_notes_off().unwrap();
        assert_eq!(handle.all_notes_off(), Err(SynthError::QueueFull));
    }
}

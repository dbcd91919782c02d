use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::{
    config::{validate_detune, validate_num_saws, StealPolicy, SynthConfig},
    dsp::envelope::EnvelopeParameters,
    graph::{
        mix::{BusId, MixBus, MixTarget, OutputGain},
        node::{GraphNode, RenderCtx},
        oscillator::{OscillatorBank, MAX_UNISON},
    },
    synth::voice::{Voice, VoiceState},
    tuning::frequency_of,
    Note, SynthError, TimeStamp, MAX_BLOCK_SIZE,
};

/// What `note_on` did with a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOnOutcome {
    /// A new voice started.
    Started,
    /// The note was already held; nothing changed.
    AlreadySounding,
    /// Every slot was busy and `victim`'s voice was taken over.
    Stole { victim: Note },
    /// Every slot was busy and the steal policy refused the note.
    Rejected,
}

/// Owns every voice and decides when they start, stop, and are reclaimed.
///
/// Voice slots, oscillator banks, envelope curves, and mix buffers are all
/// allocated up front, so note events and rendering never touch the heap.
/// Time arguments are engine-clock seconds; the methods without an `_at`
/// suffix use the render clock (`now()`).
pub struct VoiceManager {
    config: SynthConfig,
    voices: Vec<Voice>,
    buses: Vec<Option<MixBus>>,
    current_bus: BusId,
    scratch: Vec<f32>,
    // Voices recycled by `note_on` after their release finished, not yet reported
    finished_pending: Vec<Note>,
    rng: StdRng,
    next_age: u64,
    frames_rendered: u64,
}

impl VoiceManager {
    pub fn new(config: SynthConfig) -> Result<Self, SynthError> {
        config.validate()?;

        let placeholder = EnvelopeParameters::for_unison(&config.envelope, 1)?;
        let voices = (0..config.max_voices)
            .map(|_| Voice::idle(config.sample_rate, placeholder))
            .collect();

        debug!(
            max_voices = config.max_voices,
            num_saws = config.num_saws,
            detune_cents = config.detune_cents,
            "voice manager created"
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(config.phase_seed),
            finished_pending: Vec::with_capacity(config.max_voices),
            config,
            voices,
            buses: vec![Some(MixBus::new(OutputGain::unity()))],
            current_bus: BusId(0),
            scratch: vec![0.0; MAX_BLOCK_SIZE],
            next_age: 0,
            frames_rendered: 0,
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Render clock: seconds of audio produced so far.
    pub fn now(&self) -> TimeStamp {
        self.frames_rendered as f64 / self.config.sample_rate as f64
    }

    pub fn note_on(&mut self, note: Note) -> Result<NoteOnOutcome, SynthError> {
        self.note_on_at(note, self.now())
    }

    /// Start a voice for `note` at `at`, unless the note is already held.
    pub fn note_on_at(&mut self, note: Note, at: TimeStamp) -> Result<NoteOnOutcome, SynthError> {
        if self.is_held(note) {
            return Ok(NoteOnOutcome::AlreadySounding);
        }

        let Some((index, victim)) = self.allocate_slot(at) else {
            return Ok(NoteOnOutcome::Rejected);
        };

        let count = self.config.num_saws;
        let mut phases = [0.0f64; MAX_UNISON];
        for phase in phases.iter_mut().take(count) {
            *phase = self.rng.gen::<f64>();
        }

        let bank = OscillatorBank::with_phases(
            frequency_of(note),
            count,
            self.config.detune_cents,
            self.config.sample_rate,
            &phases[..count],
        )?;
        let params = EnvelopeParameters::for_unison(&self.config.envelope, count)?;

        // A slot taken over right away continues from the victim's level
        // instead of cutting to zero. For a later start the slot stays silent
        // until then, since the new oscillators are already running.
        let initial_level = match victim {
            Some(_) if at <= self.now() => self.voices[index].envelope().value_at(at),
            _ => 0.0,
        };

        let age = self.next_age;
        self.next_age += 1;

        let voice = &mut self.voices[index];
        voice.reassign(
            note,
            bank,
            params,
            self.config.retrigger,
            initial_level,
            age,
        );
        voice.connect(self.current_bus);
        voice.start(at)?;

        Ok(match victim {
            Some(victim) => NoteOnOutcome::Stole { victim },
            None => NoteOnOutcome::Started,
        })
    }

    pub fn note_off(&mut self, note: Note) -> Result<bool, SynthError> {
        self.note_off_at(note, self.now())
    }

    /// Release `note` at `at` and drop it from the held mapping.
    ///
    /// Returns `false` (and changes nothing) if the note isn't held. The
    /// voice keeps sounding through its release tail and is reclaimed once
    /// the render clock passes its deadline.
    pub fn note_off_at(&mut self, note: Note, at: TimeStamp) -> Result<bool, SynthError> {
        let Some(voice) = self.voices.iter_mut().find(|v| v.is_held() && v.note() == note)
        else {
            return Ok(false);
        };

        voice.stop(at)?;
        Ok(true)
    }

    pub fn all_notes_off(&mut self) -> Result<usize, SynthError> {
        self.all_notes_off_at(self.now())
    }

    /// Release every held note at `at`; returns how many were released.
    pub fn all_notes_off_at(&mut self, at: TimeStamp) -> Result<usize, SynthError> {
        let mut released = 0;
        for voice in self.voices.iter_mut().filter(|v| v.is_held()) {
            voice.stop(at)?;
            released += 1;
        }
        Ok(released)
    }

    /// Oscillators per voice for notes started from now on.
    pub fn set_voice_count(&mut self, count: usize) -> Result<(), SynthError> {
        validate_num_saws(count)?;
        self.config.num_saws = count;
        debug!(num_saws = count, "voice count changed");
        Ok(())
    }

    /// Detune spread (cents) for notes started from now on.
    pub fn set_detune(&mut self, cents: f32) -> Result<(), SynthError> {
        validate_detune(cents)?;
        self.config.detune_cents = cents;
        debug!(detune_cents = cents, "detune changed");
        Ok(())
    }

    /// Install `target` as the mix point for voices started from now on.
    pub fn connect(&mut self, target: impl MixTarget + 'static) -> BusId {
        self.retire_buses();

        let bus = Some(MixBus::new(target));
        let id = match self.buses.iter().position(Option::is_none) {
            Some(slot) => {
                self.buses[slot] = bus;
                BusId(slot)
            }
            None => {
                self.buses.push(bus);
                BusId(self.buses.len() - 1)
            }
        };
        self.current_bus = id;

        debug!(bus = id.0, "mix target connected");
        id
    }

    pub fn current_bus(&self) -> BusId {
        self.current_bus
    }

    /// Drop buses that are no longer current and have no voices routed to them.
    fn retire_buses(&mut self) {
        for (slot, bus) in self.buses.iter_mut().enumerate() {
            if bus.is_none() || slot == self.current_bus.0 {
                continue;
            }
            let in_use = self
                .voices
                .iter()
                .any(|v| !v.is_free() && v.bus() == Some(BusId(slot)));
            if !in_use {
                *bus = None;
            }
        }
    }

    /// Free every released voice whose deadline is at or before `now`,
    /// reporting each one's note. Voices that `note_on` already recycled
    /// after their release finished are reported here too. Returns how many
    /// notes were reported.
    pub fn reclaim(&mut self, now: TimeStamp, mut on_finished: impl FnMut(Note)) -> usize {
        let mut freed = self.finished_pending.len();
        for note in self.finished_pending.drain(..) {
            on_finished(note);
        }

        for voice in &mut self.voices {
            if voice.state() == VoiceState::Releasing && voice.is_finished_at(now) {
                on_finished(voice.note());
                voice.free();
                freed += 1;
            }
        }
        freed
    }

    fn allocate_slot(&mut self, at: TimeStamp) -> Option<(usize, Option<Note>)> {
        // First pass: find free voice index
        if let Some(index) = self.voices.iter().position(Voice::is_free) {
            return Some((index, None));
        }

        // A voice whose release is over by `at` is free in all but name.
        // Recycle it and report it on the next reclaim; once the pending
        // list is full it is stolen instead, which still names the note.
        if self.finished_pending.len() < self.config.max_voices {
            let finished = self
                .voices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.state() == VoiceState::Releasing && v.is_finished_at(at))
                .min_by_key(|(_, v)| v.age())
                .map(|(index, _)| index);

            if let Some(index) = finished {
                let voice = &mut self.voices[index];
                self.finished_pending.push(voice.note());
                voice.free();
                return Some((index, None));
            }
        }

        if self.config.steal_policy == StealPolicy::Reject {
            return None;
        }

        // Second pass: steal oldest releasing voice, then oldest held one
        let oldest = |state: VoiceState| {
            self.voices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.state() == state)
                .min_by_key(|(_, v)| v.age())
                .map(|(index, v)| (index, Some(v.note())))
        };

        oldest(VoiceState::Releasing).or_else(|| oldest(VoiceState::Held))
    }

    pub fn render_block(&mut self, out: &mut [f32]) {
        self.render_block_with(out, |_| {});
    }

    /// Render the next block of the mix into `out`, advancing the clock.
    ///
    /// Voices whose release finished before a block starts are reclaimed
    /// first and reported through `on_finished`.
    pub fn render_block_with(&mut self, out: &mut [f32], mut on_finished: impl FnMut(Note)) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            let ctx = RenderCtx::new(self.config.sample_rate, self.now());
            self.reclaim(ctx.time, &mut on_finished);

            let frames = chunk.len();
            chunk.fill(0.0);
            for bus in self.buses.iter_mut().flatten() {
                bus.clear(frames);
            }

            // Mix voices
            for voice in self.voices.iter_mut().filter(|v| !v.is_free()) {
                let Some(bus) = voice
                    .bus()
                    .and_then(|id| self.buses.get_mut(id.0))
                    .and_then(Option::as_mut)
                else {
                    continue;
                };

                let scratch = &mut self.scratch[..frames];
                voice.render_block(scratch, &ctx);
                bus.accumulate(scratch);
            }

            for bus in self.buses.iter_mut().flatten() {
                bus.mix_into(chunk, &ctx);
            }

            self.frames_rendered += frames as u64;
        }
    }

    pub fn is_held(&self, note: Note) -> bool {
        self.voices.iter().any(|v| v.is_held() && v.note() == note)
    }

    /// The held voice for `note`, if any.
    pub fn voice(&self, note: Note) -> Option<&Voice> {
        self.voices.iter().find(|v| v.is_held() && v.note() == note)
    }

    pub fn held_notes(&self) -> impl Iterator<Item = Note> + '_ {
        self.voices.iter().filter(|v| v.is_held()).map(Voice::note)
    }

    /// Voices that are held or still in their release tail.
    pub fn sounding_voices(&self) -> impl Iterator<Item = &Voice> + '_ {
        self.voices.iter().filter(|v| !v.is_free())
    }

    pub fn held_count(&self) -> usize {
        self.held_notes().count()
    }

    pub fn sounding_count(&self) -> usize {
        self.sounding_voices().count()
    }
}

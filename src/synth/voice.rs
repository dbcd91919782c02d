use crate::{
    dsp::envelope::{EnvelopeParameters, EnvelopeScheduler, EnvelopeStage, Retrigger},
    graph::{
        mix::BusId,
        node::{GraphNode, RenderCtx},
        oscillator::OscillatorBank,
    },
    Note, SynthError, TimeStamp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // Available for allocation
    Held,      // Key down, tracked by the note mapping
    Releasing, // Key released, release tail still sounding
}

/// One sounding note: an oscillator bank behind an envelope-driven gain.
pub struct Voice {
    note: Note,
    state: VoiceState,
    age: u64,
    bank: OscillatorBank,
    envelope: EnvelopeScheduler,
    bus: Option<BusId>,
}

impl Voice {
    pub fn new(note: Note, bank: OscillatorBank, params: EnvelopeParameters) -> Self {
        Self {
            note,
            state: VoiceState::Free,
            age: 0,
            bank,
            envelope: EnvelopeScheduler::new(params),
            bus: None,
        }
    }

    /// Placeholder for a preallocated pool slot.
    pub(crate) fn idle(sample_rate: f32, params: EnvelopeParameters) -> Self {
        Self::new(0, OscillatorBank::inert(sample_rate), params)
    }

    /// Load a new note into this slot, reusing its allocations.
    pub(crate) fn reassign(
        &mut self,
        note: Note,
        bank: OscillatorBank,
        params: EnvelopeParameters,
        retrigger: Retrigger,
        initial_level: f32,
        age: u64,
    ) {
        self.note = note;
        self.state = VoiceState::Free;
        self.age = age;
        self.bank = bank;
        self.envelope.reset(params, retrigger, initial_level);
        self.bus = None;
    }

    /// Schedule the attack. The oscillators are already running.
    pub fn start(&mut self, at: TimeStamp) -> Result<(), SynthError> {
        self.envelope.start(at)?;
        self.bank.cancel_stop();
        self.state = VoiceState::Held;
        Ok(())
    }

    /// Schedule the release and the oscillator stop at its end.
    ///
    /// Returns the deadline after which the voice is silent, or `None` if the
    /// voice was never started.
    pub fn stop(&mut self, at: TimeStamp) -> Result<Option<TimeStamp>, SynthError> {
        let deadline = self.envelope.stop(at)?;
        if let Some(deadline) = deadline {
            self.bank.stop_at(deadline);
            self.state = VoiceState::Releasing;
        }
        Ok(deadline)
    }

    /// Route this voice's output to `bus`.
    pub fn connect(&mut self, bus: BusId) {
        self.bus = Some(bus);
    }

    pub fn bus(&self) -> Option<BusId> {
        self.bus
    }

    pub(crate) fn free(&mut self) {
        self.state = VoiceState::Free;
        self.bus = None;
    }

    pub fn note(&self) -> Note {
        self.note
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_held(&self) -> bool {
        self.state == VoiceState::Held
    }

    pub fn bank(&self) -> &OscillatorBank {
        &self.bank
    }

    pub fn envelope(&self) -> &EnvelopeScheduler {
        &self.envelope
    }

    pub fn stage_at(&self, t: TimeStamp) -> EnvelopeStage {
        self.envelope.stage_at(t)
    }

    /// When the release completes, if the voice has been stopped.
    pub fn deadline(&self) -> Option<TimeStamp> {
        self.envelope.finish_time()
    }

    pub fn is_finished_at(&self, t: TimeStamp) -> bool {
        self.deadline().is_some_and(|deadline| t >= deadline)
    }
}

impl GraphNode for Voice {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.bank.render_block(out, ctx);
        self.envelope.apply(out, ctx);
    }

    fn get_envelope_level(&self) -> Option<f32> {
        Some(self.envelope.level())
    }

    fn is_active(&self) -> bool {
        !self.is_free() && self.bank.is_active()
    }
}

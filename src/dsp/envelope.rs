#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    config::{validate_num_saws, EnvelopeTiming},
    dsp::automation::AutomationCurve,
    graph::node::RenderCtx,
    SynthError, TimeStamp, MIN_TIME,
};

/*
Scheduled Amplitude Envelope
============================

Each voice has one gain parameter. Instead of stepping a state machine per
sample, the envelope writes automation events onto that parameter when the
note starts and stops; rendering just evaluates the curve.

The Shape
---------

  Gain
  peak ┐   ╭───────────────────╮
       │  ╭╯                    ╲
       │ ╭╯                      ╲__
   0.0 └─╯──────────────────────────╲───→ t
       start  +attack             stop   stop + release
       │◄─►│                       │◄──────────►│
       attack      sustaining       releasing    finished

  start(at)
      anchor the level at `at` (current level, or 0 in FromZero mode)
      exponential approach to peak from `at`, time constant attack / 5,
      so the level is within 1% of peak by at + attack
      exponential approach to peak * sustain from at + attack,
      time constant decay + 0.001

Every segment is an exponential approach, so the slope never jumps where one
segment hands over to the next.

  stop(at)
      cancel-and-hold at `at`: whatever level the curve reached (even
      halfway up the attack) becomes the release's starting point
      exponential approach to 0 from `at`, time constant release / 10
      finished at at + release, when the oscillators are switched off

With a time constant of release / 10 the curve has fallen by e^-10 (about
-87 dB) at the deadline, so switching the oscillators off there is silent.

Peak gain is 1 / oscillator count so a bank of N saws summed at full level
stays within unity.


Stages
------

The stage is derived from the scheduled times; nothing has to observe the
curve to know where it is:

  Silent      never started (or queried before the start time)
  Attacking   start <= t < start + attack
  Sustaining  after the attack, until stop
  Releasing   stop <= t < stop + release
  Finished    t >= stop + release
*/

/// Added to the decay time constant so the approach never has zero length.
pub const RAMP_EPSILON: f64 = 0.001;
/// Release time constant is release_seconds / RELEASE_DIVISOR.
pub const RELEASE_DIVISOR: f64 = 10.0;
/// Attack time constant is attack_seconds / ATTACK_DIVISOR.
pub const ATTACK_DIVISOR: f64 = 5.0;

/// Where a repeated `start` begins its attack.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retrigger {
    /// Ramp from the level the curve has at the start time.
    #[default]
    FromCurrent,
    /// Force the level to zero first (can click if the voice is sounding).
    FromZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Silent,
    Attacking,
    Sustaining,
    Releasing,
    Finished,
}

/// Immutable timing and level constants for one voice's envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParameters {
    attack_seconds: f64,
    decay_time_constant: f64,
    release_seconds: f64,
    peak_gain: f32,
    sustain_level: f32,
}

impl EnvelopeParameters {
    /// Parameters for a bank of `count` oscillators; peak gain is `1 / count`.
    pub fn for_unison(timing: &EnvelopeTiming, count: usize) -> Result<Self, SynthError> {
        validate_num_saws(count)?;
        timing.validate()?;

        Ok(Self {
            attack_seconds: timing.attack,
            decay_time_constant: timing.decay,
            release_seconds: timing.release,
            peak_gain: 1.0 / count as f32,
            sustain_level: timing.sustain,
        })
    }

    pub fn attack_seconds(&self) -> f64 {
        self.attack_seconds
    }

    pub fn decay_time_constant(&self) -> f64 {
        self.decay_time_constant
    }

    pub fn release_seconds(&self) -> f64 {
        self.release_seconds
    }

    pub fn peak_gain(&self) -> f32 {
        self.peak_gain
    }

    pub fn sustain_gain(&self) -> f32 {
        self.peak_gain * self.sustain_level
    }

    pub fn attack_time_constant(&self) -> f64 {
        (self.attack_seconds / ATTACK_DIVISOR).max(MIN_TIME)
    }

    pub fn release_time_constant(&self) -> f64 {
        (self.release_seconds / RELEASE_DIVISOR).max(MIN_TIME)
    }
}

pub struct EnvelopeScheduler {
    params: EnvelopeParameters,
    retrigger: Retrigger,
    curve: AutomationCurve,
    start_time: Option<TimeStamp>,
    stop_time: Option<TimeStamp>,
    level: f32,
}

impl EnvelopeScheduler {
    pub fn new(params: EnvelopeParameters) -> Self {
        Self {
            params,
            retrigger: Retrigger::default(),
            curve: AutomationCurve::new(0.0),
            start_time: None,
            stop_time: None,
            level: 0.0,
        }
    }

    pub fn with_retrigger(mut self, retrigger: Retrigger) -> Self {
        self.retrigger = retrigger;
        self
    }

    /// Reuse this scheduler for a new note without reallocating its curve.
    ///
    /// `level` is where the curve sits until the next `start`; a slot taken
    /// over from an audible note passes that note's level here.
    pub fn reset(&mut self, params: EnvelopeParameters, retrigger: Retrigger, level: f32) {
        self.params = params;
        self.retrigger = retrigger;
        self.curve.reset(level);
        self.start_time = None;
        self.stop_time = None;
        self.level = level;
    }

    pub fn params(&self) -> &EnvelopeParameters {
        &self.params
    }

    /// Schedule the attack at `at`.
    pub fn start(&mut self, at: TimeStamp) -> Result<(), SynthError> {
        match self.retrigger {
            Retrigger::FromCurrent => {
                self.curve.cancel_and_hold(at)?;
            }
            Retrigger::FromZero => {
                self.curve.cancel_scheduled_values(at);
                self.curve.set_value_at(0.0, at)?;
            }
        }

        let attack_end = at + self.params.attack_seconds;
        self.curve
            .set_target_at(self.params.peak_gain, at, self.params.attack_time_constant())?;
        self.curve.set_target_at(
            self.params.sustain_gain(),
            attack_end,
            self.params.decay_time_constant + RAMP_EPSILON,
        )?;

        self.start_time = Some(at);
        self.stop_time = None;
        Ok(())
    }

    /// Schedule the release at `at`.
    ///
    /// Returns the time the release completes, or `None` if the envelope was
    /// never started.
    pub fn stop(&mut self, at: TimeStamp) -> Result<Option<TimeStamp>, SynthError> {
        if self.start_time.is_none() {
            return Ok(None);
        }

        self.curve.cancel_and_hold(at)?;
        self.curve
            .set_target_at(0.0, at, self.params.release_time_constant())?;

        self.stop_time = Some(at);
        Ok(self.finish_time())
    }

    pub fn start_time(&self) -> Option<TimeStamp> {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<TimeStamp> {
        self.stop_time
    }

    /// Deadline by which the voice's oscillators must be stopped.
    pub fn finish_time(&self) -> Option<TimeStamp> {
        self.stop_time.map(|stop| stop + self.params.release_seconds)
    }

    pub fn stage_at(&self, t: TimeStamp) -> EnvelopeStage {
        let Some(start) = self.start_time else {
            return EnvelopeStage::Silent;
        };

        if let Some(stop) = self.stop_time {
            if t >= stop + self.params.release_seconds {
                return EnvelopeStage::Finished;
            }
            if t >= stop {
                return EnvelopeStage::Releasing;
            }
        }

        if t < start {
            EnvelopeStage::Silent
        } else if t < start + self.params.attack_seconds {
            EnvelopeStage::Attacking
        } else {
            EnvelopeStage::Sustaining
        }
    }

    pub fn value_at(&self, t: TimeStamp) -> f32 {
        self.curve.value_at(t)
    }

    /// Level at the end of the most recently rendered block.
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn curve(&self) -> &AutomationCurve {
        &self.curve
    }

    /// Multiply `block` by the envelope, one gain value per frame.
    pub fn apply(&mut self, block: &mut [f32], ctx: &RenderCtx) {
        self.curve.discard_before(ctx.time);

        for (i, sample) in block.iter_mut().enumerate() {
            let gain = self.curve.value_at(ctx.frame_time(i));
            *sample *= gain;
            self.level = gain;
        }
    }
}

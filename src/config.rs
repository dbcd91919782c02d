#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{dsp::envelope::Retrigger, graph::oscillator::MAX_UNISON, SynthError};

/// What to do when a note arrives and every voice slot is sounding.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StealPolicy {
    /// Take the oldest releasing voice, falling back to the oldest held one.
    #[default]
    StealOldest,
    /// Drop the new note.
    Reject,
}

/// Envelope timing shared by every voice.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeTiming {
    /// Seconds to ramp from the anchor level to peak.
    pub attack: f64,
    /// Time constant (seconds) of the approach to the sustain level.
    pub decay: f64,
    /// Seconds from note-off until the oscillators are stopped.
    pub release: f64,
    /// Held level as a fraction of peak gain (0.0 - 1.0).
    pub sustain: f32,
}

impl Default for EnvelopeTiming {
    fn default() -> Self {
        Self {
            attack: 0.001,
            decay: 0.015,
            release: 0.4,
            sustain: 1.0,
        }
    }
}

impl EnvelopeTiming {
    pub fn validate(&self) -> Result<(), SynthError> {
        check_seconds("envelope.attack", self.attack)?;
        check_seconds("envelope.decay", self.decay)?;
        check_seconds("envelope.release", self.release)?;
        if !(0.0..=1.0).contains(&self.sustain) {
            return Err(SynthError::invalid(
                "envelope.sustain",
                format!("must be within 0.0..=1.0, got {}", self.sustain),
            ));
        }
        Ok(())
    }
}

fn check_seconds(field: &'static str, value: f64) -> Result<(), SynthError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SynthError::invalid(
            field,
            format!("must be a finite, non-negative number of seconds, got {value}"),
        ));
    }
    Ok(())
}

/// Engine configuration.
///
/// `num_saws` and `detune_cents` only affect voices started after they change.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub sample_rate: f32,
    pub num_saws: usize,
    pub detune_cents: f32,
    pub max_voices: usize,
    pub steal_policy: StealPolicy,
    pub envelope: EnvelopeTiming,
    pub retrigger: Retrigger,
    /// Seed for the random initial oscillator phases.
    pub phase_seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            num_saws: 3,
            detune_cents: 7.0,
            max_voices: 32,
            steal_policy: StealPolicy::default(),
            envelope: EnvelopeTiming::default(),
            retrigger: Retrigger::default(),
            phase_seed: 0x5eed_5a57,
        }
    }
}

impl SynthConfig {
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_num_saws(mut self, num_saws: usize) -> Self {
        self.num_saws = num_saws;
        self
    }

    pub fn with_detune(mut self, cents: f32) -> Self {
        self.detune_cents = cents;
        self
    }

    pub fn with_max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = max_voices;
        self
    }

    pub fn with_steal_policy(mut self, policy: StealPolicy) -> Self {
        self.steal_policy = policy;
        self
    }

    pub fn with_envelope(mut self, envelope: EnvelopeTiming) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn with_retrigger(mut self, retrigger: Retrigger) -> Self {
        self.retrigger = retrigger;
        self
    }

    pub fn with_phase_seed(mut self, seed: u64) -> Self {
        self.phase_seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(SynthError::invalid(
                "sample_rate",
                format!("must be positive, got {}", self.sample_rate),
            ));
        }
        validate_num_saws(self.num_saws)?;
        validate_detune(self.detune_cents)?;
        if self.max_voices == 0 {
            return Err(SynthError::invalid("max_voices", "must be at least 1"));
        }
        self.envelope.validate()
    }
}

pub(crate) fn validate_num_saws(count: usize) -> Result<(), SynthError> {
    if count < 1 {
        return Err(SynthError::invalid(
            "num_saws",
            format!("must be at least 1, got {count}"),
        ));
    }
    if count > MAX_UNISON {
        return Err(SynthError::invalid(
            "num_saws",
            format!("must be at most {MAX_UNISON}, got {count}"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_detune(cents: f32) -> Result<(), SynthError> {
    if !cents.is_finite() || cents < 0.0 {
        return Err(SynthError::invalid(
            "detune_cents",
            format!("must be a finite, non-negative number of cents, got {cents}"),
        ));
    }
    Ok(())
}

use crate::{
    config::{validate_detune, validate_num_saws},
    dsp::oscillator::SawOscillator,
    graph::node::{GraphNode, RenderCtx},
    tuning::cents_to_ratio,
    SynthError, TimeStamp,
};

/*
Unison Oscillator Bank
======================

A "supersaw" stacks several sawtooth oscillators at nearly the same pitch.
Because their frequencies differ by a few cents, their phases drift against
each other and the sum swells and shimmers instead of sounding like a single
static saw.

Detune Spread
-------------

`count` oscillators are spread evenly across [-detune, +detune] cents:

    offset_i = -detune + i * (2 * detune) / (count - 1)

  count = 3, detune = 7:     -7      0      +7
  count = 4, detune = 6:     -6     -2      +2     +6

The spread is symmetric, so the offsets sum to zero and the perceived pitch
stays on the fundamental. A single oscillator is never detuned (and the
formula's division by count - 1 is skipped).

Lifetime
--------

All oscillators run from construction until `stop_at` says otherwise; the
bank never decides on its own to stop. Frames at or after the stop deadline
are silent, and once the deadline has been rendered the bank reports itself
inactive. Output is the plain, unweighted sum: the owning voice applies gain.

Example usage:
  let bank = OscillatorBank::new(440.0, 3, 7.0, 48_000.0)?;
  assert_eq!(bank.offsets(), &[-7.0, 0.0, 7.0]);
*/

/// Largest supported oscillator count per bank.
pub const MAX_UNISON: usize = 16;

/// Detune in cents of oscillator `index` in a bank of `count`.
pub fn detune_offset(index: usize, count: usize, detune_cents: f32) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    -detune_cents + index as f32 * (2.0 * detune_cents) / (count - 1) as f32
}

#[derive(Debug, Clone)]
pub struct OscillatorBank {
    frequency: f64,
    sample_rate: f32,
    count: usize,
    detune_cents: f32,
    offsets: [f32; MAX_UNISON],
    saws: [SawOscillator; MAX_UNISON],
    stop_time: Option<TimeStamp>,
    stopped: bool,
}

impl OscillatorBank {
    /// Build a bank with every oscillator starting at phase 0.
    pub fn new(
        frequency: f64,
        count: usize,
        detune_cents: f32,
        sample_rate: f32,
    ) -> Result<Self, SynthError> {
        Self::with_phases(frequency, count, detune_cents, sample_rate, &[])
    }

    /// Build a bank with explicit starting phases (in cycles, wrapped to
    /// [0, 1)). Oscillators without an entry in `phases` start at 0.
    pub fn with_phases(
        frequency: f64,
        count: usize,
        detune_cents: f32,
        sample_rate: f32,
        phases: &[f64],
    ) -> Result<Self, SynthError> {
        validate_num_saws(count)?;
        validate_detune(detune_cents)?;
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(SynthError::invalid(
                "frequency",
                format!("must be a positive number of Hz, got {frequency}"),
            ));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(SynthError::invalid(
                "sample_rate",
                format!("must be positive, got {sample_rate}"),
            ));
        }

        let mut offsets = [0.0; MAX_UNISON];
        let mut saws = [SawOscillator::new(0.0, 1.0, 0.0); MAX_UNISON];
        for i in 0..count {
            let offset = detune_offset(i, count, detune_cents);
            let phase = phases.get(i).copied().unwrap_or(0.0);
            offsets[i] = offset;
            saws[i] = SawOscillator::new(
                frequency * cents_to_ratio(offset as f64),
                sample_rate as f64,
                phase,
            );
        }

        Ok(Self {
            frequency,
            sample_rate,
            count,
            detune_cents,
            offsets,
            saws,
            stop_time: None,
            stopped: false,
        })
    }

    /// A bank that produces nothing, used to fill idle voice slots.
    pub(crate) fn inert(sample_rate: f32) -> Self {
        Self {
            frequency: 0.0,
            sample_rate,
            count: 0,
            detune_cents: 0.0,
            offsets: [0.0; MAX_UNISON],
            saws: [SawOscillator::new(0.0, 1.0, 0.0); MAX_UNISON],
            stop_time: None,
            stopped: true,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn detune_cents(&self) -> f32 {
        self.detune_cents
    }

    pub fn offsets(&self) -> &[f32] {
        &self.offsets[..self.count]
    }

    /// Frequencies of the individual oscillators after detune.
    pub fn oscillator_frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        let sample_rate = self.sample_rate as f64;
        self.saws[..self.count]
            .iter()
            .map(move |saw| saw.frequency(sample_rate))
    }

    /// Silence every oscillator from `deadline` on. A later call replaces
    /// the deadline.
    pub fn stop_at(&mut self, deadline: TimeStamp) {
        self.stop_time = Some(deadline);
    }

    /// Forget a pending stop, unless it has already been rendered.
    pub fn cancel_stop(&mut self) {
        if !self.stopped {
            self.stop_time = None;
        }
    }

    pub fn stop_time(&self) -> Option<TimeStamp> {
        self.stop_time
    }
}

impl GraphNode for OscillatorBank {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        out.fill(0.0);
        if self.stopped {
            return;
        }

        let live = match self.stop_time {
            Some(stop) => (0..out.len())
                .take_while(|&i| ctx.frame_time(i) < stop)
                .count(),
            None => out.len(),
        };

        for saw in &mut self.saws[..self.count] {
            saw.render_add(&mut out[..live]);
        }

        if let Some(stop) = self.stop_time {
            if ctx.frame_time(out.len()) >= stop {
                self.stopped = true;
            }
        }
    }

    fn is_active(&self) -> bool {
        !self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_symmetric_and_span_detune() {
        for count in 2..=MAX_UNISON {
            for detune in [0.5f32, 7.0, 25.0] {
                let bank = OscillatorBank::new(220.0, count, detune, 48_000.0).unwrap();
                let offsets = bank.offsets();
                let sum: f32 = offsets.iter().sum();
                let max = offsets.iter().cloned().fold(f32::MIN, f32::max);
                let min = offsets.iter().cloned().fold(f32::MAX, f32::min);

                assert!(sum.abs() < 1e-3, "offsets should sum to 0, got {sum}");
                assert!((max - detune).abs() < 1e-4);
                assert!((min + detune).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn single_oscillator_is_undetuned() {
        let bank = OscillatorBank::new(440.0, 1, 50.0, 48_000.0).unwrap();
        assert_eq!(bank.offsets(), &[0.0]);
        assert_eq!(detune_offset(0, 1, 50.0), 0.0);
        let freq: Vec<f64> = bank.oscillator_frequencies().collect();
        assert!((freq[0] - 440.0).abs() < 1e-9);
    }

    #[test]
    fn three_saws_at_seven_cents() {
        let bank = OscillatorBank::new(440.0, 3, 7.0, 48_000.0).unwrap();
        assert_eq!(bank.offsets(), &[-7.0, 0.0, 7.0]);

        let freqs: Vec<f64> = bank.oscillator_frequencies().collect();
        assert!(freqs[0] < 440.0 && freqs[2] > 440.0);
        assert!((freqs[1] - 440.0).abs() < 1e-9);
        assert!((freqs[2] / 440.0 - cents_to_ratio(7.0)).abs() < 1e-9);
    }

    #[test]
    fn rejects_invalid_construction() {
        assert!(OscillatorBank::new(440.0, 0, 7.0, 48_000.0).is_err());
        assert!(OscillatorBank::new(440.0, MAX_UNISON + 1, 7.0, 48_000.0).is_err());
        assert!(OscillatorBank::new(440.0, 3, -1.0, 48_000.0).is_err());
        assert!(OscillatorBank::new(0.0, 3, 7.0, 48_000.0).is_err());
        assert!(OscillatorBank::new(440.0, 3, 7.0, 0.0).is_err());
    }

    #[test]
    fn runs_until_stopped() {
        let sample_rate = 1_000.0;
        let mut bank = OscillatorBank::with_phases(50.0, 2, 0.0, sample_rate, &[0.1, 0.1]).unwrap();
        let mut buffer = vec![0.0f32; 100];

        bank.render_block(&mut buffer, &RenderCtx::new(sample_rate, 0.0));
        assert!(buffer.iter().any(|s| s.abs() > 0.1));
        assert!(bank.is_active());

        // Stop halfway through the next block
        bank.stop_at(0.15);
        bank.render_block(&mut buffer, &RenderCtx::new(sample_rate, 0.1));
        assert!(buffer[..50].iter().any(|s| s.abs() > 0.1));
        assert!(buffer[50..].iter().all(|&s| s == 0.0));
        assert!(!bank.is_active());

        bank.cancel_stop();
        assert_eq!(bank.stop_time(), Some(0.15));
    }

    #[test]
    fn sum_is_unweighted() {
        let sample_rate = 48_000.0;
        let ctx = RenderCtx::new(sample_rate, 0.0);
        let mut single = OscillatorBank::with_phases(100.0, 1, 0.0, sample_rate, &[0.3]).unwrap();
        let mut triple =
            OscillatorBank::with_phases(100.0, 3, 0.0, sample_rate, &[0.3, 0.3, 0.3]).unwrap();

        let mut a = vec![0.0f32; 64];
        let mut b = vec![0.0f32; 64];
        single.render_block(&mut a, &ctx);
        triple.render_block(&mut b, &ctx);

        for (x, y) in a.iter().zip(&b) {
            assert!((3.0 * x - y).abs() < 1e-5);
        }
    }
}

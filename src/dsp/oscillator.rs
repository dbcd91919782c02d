/*
Band-Limited Sawtooth
=====================

A sawtooth ramps from -1 to +1 once per cycle and then drops straight back.
That drop is an infinitely sharp step, and sampling an infinitely sharp step
aliases: harmonics above Nyquist fold back down as inharmonic whine, which is
very audible on high notes and worse with several detuned copies stacked.

PolyBLEP (polynomial band-limited step) fixes this cheaply. In the one
sample on either side of the wrap we subtract a small polynomial that rounds
the corner off, which approximates a band-limited step:

   naive            corrected
    ╱│  ╱│           ╱╮  ╱╮
   ╱ │ ╱ │   -->    ╱ │ ╱ │
  ╱  │╱  │         ╱  ╰╱  ╰

Phase is kept in f64 so long-running oscillators don't drift audibly.
*/

/// One sawtooth generator with its own phase.
#[derive(Debug, Clone, Copy)]
pub struct SawOscillator {
    phase: f64,
    increment: f64,
}

impl SawOscillator {
    /// `phase` is the starting position within the cycle, wrapped into [0, 1).
    pub fn new(frequency: f64, sample_rate: f64, phase: f64) -> Self {
        Self {
            phase: phase.rem_euclid(1.0),
            increment: frequency / sample_rate,
        }
    }

    pub fn frequency(&self, sample_rate: f64) -> f64 {
        self.increment * sample_rate
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let dt = self.increment;
        let naive = 2.0 * self.phase - 1.0;
        let sample = naive - poly_blep(self.phase, dt);

        self.phase += dt;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample as f32
    }

    /// Add this oscillator's output to `out`.
    pub fn render_add(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample += self.next_sample();
        }
    }
}

/// `t` is the phase in [0, 1), `dt` the phase increment per sample.
#[inline]
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saw_stays_in_range() {
        let mut osc = SawOscillator::new(440.0, 48_000.0, 0.0);
        for _ in 0..48_000 {
            let s = osc.next_sample();
            assert!((-1.5..=1.5).contains(&s), "saw out of range: {s}");
        }
    }

    #[test]
    fn saw_rises_between_wraps() {
        let mut osc = SawOscillator::new(100.0, 48_000.0, 0.25);
        let a = osc.next_sample();
        let b = osc.next_sample();
        assert!(b > a);
        assert!((a - (-0.5)).abs() < 1e-6);
    }

    #[test]
    fn phase_is_wrapped() {
        let osc = SawOscillator::new(100.0, 48_000.0, 1.75);
        assert!((osc.phase() - 0.75).abs() < 1e-12);
        let osc = SawOscillator::new(100.0, 48_000.0, -0.25);
        assert!((osc.phase() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn completes_one_cycle_per_period() {
        let sample_rate = 48_000.0;
        let mut osc = SawOscillator::new(480.0, sample_rate, 0.0);
        // 100 samples per cycle
        for _ in 0..100 {
            osc.next_sample();
        }
        assert!(osc.phase() < 1e-9 || osc.phase() > 1.0 - 1e-9);
        assert!((osc.frequency(sample_rate) - 480.0).abs() < 1e-9);
    }
}

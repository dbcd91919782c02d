use crate::{graph::node::RenderCtx, MAX_BLOCK_SIZE};

/*
Mix Targets
===========

Voices don't write to the output directly. Each voice is connected to a mix
bus, the bus sums every voice routed to it, and the summed block then passes
through the bus's target before landing in the output:

    voice ─┐
    voice ─┼─► bus (sum) ─► target.process() ─► output
    voice ─┘

The target is where downstream processing plugs in: a master gain, a meter,
an effect chain supplied by the host. Anything implementing `MixTarget`
works, including plain closures:

  manager.connect(OutputGain::new(0.8));
  manager.connect(|block: &mut [f32], _ctx: &RenderCtx| {
      for s in block.iter_mut() {
          *s = s.tanh();
      }
  });

Connecting a new target only affects voices started afterwards; voices that
are already sounding finish on the bus they started on.
*/

/// Downstream processing for a summed block of voices.
pub trait MixTarget: Send {
    fn process(&mut self, block: &mut [f32], ctx: &RenderCtx);
}

impl<F> MixTarget for F
where
    F: FnMut(&mut [f32], &RenderCtx) + Send,
{
    fn process(&mut self, block: &mut [f32], ctx: &RenderCtx) {
        self(block, ctx)
    }
}

/// Fixed output gain; the default target.
#[derive(Debug, Clone, Copy)]
pub struct OutputGain {
    gain: f32,
}

impl OutputGain {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    pub fn unity() -> Self {
        Self::new(1.0)
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl MixTarget for OutputGain {
    fn process(&mut self, block: &mut [f32], _ctx: &RenderCtx) {
        if self.gain != 1.0 {
            for sample in block.iter_mut() {
                *sample *= self.gain;
            }
        }
    }
}

/// Identifies a bus owned by a `VoiceManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(pub(crate) usize);

/// Accumulates voice output and forwards it through a target.
pub struct MixBus {
    target: Box<dyn MixTarget>,
    buffer: Vec<f32>,
}

impl MixBus {
    pub fn new(target: impl MixTarget + 'static) -> Self {
        Self {
            target: Box::new(target),
            buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn clear(&mut self, frames: usize) {
        self.buffer[..frames].fill(0.0);
    }

    /// Add a voice's block to the bus.
    pub fn accumulate(&mut self, block: &[f32]) {
        for (acc, &sample) in self.buffer.iter_mut().zip(block) {
            *acc += sample;
        }
    }

    /// Run the target over the summed block and add the result to `out`.
    pub fn mix_into(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let frames = &mut self.buffer[..out.len()];
        self.target.process(frames, ctx);

        for (o, &sample) in out.iter_mut().zip(frames.iter()) {
            *o += sample;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_sums_then_applies_target() {
        let ctx = RenderCtx::new(48_000.0, 0.0);
        let mut bus = MixBus::new(OutputGain::new(0.5));
        bus.clear(4);
        bus.accumulate(&[1.0, 1.0, 1.0, 1.0]);
        bus.accumulate(&[1.0, 0.0, -1.0, 0.5]);

        let mut out = vec![0.25f32; 4];
        bus.mix_into(&mut out, &ctx);
        assert_eq!(out, vec![1.25, 0.75, 0.25, 1.0]);
    }

    #[test]
    fn closures_are_targets() {
        let ctx = RenderCtx::new(48_000.0, 0.0);
        let mut bus = MixBus::new(|block: &mut [f32], _ctx: &RenderCtx| {
            for s in block.iter_mut() {
                *s = -*s;
            }
        });
        bus.clear(2);
        bus.accumulate(&[0.5, -0.25]);

        let mut out = vec![0.0f32; 2];
        bus.mix_into(&mut out, &ctx);
        assert_eq!(out, vec![-0.5, 0.25]);
    }

    #[test]
    fn clear_resets_previous_block() {
        let ctx = RenderCtx::new(48_000.0, 0.0);
        let mut bus = MixBus::new(OutputGain::unity());
        bus.clear(3);
        bus.accumulate(&[1.0, 1.0, 1.0]);
        bus.clear(3);

        let mut out = vec![0.0f32; 3];
        bus.mix_into(&mut out, &ctx);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}

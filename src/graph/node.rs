use crate::TimeStamp;

/// Context passed to graph nodes during rendering
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - time: Engine clock position of the block's first frame, in seconds
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub time: TimeStamp,
}

impl RenderCtx {
    pub fn new(sample_rate: f32, time: TimeStamp) -> Self {
        Self { sample_rate, time }
    }

    /// Clock position of frame `index` within the block.
    #[inline]
    pub fn frame_time(&self, index: usize) -> TimeStamp {
        self.time + index as f64 / self.sample_rate as f64
    }

    /// Context for the block that follows `frames` frames of this one.
    pub fn advanced(&self, frames: usize) -> Self {
        Self {
            time: self.frame_time(frames),
            ..*self
        }
    }
}

/// Core trait for block-rendered audio sources
pub trait GraphNode: Send {
    /// Overwrite `out` with the next block of output.
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx);

    fn get_envelope_level(&self) -> Option<f32> {
        None
    }

    /// Check if this node is still producing sound
    ///
    /// Used by voice management to know when a voice can be freed.
    fn is_active(&self) -> bool {
        true
    }
}

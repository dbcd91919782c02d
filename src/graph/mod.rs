//! Block-rendered building blocks for voices.
//!
//! Graph nodes wrap the low-level DSP primitives with what voice management
//! needs: block rendering against the engine clock, stop deadlines, and
//! routing into shared mix buses.

/// Mix buses and the targets voices are connected to.
pub mod mix;
/// Core traits shared by all graph nodes.
pub mod node;
/// Detuned unison bank of sawtooth oscillators.
pub mod oscillator;

pub use node::{GraphNode, RenderCtx};

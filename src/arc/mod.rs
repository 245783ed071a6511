//! 3D arc layers.
//!
//! Arc layers draw curved paths between pairs of geographic endpoints. They
//! are not declarative style layers: their geometry is sampled here, shaded
//! with a color gradient, and attached to the map as a custom layer once the
//! engine's graphics context is ready.

pub mod gradient;
mod layer;
pub mod sample;
mod schedule;

pub use layer::{ArcCustomLayer, ArcPaint, ArcRender, ArcStage};
pub use sample::DEFAULT_ARC_INTERVALS;
pub use schedule::{AttachEvent, AttachPolicy, AttachScheduler};

//! Geographic projection, geometry and painting.
//!
//! This module converts GeoJSON geometries into screen-space shapes, answers
//! hit tests against them, and paints engine layers onto the egui canvas.

mod feature;
mod projection;
mod renderer;

pub use feature::{distance_to_segment, hit_test, point_in_ring, shapes, Shape};
pub use projection::{MapProjection, METERS_PER_DEGREE};
pub use renderer::render_engine;

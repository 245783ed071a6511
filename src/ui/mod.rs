//! UI modules for the Map Layer Workbench application.
//!
//! The UI is split into distinct panels:
//! - Top bar: Title, loading indicator and layer counts
//! - Left panel: Map components, filters and settings
//! - Central canvas: Map layers with pan/zoom/click
//! - Popup: Features under the last click

mod canvas;
mod colors;
mod left_panel;
mod popup;
mod top_bar;

pub use canvas::render_canvas;
pub use left_panel::render_left_panel;
pub use popup::render_popup;
pub use top_bar::render_top_bar;

//! Canvas view state (zoom and pan).

use eframe::egui::Vec2;

/// Zoom bounds of the map canvas.
pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Current zoom level (1.0 = default extent)
    pub zoom: f32,

    /// Current pan offset from center
    pub pan_offset: Vec2,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
        }
    }
}

impl ViewState {
    /// Zooms by `factor`, keeping the point at `cursor_rel` (relative to the
    /// canvas center) stationary.
    pub fn zoom_around(&mut self, factor: f32, cursor_rel: Vec2) {
        let old_zoom = self.zoom;
        let new_zoom = (old_zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let ratio = new_zoom / old_zoom;
        self.pan_offset = cursor_rel * (1.0 - ratio) + self.pan_offset * ratio;
        self.zoom = new_zoom;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_is_clamped() {
        let mut view = ViewState::default();
        view.zoom_around(1000.0, Vec2::ZERO);
        assert_eq!(view.zoom, MAX_ZOOM);
        view.zoom_around(0.0001, Vec2::ZERO);
        assert_eq!(view.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_zoom_keeps_cursor_point() {
        let mut view = ViewState::default();
        let cursor = Vec2::new(100.0, -40.0);
        view.zoom_around(2.0, cursor);

        // A point at `cursor` maps to `pan + cursor * ratio` after zooming
        assert_eq!(view.pan_offset + cursor * 2.0, cursor);
        assert_eq!(view.pan_offset, Vec2::new(-100.0, 40.0));
    }
}

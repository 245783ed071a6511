//! Map projection and coordinate transformation.
//!
//! Converts between geographic coordinates (lon/lat), optionally raised by an
//! elevation in meters, and screen coordinates on the canvas.

use eframe::egui::{Pos2, Rect, Vec2};
use geo_types::Coord;
use glam::DVec3;

/// Approximate meters per degree of latitude.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Fraction of an elevation drawn as upward screen offset, for a tilted look.
const ELEVATION_TILT: f64 = 0.6;

/// Map projection for converting geographic to screen coordinates.
#[derive(Debug, Clone)]
pub struct MapProjection {
    /// Center latitude of the view
    pub center_lat: f64,
    /// Center longitude of the view
    pub center_lon: f64,
    /// Visible half-range in degrees at zoom 1
    pub range_deg: f64,
    /// Current zoom level
    pub zoom: f32,
    /// Pan offset in screen pixels
    pub pan_offset: Vec2,
    /// Screen rectangle for the canvas
    pub screen_rect: Rect,
}

impl Default for MapProjection {
    fn default() -> Self {
        Self {
            center_lat: 25.05,
            center_lon: 121.54,
            range_deg: 0.15,
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
            screen_rect: Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)),
        }
    }
}

impl MapProjection {
    pub fn new(center_lat: f64, center_lon: f64) -> Self {
        Self {
            center_lat,
            center_lon,
            ..Default::default()
        }
    }

    /// Updates the projection with current view state.
    pub fn update(&mut self, zoom: f32, pan_offset: Vec2, screen_rect: Rect) {
        self.zoom = zoom;
        self.pan_offset = pan_offset;
        self.screen_rect = screen_rect;
    }

    fn effective_range(&self) -> f64 {
        self.range_deg / self.zoom as f64
    }

    fn half_size(&self) -> f32 {
        self.screen_rect.size().min_elem() / 2.0
    }

    /// Screen pixels per degree of latitude.
    pub fn pixels_per_degree(&self) -> f64 {
        self.half_size() as f64 / self.effective_range()
    }

    /// Converts geographic coordinates (lon, lat) to screen position.
    ///
    /// Uses an equirectangular projection with longitude scaled by the
    /// cosine of the center latitude, adequate at city scale.
    pub fn geo_to_screen(&self, coord: Coord<f64>) -> Pos2 {
        let effective_range = self.effective_range();

        let rel_lon = coord.x - self.center_lon;
        let rel_lat = coord.y - self.center_lat;

        let lat_correction = self.center_lat.to_radians().cos();
        let corrected_lon = rel_lon * lat_correction;

        // Normalized to -1..1; screen Y grows downward
        let norm_x = corrected_lon / effective_range;
        let norm_y = -rel_lat / effective_range;

        let center = self.screen_rect.center() + self.pan_offset;
        let half_size = self.half_size();

        Pos2::new(
            center.x + (norm_x as f32) * half_size,
            center.y + (norm_y as f32) * half_size,
        )
    }

    /// Projects a (lon, lat, elevation in meters) point, lifting it upward
    /// on screen in proportion to its elevation.
    pub fn project(&self, point: DVec3) -> Pos2 {
        let base = self.geo_to_screen(Coord {
            x: point.x,
            y: point.y,
        });
        let lift = point.z / METERS_PER_DEGREE * self.pixels_per_degree() * ELEVATION_TILT;
        Pos2::new(base.x, base.y - lift as f32)
    }

    /// Converts screen position to geographic coordinates (lon, lat).
    pub fn screen_to_geo(&self, pos: Pos2) -> Coord<f64> {
        let effective_range = self.effective_range();

        let center = self.screen_rect.center() + self.pan_offset;
        let half_size = self.half_size();

        let norm_x = (pos.x - center.x) / half_size;
        let norm_y = (pos.y - center.y) / half_size;

        let lat_correction = self.center_lat.to_radians().cos();
        let rel_lon = (norm_x as f64) * effective_range / lat_correction;
        let rel_lat = -(norm_y as f64) * effective_range;

        Coord {
            x: self.center_lon + rel_lon,
            y: self.center_lat + rel_lat,
        }
    }

    /// Returns the visible geographic bounds as (min_lon, min_lat, max_lon, max_lat).
    pub fn visible_bounds(&self) -> (f64, f64, f64, f64) {
        let top_left = self.screen_to_geo(self.screen_rect.left_top());
        let bottom_right = self.screen_to_geo(self.screen_rect.right_bottom());

        (
            top_left.x.min(bottom_right.x),
            top_left.y.min(bottom_right.y),
            top_left.x.max(bottom_right.x),
            top_left.y.max(bottom_right.y),
        )
    }

    /// Checks if a bounding box intersects the visible bounds, with a margin
    /// of a quarter of the visible span.
    pub fn bbox_visible(&self, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> bool {
        let (vis_min_lon, vis_min_lat, vis_max_lon, vis_max_lat) = self.visible_bounds();
        let margin = (vis_max_lat - vis_min_lat) / 4.0;

        !(max_lon < vis_min_lon - margin
            || min_lon > vis_max_lon + margin
            || max_lat < vis_min_lat - margin
            || min_lat > vis_max_lat + margin)
    }
}

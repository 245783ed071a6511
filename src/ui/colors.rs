//! Centralized color constants for the UI.
//!
//! This module provides consistent colors across all UI panels.

use eframe::egui::Color32;

/// General UI colors for labels and values.
pub mod ui {
    use super::Color32;

    /// Muted gray for labels.
    pub const LABEL: Color32 = Color32::from_rgb(140, 140, 150);
    /// Slightly brighter for values.
    pub const VALUE: Color32 = Color32::from_rgb(190, 190, 200);
    /// Emphasized color for active states.
    pub const ACTIVE: Color32 = Color32::from_rgb(100, 180, 255);
    /// Loading indicator.
    pub const LOADING: Color32 = Color32::from_rgb(255, 180, 50);
}

/// Colors for the map canvas.
pub mod map {
    use super::Color32;

    /// Canvas background.
    pub const BACKGROUND: Color32 = Color32::from_rgb(20, 20, 35);
    /// Overlay text.
    pub const OVERLAY_TEXT: Color32 = Color32::from_rgb(200, 200, 220);
    /// Popup anchor marker.
    pub const POPUP_ANCHOR: Color32 = Color32::from_rgb(255, 255, 255);
}

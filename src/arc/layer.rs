//! Arc layer construction.
//!
//! An arc layer moves through `Unsampled → Sampled → Scheduled → Attached`.
//! Sampling turns each two-point feature into a 3D waypoint line and computes
//! the color gradient; attaching builds one line mesh per feature in a scene
//! created from the engine's graphics context.

use super::gradient::{gradient_steps, parse_color};
use super::sample::{sample_collection, ArcLine};
use crate::engine::{CustomLayer, LineMesh, LineOptions, Scene3d};
use crate::layers::{LayerConfig, StyleProps};
use eframe::egui::Color32;
use geojson::FeatureCollection;
use serde_json::Value;

/// Line width used when the paint does not set `arc-width`.
pub const DEFAULT_ARC_WIDTH: f32 = 2.0;
/// Opacity used when the paint does not set `arc-opacity`.
pub const DEFAULT_ARC_OPACITY: f32 = 0.5;

/// Paint settings of an arc layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcPaint {
    pub start_color: Color32,
    pub end_color: Color32,
    pub width: f32,
    pub opacity: f32,
}

impl Default for ArcPaint {
    fn default() -> Self {
        Self {
            start_color: Color32::WHITE,
            end_color: Color32::WHITE,
            width: DEFAULT_ARC_WIDTH,
            opacity: DEFAULT_ARC_OPACITY,
        }
    }
}

impl ArcPaint {
    /// Reads `arc-color`, `arc-width` and `arc-opacity` from layer paint.
    ///
    /// `arc-color` is either a single color or `[start, end]`; a missing end
    /// color repeats the start color. An opacity of zero is kept.
    pub fn from_style(paint: Option<&StyleProps>) -> Self {
        let mut result = Self::default();
        let Some(paint) = paint else {
            return result;
        };

        let colors: Vec<Color32> = match paint.get("arc-color") {
            Some(Value::String(s)) => parse_color(s).into_iter().collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().and_then(parse_color))
                .collect(),
            _ => Vec::new(),
        };
        if let Some(start) = colors.first() {
            result.start_color = *start;
            result.end_color = colors.get(1).copied().unwrap_or(*start);
        }

        if let Some(width) = paint.get("arc-width").and_then(Value::as_f64) {
            result.width = width as f32;
        }
        if let Some(opacity) = paint.get("arc-opacity").and_then(Value::as_f64) {
            result.opacity = opacity as f32;
        }

        result
    }
}

/// Lifecycle stage of an arc layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcStage {
    Unsampled,
    Sampled,
    Scheduled,
    Attached,
}

/// Arc layer under construction.
#[derive(Debug, Clone)]
pub struct ArcRender {
    config: LayerConfig,
    data: FeatureCollection,
    paint: ArcPaint,
    lines: Vec<ArcLine>,
    gradient: Vec<Color32>,
    stage: ArcStage,
}

impl ArcRender {
    pub fn new(config: LayerConfig, data: FeatureCollection) -> Self {
        let paint = ArcPaint::from_style(config.paint.as_ref());
        Self {
            config,
            data,
            paint,
            lines: Vec::new(),
            gradient: Vec::new(),
            stage: ArcStage::Unsampled,
        }
    }

    /// Samples waypoints and the color gradient for every feature.
    pub fn sample(mut self, intervals: usize) -> Self {
        debug_assert_eq!(self.stage, ArcStage::Unsampled);
        let intervals = intervals.max(1);
        self.lines = sample_collection(&self.data, intervals);
        self.gradient = gradient_steps(self.paint.start_color, self.paint.end_color, intervals + 1);
        self.stage = ArcStage::Sampled;
        self
    }

    pub fn mark_scheduled(&mut self) {
        debug_assert_eq!(self.stage, ArcStage::Sampled);
        self.stage = ArcStage::Scheduled;
    }

    /// Builds one mesh per sampled line in `scene`.
    pub fn attach(mut self, mut scene: Box<dyn Scene3d>) -> (LayerConfig, ArcCustomLayer) {
        let meshes = self
            .lines
            .iter()
            .map(|line| {
                let mut mesh = scene.line(LineOptions {
                    geometry: line.waypoints.clone(),
                    color: Color32::WHITE,
                    width: self.paint.width,
                    opacity: self.paint.opacity,
                });
                mesh.set_vertex_colors(self.gradient.clone());
                mesh
            })
            .collect();

        self.stage = ArcStage::Attached;
        (self.config, ArcCustomLayer::new(scene, meshes))
    }

    pub fn stage(&self) -> ArcStage {
        self.stage
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn lines(&self) -> &[ArcLine] {
        &self.lines
    }

    pub fn gradient(&self) -> &[Color32] {
        &self.gradient
    }

    pub fn paint(&self) -> &ArcPaint {
        &self.paint
    }
}

/// Custom layer that draws arc meshes through a 3D scene.
pub struct ArcCustomLayer {
    scene: Box<dyn Scene3d>,
    meshes: Vec<LineMesh>,
}

impl ArcCustomLayer {
    pub fn new(scene: Box<dyn Scene3d>, meshes: Vec<LineMesh>) -> Self {
        Self { scene, meshes }
    }
}

impl CustomLayer for ArcCustomLayer {
    fn on_add(&mut self) {
        for mesh in self.meshes.drain(..) {
            self.scene.add(mesh);
        }
    }

    fn render(&mut self) {
        self.scene.update();
    }
}

//! Rendering engine and 3D scene contracts.
//!
//! The layer manager never draws anything itself. It drives a
//! `RenderingEngine` (sources, style layers, filters, hit-testing) and, for
//! arc layers, a `Scene3d` created from the engine's graphics context.
//! `CanvasEngine` is the egui-backed implementation used by the application.

mod canvas;
mod scene;

pub use canvas::{CanvasEngine, LayerView};
pub(crate) use canvas::{style_color, style_number};
pub use scene::CanvasScene;

use crate::layers::{LayerKind, StyleProps};
use eframe::egui::{Color32, Pos2};
use geo_types::Coord;
use geojson::{Feature, FeatureCollection};
use glam::DVec3;
use serde_json::{json, Value};
use std::fmt;

/// Errors reported by a rendering engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No layer with this id exists on the map.
    UnknownLayer(String),
    /// No source with this id exists on the map.
    UnknownSource(String),
    /// A layer or source with this id already exists.
    Duplicate(String),
    /// The native graphics context has not been created yet.
    ContextUnavailable,
    /// An image asset could not be loaded.
    ImageLoad { name: String, reason: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownLayer(id) => write!(f, "Unknown layer: {}", id),
            EngineError::UnknownSource(id) => write!(f, "Unknown source: {}", id),
            EngineError::Duplicate(id) => write!(f, "Already exists: {}", id),
            EngineError::ContextUnavailable => write!(f, "Graphics context unavailable"),
            EngineError::ImageLoad { name, reason } => {
                write!(f, "Failed to load image {}: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Declarative style layer added to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub kind: LayerKind,
    pub source: String,
    pub paint: StyleProps,
    pub layout: StyleProps,
}

/// Equality filter on a feature property (`["==", ["get", property], value]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub property: String,
    pub value: Value,
}

impl Filter {
    pub fn equals(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        feature
            .properties
            .as_ref()
            .and_then(|p| p.get(&self.property))
            .is_some_and(|v| *v == self.value)
    }

    /// Applies the filter to a collection, keeping matching features.
    pub fn apply(&self, collection: &FeatureCollection) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: collection
                .features
                .iter()
                .filter(|f| self.matches(f))
                .cloned()
                .collect(),
            foreign_members: None,
        }
    }

    /// Style expression form.
    pub fn to_expression(&self) -> Value {
        json!(["==", ["get", self.property], self.value])
    }
}

/// Feature struck by a pointer query, tagged with the layer it was drawn by.
#[derive(Debug, Clone)]
pub struct RenderedFeature {
    pub layer_id: String,
    pub feature: Feature,
}

/// Pointer interaction on the map.
#[derive(Debug, Clone, Copy)]
pub struct ClickEvent {
    /// Screen position of the pointer
    pub point: Pos2,
    /// Geographic position (lon, lat) under the pointer
    pub lng_lat: Coord<f64>,
}

/// Options for building a 3D line mesh.
#[derive(Debug, Clone)]
pub struct LineOptions {
    pub geometry: Vec<DVec3>,
    pub color: Color32,
    pub width: f32,
    pub opacity: f32,
}

/// Line mesh in a 3D scene.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMesh {
    pub geometry: Vec<DVec3>,
    pub color: Color32,
    /// Per-vertex colors, used instead of `color` when present
    pub vertex_colors: Option<Vec<Color32>>,
    pub width: f32,
    pub opacity: f32,
}

impl LineMesh {
    pub fn from_options(options: LineOptions) -> Self {
        Self {
            geometry: options.geometry,
            color: options.color,
            vertex_colors: None,
            width: options.width,
            opacity: options.opacity,
        }
    }

    pub fn set_vertex_colors(&mut self, colors: Vec<Color32>) {
        self.vertex_colors = Some(colors);
    }

    /// Color of the vertex at `index`.
    pub fn color_at(&self, index: usize) -> Color32 {
        self.vertex_colors
            .as_ref()
            .and_then(|c| c.get(index).copied())
            .unwrap_or(self.color)
    }
}

/// 3D scene graph bound to the engine's graphics context.
pub trait Scene3d {
    fn line(&mut self, options: LineOptions) -> LineMesh;

    fn add(&mut self, mesh: LineMesh);

    /// Re-syncs the scene with the current engine frame.
    fn update(&mut self);
}

/// Layer drawn through render callbacks instead of a declarative style.
pub trait CustomLayer {
    /// Called once when the layer is added to the map.
    fn on_add(&mut self);

    /// Called on every engine frame while the layer is visible.
    fn render(&mut self);
}

/// Operations the layer manager needs from a map rendering engine.
pub trait RenderingEngine {
    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), EngineError>;

    fn get_source(&self, id: &str) -> Option<&FeatureCollection>;

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;

    fn add_layer(&mut self, spec: LayerSpec) -> Result<(), EngineError>;

    /// Adds a custom layer; the engine calls `on_add` before returning.
    fn add_custom_layer(
        &mut self,
        id: &str,
        layer: Box<dyn CustomLayer>,
    ) -> Result<(), EngineError>;

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;

    fn has_layer(&self, id: &str) -> bool;

    fn set_layout_property(&mut self, id: &str, key: &str, value: Value)
        -> Result<(), EngineError>;

    fn set_filter(&mut self, id: &str, filter: Option<Filter>) -> Result<(), EngineError>;

    /// Features under `point` drawn by any of `layers`, topmost first.
    fn query_rendered_features(&self, point: Pos2, layers: &[String]) -> Vec<RenderedFeature>;

    /// Whether the native graphics context exists.
    fn graphics_ready(&self) -> bool;

    /// Creates a 3D scene for a custom layer.
    fn create_scene(&mut self, layer_id: &str) -> Result<Box<dyn Scene3d>, EngineError>;

    /// Loads an image asset and registers it under `name` for symbol layers.
    fn load_image(&mut self, name: &str, url: &str) -> Result<(), EngineError>;
}

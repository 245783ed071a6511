//! egui-painted rendering engine.
//!
//! `CanvasEngine` keeps sources and a bottom-to-top stack of layers, answers
//! hit-test queries against the current projection, and hands custom layers a
//! `CanvasScene` once the painter has created its graphics context. Drawing
//! itself lives in `geo::render_engine`.

use super::scene::{CanvasScene, SharedMeshes};
use super::{
    CustomLayer, EngineError, Filter, LayerSpec, LineMesh, RenderedFeature, RenderingEngine,
    Scene3d,
};
use crate::arc::gradient::parse_color;
use crate::geo::{hit_test, shapes, MapProjection};
use crate::layers::{LayerKind, StyleProps};
use eframe::egui::{Color32, Pos2};
use geojson::{Feature, FeatureCollection};
use serde_json::Value;
use std::collections::HashMap;

/// Reads a numeric style property.
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// Whether `url` names a raster image the map can use as a symbol.
fn is_image_asset(url: &str) -> bool {
    if url.starts_with("data:image/") {
        return true;
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit_once('.')
        .map(|(stem, ext)| {
            !stem.is_empty()
                && !ext.contains('/')
                && IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        })
        .unwrap_or(false)
}

pub(crate) fn style_number(props: &StyleProps, key: &str) -> Option<f32> {
    props.get(key).and_then(Value::as_f64).map(|v| v as f32)
}

/// Reads a color style property, applying `opacity_key` if present.
pub(crate) fn style_color(
    props: &StyleProps,
    key: &str,
    opacity_key: &str,
    fallback: Color32,
) -> Color32 {
    let color = props
        .get(key)
        .and_then(Value::as_str)
        .and_then(parse_color)
        .unwrap_or(fallback);
    match style_number(props, opacity_key) {
        Some(opacity) => color.gamma_multiply(opacity.clamp(0.0, 1.0)),
        None => color,
    }
}

enum LayerBody {
    Style(LayerSpec),
    Custom(Box<dyn CustomLayer>),
}

struct CanvasLayer {
    id: String,
    body: LayerBody,
    visible: bool,
    filter: Option<Filter>,
}

/// A visible layer as handed to the painter, bottom to top.
pub enum LayerView<'a> {
    Style {
        spec: &'a LayerSpec,
        features: Vec<&'a Feature>,
    },
    Custom {
        id: &'a str,
    },
}

/// Rendering engine drawn onto an egui canvas.
pub struct CanvasEngine {
    sources: HashMap<String, FeatureCollection>,
    layers: Vec<CanvasLayer>,
    images: HashMap<String, String>,
    meshes: SharedMeshes,
    projection: MapProjection,
    graphics_ready: bool,
}

impl Default for CanvasEngine {
    fn default() -> Self {
        Self::new(MapProjection::default())
    }
}

impl CanvasEngine {
    pub fn new(projection: MapProjection) -> Self {
        Self {
            sources: HashMap::new(),
            layers: Vec::new(),
            images: HashMap::new(),
            meshes: SharedMeshes::default(),
            projection,
            graphics_ready: false,
        }
    }

    /// Marks the graphics context as created. The painter calls this on its
    /// first frame.
    pub fn set_graphics_ready(&mut self, ready: bool) {
        if ready && !self.graphics_ready {
            log::debug!("Canvas graphics context ready");
        }
        self.graphics_ready = ready;
    }

    pub fn projection(&self) -> &MapProjection {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut MapProjection {
        &mut self.projection
    }

    /// Runs the render callback of every visible custom layer.
    pub fn render_frame(&mut self) {
        for layer in self.layers.iter_mut().filter(|l| l.visible) {
            if let LayerBody::Custom(custom) = &mut layer.body {
                custom.render();
            }
        }
    }

    /// Visible layers with their filtered features, bottom to top.
    pub fn visible_layers(&self) -> impl Iterator<Item = LayerView<'_>> {
        self.layers
            .iter()
            .filter(|l| l.visible)
            .map(move |layer| match &layer.body {
                LayerBody::Style(spec) => LayerView::Style {
                    spec,
                    features: self.features_of(spec, layer.filter.as_ref()),
                },
                LayerBody::Custom(_) => LayerView::Custom { id: &layer.id },
            })
    }

    /// Runs `f` with the meshes of a custom layer.
    pub fn with_meshes<R>(&self, layer_id: &str, f: impl FnOnce(&[LineMesh]) -> R) -> R {
        let store = self.meshes.borrow();
        f(store.get(layer_id).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Whether an image was registered under `name`.
    pub fn has_image(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    fn features_of<'a>(&'a self, spec: &LayerSpec, filter: Option<&Filter>) -> Vec<&'a Feature> {
        let Some(source) = self.sources.get(&spec.source) else {
            return Vec::new();
        };
        source
            .features
            .iter()
            .filter(|f| filter.map_or(true, |filter| filter.matches(f)))
            .collect()
    }

    fn layer(&self, id: &str) -> Option<&CanvasLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut CanvasLayer, EngineError> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| EngineError::UnknownLayer(id.to_string()))
    }

    fn hit_tolerance(spec: &LayerSpec) -> f32 {
        match spec.kind {
            LayerKind::Circle => style_number(&spec.paint, "circle-radius").unwrap_or(3.0) + 2.0,
            LayerKind::Heatmap => style_number(&spec.paint, "heatmap-radius").unwrap_or(8.0),
            LayerKind::Line => style_number(&spec.paint, "line-width").unwrap_or(1.0) / 2.0 + 3.0,
            LayerKind::Symbol => 8.0 * style_number(&spec.layout, "icon-size").unwrap_or(1.0),
            _ => 3.0,
        }
    }
}

impl RenderingEngine for CanvasEngine {
    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), EngineError> {
        if self.sources.contains_key(id) {
            return Err(EngineError::Duplicate(id.to_string()));
        }
        log::debug!("Adding source {} ({} features)", id, data.features.len());
        self.sources.insert(id.to_string(), data);
        Ok(())
    }

    fn get_source(&self, id: &str) -> Option<&FeatureCollection> {
        self.sources.get(id)
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        self.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| EngineError::UnknownSource(id.to_string()))
    }

    fn add_layer(&mut self, spec: LayerSpec) -> Result<(), EngineError> {
        if self.has_layer(&spec.id) {
            return Err(EngineError::Duplicate(spec.id));
        }
        if !self.sources.contains_key(&spec.source) {
            return Err(EngineError::UnknownSource(spec.source));
        }

        let visible = spec.layout.get("visibility").and_then(Value::as_str) != Some("none");
        self.layers.push(CanvasLayer {
            id: spec.id.clone(),
            body: LayerBody::Style(spec),
            visible,
            filter: None,
        });
        Ok(())
    }

    fn add_custom_layer(
        &mut self,
        id: &str,
        mut layer: Box<dyn CustomLayer>,
    ) -> Result<(), EngineError> {
        if self.has_layer(id) {
            return Err(EngineError::Duplicate(id.to_string()));
        }
        layer.on_add();
        self.layers.push(CanvasLayer {
            id: id.to_string(),
            body: LayerBody::Custom(layer),
            visible: true,
            filter: None,
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        if self.layers.len() == before {
            return Err(EngineError::UnknownLayer(id.to_string()));
        }
        self.meshes.borrow_mut().remove(id);
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layer(id).is_some()
    }

    fn set_layout_property(
        &mut self,
        id: &str,
        key: &str,
        value: Value,
    ) -> Result<(), EngineError> {
        let layer = self.layer_mut(id)?;
        if key == "visibility" {
            layer.visible = value.as_str() != Some("none");
        }
        if let LayerBody::Style(spec) = &mut layer.body {
            spec.layout.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn set_filter(&mut self, id: &str, filter: Option<Filter>) -> Result<(), EngineError> {
        self.layer_mut(id)?.filter = filter;
        Ok(())
    }

    fn query_rendered_features(&self, point: Pos2, layers: &[String]) -> Vec<RenderedFeature> {
        let mut results = Vec::new();

        for layer in self.layers.iter().rev() {
            if !layer.visible || !layers.contains(&layer.id) {
                continue;
            }
            // Custom layers are not queryable
            let LayerBody::Style(spec) = &layer.body else {
                continue;
            };

            let tolerance = Self::hit_tolerance(spec);
            for feature in self.features_of(spec, layer.filter.as_ref()).into_iter().rev() {
                let Some(geometry) = &feature.geometry else {
                    continue;
                };
                let hit = shapes(geometry)
                    .iter()
                    .any(|shape| hit_test(shape, &self.projection, point, tolerance));
                if hit {
                    results.push(RenderedFeature {
                        layer_id: layer.id.clone(),
                        feature: feature.clone(),
                    });
                }
            }
        }

        results
    }

    fn graphics_ready(&self) -> bool {
        self.graphics_ready
    }

    fn create_scene(&mut self, layer_id: &str) -> Result<Box<dyn Scene3d>, EngineError> {
        if !self.graphics_ready {
            return Err(EngineError::ContextUnavailable);
        }
        self.meshes
            .borrow_mut()
            .insert(layer_id.to_string(), Vec::new());
        Ok(Box::new(CanvasScene::new(layer_id, self.meshes.clone())))
    }

    fn load_image(&mut self, name: &str, url: &str) -> Result<(), EngineError> {
        let fail = |reason: &str| EngineError::ImageLoad {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if name.is_empty() || url.is_empty() {
            return Err(fail("missing name or url"));
        }
        if !is_image_asset(url) {
            return Err(fail(&format!("{} is not a supported image", url)));
        }
        if self.images.contains_key(name) {
            return Err(fail("an image with this name is already registered"));
        }
        self.images.insert(name.to_string(), url.to_string());
        Ok(())
    }
}

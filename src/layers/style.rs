//! Paint and layout resolution for style layers.
//!
//! Style properties are layered: type-level defaults, then icon variant
//! overrides, then size variant overrides, then the request's explicit
//! overrides. Later layers overwrite colliding keys of earlier ones.

use super::config::{LayerConfig, StyleProps};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Merges style layers left to right; the last layer wins on key collisions.
pub fn merge_style<'a>(layers: impl IntoIterator<Item = &'a StyleProps>) -> StyleProps {
    let mut merged = StyleProps::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Resolved paint and layout for one layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedStyle {
    pub paint: StyleProps,
    pub layout: StyleProps,
}

/// Tables of shared paint and layout overrides.
///
/// Keys are either a style type (`"circle"`) or a type plus variant
/// (`"circle-big"`, `"symbol-metro"`).
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    paint: HashMap<String, StyleProps>,
    layout: HashMap<String, StyleProps>,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();

        catalog.insert_paint(
            "circle",
            json!({
                "circle-color": "#f5c860",
                "circle-radius": 3.0,
                "circle-opacity": 0.8,
                "circle-stroke-color": "#1c1c28",
                "circle-stroke-width": 0.5
            }),
        );
        catalog.insert_paint("circle-small", json!({ "circle-radius": 2.0 }));
        catalog.insert_paint("circle-big", json!({ "circle-radius": 6.0 }));
        catalog.insert_paint(
            "line",
            json!({ "line-color": "#5aa0e6", "line-width": 2.0, "line-opacity": 0.9 }),
        );
        catalog.insert_paint("line-dash", json!({ "line-dasharray": [2, 2] }));
        catalog.insert_paint("line-wide", json!({ "line-width": 4.0 }));
        catalog.insert_layout(
            "line",
            json!({ "line-cap": "round", "line-join": "round" }),
        );
        catalog.insert_paint(
            "fill",
            json!({ "fill-color": "#6e9a6e", "fill-opacity": 0.35, "fill-outline-color": "#8fbf8f" }),
        );
        catalog.insert_paint(
            "fill-extrusion",
            json!({ "fill-extrusion-color": "#9a9ab4", "fill-extrusion-opacity": 0.6 }),
        );
        catalog.insert_paint(
            "heatmap",
            json!({ "heatmap-radius": 12.0, "heatmap-opacity": 0.7 }),
        );
        catalog.insert_paint("symbol", json!({ "text-color": "#dcdcf0" }));
        catalog.insert_layout(
            "symbol",
            json!({ "icon-size": 1.0, "icon-allow-overlap": true }),
        );
        catalog.insert_layout("symbol-metro", json!({ "icon-image": "metro" }));
        catalog.insert_layout("symbol-triangle_green", json!({ "icon-image": "triangle_green" }));
        catalog.insert_layout("symbol-triangle_white", json!({ "icon-image": "triangle_white" }));
        catalog.insert_layout("symbol-bike_green", json!({ "icon-image": "bike_green" }));
        catalog.insert_layout("symbol-bike_orange", json!({ "icon-image": "bike_orange" }));
        catalog.insert_layout("symbol-bike_red", json!({ "icon-image": "bike_red" }));
        catalog.insert_layout("symbol-big", json!({ "icon-size": 1.5 }));

        catalog
    }
}

impl StyleCatalog {
    /// Creates a catalog without any entries.
    pub fn empty() -> Self {
        Self {
            paint: HashMap::new(),
            layout: HashMap::new(),
        }
    }

    pub fn insert_paint(&mut self, key: &str, props: Value) {
        if let Value::Object(map) = props {
            self.paint.insert(key.to_string(), map);
        }
    }

    pub fn insert_layout(&mut self, key: &str, props: Value) {
        if let Value::Object(map) = props {
            self.layout.insert(key.to_string(), map);
        }
    }

    /// Resolves paint and layout for a layer request.
    pub fn resolve(&self, config: &LayerConfig) -> ResolvedStyle {
        let keys = self.lookup_keys(config);

        let paint = merge_style(
            keys.iter()
                .filter_map(|k| self.paint.get(k))
                .chain(config.paint.as_ref()),
        );
        let layout = merge_style(
            keys.iter()
                .filter_map(|k| self.layout.get(k))
                .chain(config.layout.as_ref()),
        );

        ResolvedStyle { paint, layout }
    }

    /// Table keys consulted for a request, lowest precedence first.
    fn lookup_keys(&self, config: &LayerConfig) -> Vec<String> {
        let kind = config.kind.as_str();
        let mut keys = vec![kind.to_string()];
        if let Some(icon) = &config.icon {
            keys.push(format!("{}-{}", kind, icon));
        }
        if let Some(size) = &config.size {
            keys.push(format!("{}-{}", kind, size));
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerKind;

    fn props(value: Value) -> StyleProps {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_merge_last_wins() {
        let a = props(json!({ "color": "red", "width": 1 }));
        let b = props(json!({ "color": "blue" }));
        let c = props(json!({ "width": 3, "opacity": 0.5 }));

        let merged = merge_style([&a, &b, &c]);
        assert_eq!(merged["color"], json!("blue"));
        assert_eq!(merged["width"], json!(3));
        assert_eq!(merged["opacity"], json!(0.5));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_merge_replaces_arrays() {
        let a = props(json!({ "dash": [1, 1, 1] }));
        let b = props(json!({ "dash": [4] }));
        let merged = merge_style([&a, &b]);
        assert_eq!(merged["dash"], json!([4]));
    }

    #[test]
    fn test_resolve_precedence() {
        let mut catalog = StyleCatalog::empty();
        catalog.insert_paint("circle", json!({ "circle-radius": 1, "circle-color": "type" }));
        catalog.insert_paint("circle-pin", json!({ "circle-color": "icon", "circle-blur": 1 }));
        catalog.insert_paint("circle-big", json!({ "circle-color": "size", "circle-radius": 8 }));

        let config = LayerConfig::new("shops", LayerKind::Circle)
            .with_icon("pin")
            .with_size("big")
            .with_paint(props(json!({ "circle-radius": 10 })));

        let style = catalog.resolve(&config);
        assert_eq!(style.paint["circle-color"], json!("size"));
        assert_eq!(style.paint["circle-radius"], json!(10));
        assert_eq!(style.paint["circle-blur"], json!(1));
    }

    #[test]
    fn test_resolve_unknown_variants_fall_back() {
        let catalog = StyleCatalog::default();
        let config = LayerConfig::new("stations", LayerKind::Symbol).with_icon("metro");
        let style = catalog.resolve(&config);
        assert_eq!(style.layout["icon-image"], json!("metro"));
        assert_eq!(style.layout["icon-allow-overlap"], json!(true));

        let plain = LayerConfig::new("stations", LayerKind::Symbol).with_icon("unknown");
        let style = catalog.resolve(&plain);
        assert!(!style.layout.contains_key("icon-image"));
    }
}

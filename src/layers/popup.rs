//! Popup aggregation for clicked map features.

use super::config::{LayerConfig, LayerId};
use super::registry::LayerRegistry;
use crate::engine::RenderedFeature;
use geo_types::Coord;
use geojson::Feature;
use std::collections::HashSet;

/// Number of distinct layers shown in one popup by default.
pub const DEFAULT_POPUP_LAYERS: usize = 3;

/// One struck feature and the config of the layer that drew it.
#[derive(Debug, Clone)]
pub struct PopupEntry {
    pub layer_id: LayerId,
    pub feature: Feature,
    pub config: LayerConfig,
}

/// Popup anchored at a geographic coordinate.
#[derive(Debug, Clone)]
pub struct Popup {
    pub lng_lat: Coord<f64>,
    /// Entries in stacking order, topmost layer first
    pub entries: Vec<PopupEntry>,
}

/// Keeps the first feature of each distinct layer, up to `max_layers` layers.
///
/// `results` must be in stacking order. Features from layers the registry
/// does not know are skipped.
pub fn aggregate(
    results: Vec<RenderedFeature>,
    registry: &LayerRegistry,
    max_layers: usize,
) -> Vec<PopupEntry> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();

    for result in results {
        if entries.len() >= max_layers {
            break;
        }
        if seen.contains(&result.layer_id) {
            continue;
        }
        let Some(config) = registry.config_for(&result.layer_id) else {
            log::debug!("Ignoring feature from untracked layer {}", result.layer_id);
            continue;
        };

        seen.insert(result.layer_id.clone());
        entries.push(PopupEntry {
            layer_id: LayerId::from(result.layer_id.as_str()),
            feature: result.feature,
            config: config.clone(),
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerKind;
    use geojson::JsonObject;
    use serde_json::json;

    fn hit(layer: &str, n: i64) -> RenderedFeature {
        let mut props = JsonObject::new();
        props.insert("n".to_string(), json!(n));
        RenderedFeature {
            layer_id: layer.to_string(),
            feature: Feature {
                bbox: None,
                geometry: None,
                id: None,
                properties: Some(props),
                foreign_members: None,
            },
        }
    }

    fn registry(indices: &[&str]) -> LayerRegistry {
        let mut registry = LayerRegistry::new();
        for index in indices {
            registry.register(LayerConfig::new(*index, LayerKind::Circle));
        }
        registry
    }

    #[test]
    fn test_caps_at_three_distinct_layers() {
        let registry = registry(&["a", "b", "c", "d", "e"]);
        let results = vec![
            hit("a-circle", 1),
            hit("a-circle", 2),
            hit("b-circle", 3),
            hit("c-circle", 4),
            hit("b-circle", 5),
            hit("d-circle", 6),
            hit("e-circle", 7),
        ];

        let entries = aggregate(results, &registry, DEFAULT_POPUP_LAYERS);
        let ids: Vec<&str> = entries.iter().map(|e| e.layer_id.as_str()).collect();
        assert_eq!(ids, vec!["a-circle", "b-circle", "c-circle"]);

        let first = entries[0].feature.properties.as_ref().unwrap();
        assert_eq!(first["n"], json!(1));
        assert_eq!(entries[1].config.index, "b");
    }

    #[test]
    fn test_non_adjacent_duplicates_are_skipped() {
        let registry = registry(&["a", "b"]);
        let results = vec![hit("a-circle", 1), hit("b-circle", 2), hit("a-circle", 3)];
        let entries = aggregate(results, &registry, DEFAULT_POPUP_LAYERS);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_empty_and_untracked() {
        let registry = registry(&["a"]);
        assert!(aggregate(Vec::new(), &registry, 3).is_empty());

        let entries = aggregate(vec![hit("zz-line", 1), hit("a-circle", 2)], &registry, 3);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].layer_id.as_str(), "a-circle");
    }
}

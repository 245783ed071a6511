//! Map components offered in the layer panel.
//!
//! A component is a named group of layer configs toggled together, with an
//! optional property filter the user can pick a value for.

use crate::layers::{LayerConfig, LayerKind, StyleProps};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn props(value: Value) -> StyleProps {
    value.as_object().cloned().unwrap_or_default()
}

/// Property filter offered for a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterControl {
    /// Feature property compared against the selected value
    pub property: String,
    /// Values the user can pick
    pub options: Vec<String>,
}

/// A toggleable group of layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapComponent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub filter: Option<FilterControl>,

    /// Whether the component is currently turned on
    #[serde(skip)]
    pub enabled: bool,
    /// Currently applied filter value
    #[serde(skip)]
    pub selected_filter: Option<String>,
}

impl MapComponent {
    pub fn new(name: &str, description: &str, layers: Vec<LayerConfig>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            layers,
            filter: None,
            enabled: false,
            selected_filter: None,
        }
    }

    pub fn with_filter(mut self, property: &str, options: &[&str]) -> Self {
        self.filter = Some(FilterControl {
            property: property.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        });
        self
    }
}

/// All components shown in the layer panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerCatalog {
    pub components: Vec<MapComponent>,
}

impl Default for LayerCatalog {
    fn default() -> Self {
        let earthquakes = MapComponent::new(
            "Earthquakes",
            "Recorded events sized by class, with station markers.",
            vec![
                LayerConfig::new("earthquake", LayerKind::Circle)
                    .with_size("big")
                    .with_paint(props(json!({ "circle-color": "#ef8a62" })))
                    .with_title("Earthquake")
                    .with_property("name", "Event")
                    .with_property("magnitude", "Magnitude")
                    .with_property("depth", "Depth"),
                LayerConfig::new("earthquake", LayerKind::Heatmap),
            ],
        )
        .with_filter("depth", &["shallow", "deep"]);

        let flows = MapComponent::new(
            "Commute flows",
            "Daily riders from the central hub, drawn as 3D arcs.",
            vec![LayerConfig::new("commute_flow", LayerKind::Arc)
                .with_paint(props(json!({
                    "arc-color": ["#ffd166", "#ef476f"],
                    "arc-width": 2,
                    "arc-opacity": 0.8
                })))
                .with_title("Commute flow")
                .with_property("name", "Route")
                .with_property("riders", "Riders")],
        )
        .with_filter("mode", &["metro", "bus"]);

        let districts = MapComponent::new(
            "Districts",
            "Administrative districts shaded by area.",
            vec![LayerConfig::new("district", LayerKind::Fill)
                .with_title("District")
                .with_property("name", "Name")
                .with_property("population", "Population")],
        );

        let stations = MapComponent::new(
            "Bike stations",
            "Rental stations and their availability.",
            vec![LayerConfig::new("bike_station", LayerKind::Symbol)
                .with_icon("bike_green")
                .with_title("Bike station")
                .with_property("name", "Station")
                .with_property("status", "Status")],
        )
        .with_filter("status", &["available", "low", "empty"]);

        Self {
            components: vec![earthquakes, flows, districts, stations],
        }
    }
}

impl LayerCatalog {
    /// Turns every component off and resets its filter.
    pub fn reset(&mut self) {
        for component in &mut self.components {
            component.enabled = false;
            component.selected_filter = None;
        }
    }
}

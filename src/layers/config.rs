//! Layer configuration and identifiers.
//!
//! A `LayerConfig` is what a caller hands to the manager when it wants a layer
//! on the map. The layer identifier is derived from the data-source index and
//! the rendering kind, so the same request always maps to the same layer.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Paint or layout properties keyed by style property name.
pub type StyleProps = serde_json::Map<String, serde_json::Value>;

/// Rendering kind of a map layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    #[serde(alias = "point")]
    Circle,
    Line,
    #[serde(alias = "polygon")]
    Fill,
    FillExtrusion,
    Heatmap,
    Symbol,
    /// Curved 3D paths rendered through the scene graph.
    Arc,
    Custom,
}

impl LayerKind {
    /// Style type name used in layer identifiers and style tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Line => "line",
            Self::Fill => "fill",
            Self::FillExtrusion => "fill-extrusion",
            Self::Heatmap => "heatmap",
            Self::Symbol => "symbol",
            Self::Arc => "arc",
            Self::Custom => "custom",
        }
    }

    /// Whether this kind is drawn by a custom render callback rather than a
    /// declarative style layer.
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Arc | Self::Custom)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a layer on the map (`"<index>-<type>"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(index: &str, kind: LayerKind) -> Self {
        Self(format!("{}-{}", index, kind))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the data source backing this layer.
    pub fn source_id(&self) -> String {
        format!("{}-source", self.0)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for LayerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Property shown in the popup for features of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupProperty {
    /// Feature property key
    pub key: String,
    /// Display name
    pub name: String,
}

/// Request for a data-backed map layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Name of the dataset backing the layer
    pub index: String,
    /// Rendering kind
    #[serde(rename = "type")]
    pub kind: LayerKind,
    /// Icon variant, selects `<type>-<icon>` style overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Size variant, selects `<type>-<size>` style overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Explicit paint overrides, highest precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paint: Option<StyleProps>,
    /// Explicit layout overrides, highest precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<StyleProps>,
    /// Popup heading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Properties listed in the popup
    #[serde(default, rename = "property", skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PopupProperty>,
}

impl LayerConfig {
    pub fn new(index: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            index: index.into(),
            kind,
            icon: None,
            size: None,
            paint: None,
            layout: None,
            title: None,
            properties: Vec::new(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_paint(mut self, paint: StyleProps) -> Self {
        self.paint = Some(paint);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.properties.push(PopupProperty {
            key: key.into(),
            name: name.into(),
        });
        self
    }

    pub fn layer_id(&self) -> LayerId {
        LayerId::new(&self.index, self.kind)
    }
}

//! Map workbench settings.
//!
//! Settings are persisted to localStorage so they survive page reloads. On
//! native targets the defaults are used.

use crate::arc::{AttachPolicy, DEFAULT_ARC_INTERVALS};
use crate::layers::{LayerConfig, LayerKind, ManagerOptions, SymbolImage, DEFAULT_POPUP_LAYERS};
use serde::{Deserialize, Serialize};
use web_time::Duration;

/// Names of the images registered for symbol layers on style load.
const SYMBOL_IMAGE_NAMES: [&str; 6] = [
    "metro",
    "triangle_green",
    "triangle_white",
    "bike_green",
    "bike_orange",
    "bike_red",
];

/// Tunables for data loading, arc rendering and popups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// Base URL (or directory on native) holding `mapData/<index>.geojson`.
    /// Empty means the built-in sample datasets.
    pub data_base_url: String,
    /// Intervals each arc is sampled into.
    pub arc_intervals: usize,
    /// Grace before attaching custom layers on desktop devices.
    pub desktop_grace_ms: u64,
    /// Grace before attaching custom layers on mobile devices.
    pub mobile_grace_ms: u64,
    /// Wait between graphics-readiness checks.
    pub retry_interval_ms: u64,
    /// Readiness checks before an attachment times out.
    pub max_retries: u32,
    /// Distinct layers listed in one popup.
    pub popup_max_layers: usize,
    /// Images loaded for symbol layers.
    pub symbol_images: Vec<SymbolImage>,
    /// Reference layers added whenever the style loads.
    pub base_layers: Vec<LayerConfig>,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            data_base_url: String::new(),
            arc_intervals: DEFAULT_ARC_INTERVALS,
            desktop_grace_ms: 500,
            mobile_grace_ms: 2000,
            retry_interval_ms: 250,
            max_retries: 20,
            popup_max_layers: DEFAULT_POPUP_LAYERS,
            symbol_images: SYMBOL_IMAGE_NAMES
                .iter()
                .map(|name| SymbolImage {
                    name: name.to_string(),
                    url: format!("images/map/{}.png", name),
                })
                .collect(),
            base_layers: vec![LayerConfig::new("district", LayerKind::Line)
                .with_paint(
                    serde_json::json!({ "line-color": "#44445a", "line-width": 1.0 })
                        .as_object()
                        .cloned()
                        .unwrap_or_default(),
                )],
        }
    }
}

impl MapSettings {
    /// localStorage key for persisting settings.
    const STORAGE_KEY: &'static str = "map_workbench_settings";

    /// Attachment timing for the current device class.
    pub fn attach_policy(&self, is_mobile: bool) -> AttachPolicy {
        let grace = if is_mobile {
            self.mobile_grace_ms
        } else {
            self.desktop_grace_ms
        };
        AttachPolicy {
            grace: Duration::from_millis(grace),
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            max_retries: self.max_retries,
        }
    }

    /// Options for a layer manager built from these settings.
    pub fn manager_options(&self, is_mobile: bool) -> ManagerOptions {
        ManagerOptions {
            arc_intervals: self.arc_intervals.max(1),
            attach_policy: self.attach_policy(is_mobile),
            popup_max_layers: self.popup_max_layers,
            base_layers: self.base_layers.clone(),
            symbol_images: self.symbol_images.clone(),
        }
    }

    /// Load settings from localStorage.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let window = match web_sys::window() {
            Some(w) => w,
            None => return Self::default(),
        };

        let storage = match window.local_storage() {
            Ok(Some(s)) => s,
            _ => return Self::default(),
        };

        let json = match storage.get_item(Self::STORAGE_KEY) {
            Ok(Some(s)) => s,
            _ => return Self::default(),
        };

        Self::from_json(&json)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    /// Parses stored settings, falling back to defaults on error.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(settings) => {
                log::info!("Loaded map settings from {}", Self::STORAGE_KEY);
                settings
            }
            Err(e) => {
                log::warn!("Failed to parse map settings: {}", e);
                Self::default()
            }
        }
    }

    /// Save settings to localStorage.
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let window = match web_sys::window() {
            Some(w) => w,
            None => return,
        };

        let storage = match window.local_storage() {
            Ok(Some(s)) => s,
            _ => return,
        };

        let json = match serde_json::to_string(self) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Failed to serialize map settings: {}", e);
                return;
            }
        };

        if let Err(e) = storage.set_item(Self::STORAGE_KEY, &json) {
            log::warn!("Failed to save map settings: {:?}", e);
        } else {
            log::info!("Saved map settings to localStorage");
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        log::debug!("Settings persistence is only available in the browser");
    }
}

/// Whether the browser reports a mobile-class device.
#[cfg(target_arch = "wasm32")]
pub fn is_mobile_device() -> bool {
    web_sys::window()
        .and_then(|w| w.navigator().user_agent().ok())
        .is_some_and(|agent| is_mobile_user_agent(&agent))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn is_mobile_device() -> bool {
    false
}

/// Matches the user agent markers of phones and tablets.
pub fn is_mobile_user_agent(agent: &str) -> bool {
    ["Android", "iPhone", "iPad", "iPod", "Mobile", "webOS", "BlackBerry"]
        .iter()
        .any(|marker| agent.contains(marker))
}

//! Application state management.
//!
//! This module contains the state the UI panels read and write. Layer state
//! proper lives in the `LayerManager`; this is only what the host needs around
//! it.

mod layer;
pub mod settings;
mod view;

pub use layer::{FilterControl, LayerCatalog, MapComponent};
pub use settings::MapSettings;
pub use view::ViewState;

/// Root application state containing all sub-states.
#[derive(Default)]
pub struct AppState {
    /// Persisted settings
    pub settings: MapSettings,

    /// Components offered in the layer panel
    pub catalog: LayerCatalog,

    /// Canvas zoom and pan
    pub view: ViewState,

    /// Whether the device is mobile-class
    pub is_mobile: bool,

    /// Application status message displayed in top bar
    pub status_message: String,

    /// Set by the layer panel to request removal of every layer
    pub clear_requested: bool,

    /// Set by the settings panel to rebuild the map with current settings
    pub reload_requested: bool,
}

impl AppState {
    pub fn new(settings: MapSettings, is_mobile: bool) -> Self {
        Self {
            settings,
            is_mobile,
            status_message: "Ready".to_string(),
            ..Default::default()
        }
    }
}

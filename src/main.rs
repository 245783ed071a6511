#![warn(clippy::all)]

//! Map Layer Workbench - an interactive map with data-backed layers.
//!
//! Layers are requested from a panel of map components, fetched from a
//! dataset source, styled and drawn on an egui canvas. Flow datasets are
//! rendered as 3D arcs through a scene attached once the canvas graphics
//! context is up. Clicking the map lists the features under the pointer.

mod arc;
mod data;
mod engine;
mod geo;
mod layers;
mod state;
mod ui;

use data::{DataSource, RemoteSource};
use eframe::egui;
use engine::CanvasEngine;
use layers::LayerManager;
use state::{AppState, MapSettings};
use web_time::{Duration, Instant};

/// Layer manager as wired into the application.
pub type MapManager = LayerManager<CanvasEngine, Box<dyn DataSource>>;

// Native entry point
#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions::default();

    eframe::run_native(
        "Map Layer Workbench",
        native_options,
        Box::new(|cc| Ok(Box::new(MapWorkbenchApp::new(cc)))),
    )
}

// WASM entry point - main is not called on wasm32
#[cfg(target_arch = "wasm32")]
fn main() {}

/// Entry point for the WASM application.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub async fn start() {
    use eframe::wasm_bindgen::JsCast as _;

    // Redirect `log` messages to `console.log`:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document to mount the app in");
            return;
        };

        let canvas = match document
            .get_element_by_id("app_canvas")
            .map(|e| e.dyn_into::<web_sys::HtmlCanvasElement>())
        {
            Some(Ok(canvas)) => canvas,
            _ => {
                log::error!("app_canvas was missing or not a HtmlCanvasElement");
                return;
            }
        };

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(MapWorkbenchApp::new(cc)))),
            )
            .await;

        // Remove the loading text once the app has loaded:
        if let Some(loading_text) = document.get_element_by_id("loading_text") {
            match start_result {
                Ok(_) => {
                    loading_text.remove();
                }
                Err(e) => {
                    loading_text.set_inner_html(
                        "<p>The app has crashed. See the developer console for details.</p>",
                    );
                    log::error!("Failed to start eframe: {e:?}");
                }
            }
        }
    });
}

/// Builds the dataset source selected by the settings.
fn data_source_for(settings: &MapSettings) -> Box<dyn DataSource> {
    if settings.data_base_url.is_empty() {
        log::info!("Using built-in sample datasets");
        Box::new(data::sample::sample_source())
    } else {
        log::info!("Loading datasets from {}", settings.data_base_url);
        Box::new(RemoteSource::new(settings.data_base_url.clone()))
    }
}

/// Creates a manager with a fresh map and kicks off style loading.
fn build_manager(settings: &MapSettings, is_mobile: bool) -> MapManager {
    let mut manager = LayerManager::new(
        data_source_for(settings),
        settings.manager_options(is_mobile),
    );
    manager.attach_engine(CanvasEngine::default());
    manager.on_style_load();
    manager
}

/// Main application state and logic.
pub struct MapWorkbenchApp {
    /// UI state around the map
    state: AppState,

    /// Owner of every layer on the map
    manager: MapManager,
}

impl MapWorkbenchApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings = MapSettings::load();
        let is_mobile = state::settings::is_mobile_device();
        log::info!(
            "Starting map workbench ({} device)",
            if is_mobile { "mobile" } else { "desktop" }
        );

        let manager = build_manager(&settings, is_mobile);
        Self {
            state: AppState::new(settings, is_mobile),
            manager,
        }
    }

    fn handle_requests(&mut self) {
        if self.state.clear_requested {
            self.state.clear_requested = false;
            self.manager.clear_only_layers();
            self.state.catalog.reset();
            self.state.status_message = "Cleared all layers".to_string();
        }

        if self.state.reload_requested {
            self.state.reload_requested = false;
            self.manager.clear_entire_map();
            self.manager = build_manager(&self.state.settings, self.state.is_mobile);
            self.state.catalog.reset();
            self.state.view.reset();
            self.state.status_message = "Map reloaded".to_string();
        }
    }
}

impl eframe::App for MapWorkbenchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_requests();

        // Drive completed fetches and due arc attachments
        self.manager.poll(Instant::now());

        ui::render_top_bar(ctx, &self.state, &self.manager);
        ui::render_left_panel(ctx, &mut self.state, &mut self.manager);
        ui::render_canvas(ctx, &mut self.state, &mut self.manager);
        ui::render_popup(ctx, &mut self.manager);

        if self.manager.has_work() {
            // Futures are polled with a no-op waker, so keep frames coming
            ctx.request_repaint_after(Duration::from_millis(50));
        } else {
            self.manager.on_idle();
        }
    }
}

//! Layer lifecycle management.
//!
//! `LayerManager` is the single writer of the layer registry. It creates
//! layers from configs (fetching their data first), toggles visibility without
//! destroying state, applies filters, aggregates popups and tears everything
//! down when the map is switched or closed.
//!
//! Fetches and deferred arc attachments complete asynchronously. The host
//! calls `poll()` once per frame to drive them on the UI thread; every
//! in-flight operation carries a ticket bound to its layer id, so a late
//! completion for a layer that was turned off or cleared in the meantime is
//! discarded.

use super::config::{LayerConfig, LayerId, LayerKind};
use super::popup::{aggregate, Popup, DEFAULT_POPUP_LAYERS};
use super::registry::{LayerRegistry, PendingToken};
use super::style::StyleCatalog;
use crate::arc::{ArcRender, AttachEvent, AttachPolicy, AttachScheduler, DEFAULT_ARC_INTERVALS};
use crate::data::{DataError, DataSource};
use crate::engine::{ClickEvent, Filter, LayerSpec, RenderingEngine};
use futures_util::future::{FutureExt, LocalBoxFuture};
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::task::noop_waker_ref;
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::task::{Context, Poll};
use web_time::Instant;

/// Image registered with the engine for symbol layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolImage {
    pub name: String,
    pub url: String,
}

/// Tunables of the layer manager.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Intervals each arc is sampled into
    pub arc_intervals: usize,
    /// Timing of deferred custom layer attachment
    pub attach_policy: AttachPolicy,
    /// Distinct layers shown in one popup
    pub popup_max_layers: usize,
    /// Reference layers added on style load, outside the registry
    pub base_layers: Vec<LayerConfig>,
    /// Images loaded on style load
    pub symbol_images: Vec<SymbolImage>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            arc_intervals: DEFAULT_ARC_INTERVALS,
            attach_policy: AttachPolicy::default(),
            popup_max_layers: DEFAULT_POPUP_LAYERS,
            base_layers: Vec::new(),
            symbol_images: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPurpose {
    /// A registry-tracked layer requested through `add_layers`
    Layer,
    /// A base reference layer added on style load
    Base,
}

struct FetchOutcome {
    target: String,
    config: LayerConfig,
    purpose: FetchPurpose,
    ticket: u64,
    result: Result<FeatureCollection, DataError>,
}

/// Orchestrates layer creation, visibility, filtering and removal.
pub struct LayerManager<E, D> {
    engine: Option<E>,
    data_source: D,
    registry: LayerRegistry,
    styles: StyleCatalog,
    options: ManagerOptions,
    fetches: FuturesUnordered<LocalBoxFuture<'static, FetchOutcome>>,
    /// Ticket of the live fetch per target id
    tickets: HashMap<String, (u64, FetchPurpose)>,
    next_ticket: u64,
    arcs: AttachScheduler<ArcRender>,
    popup: Option<Popup>,
}

impl<E: RenderingEngine, D: DataSource> LayerManager<E, D> {
    pub fn new(data_source: D, options: ManagerOptions) -> Self {
        let arcs = AttachScheduler::new(options.attach_policy);
        Self {
            engine: None,
            data_source,
            registry: LayerRegistry::new(),
            styles: StyleCatalog::default(),
            options,
            fetches: FuturesUnordered::new(),
            tickets: HashMap::new(),
            next_ticket: 0,
            arcs,
            popup: None,
        }
    }

    /// Installs the rendering engine of a freshly initialized map.
    pub fn attach_engine(&mut self, engine: E) {
        self.engine = Some(engine);
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn data_source(&self) -> &D {
        &self.data_source
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// Replaces the tunables. Work already in flight keeps its sampling;
    /// pending attachments follow the new timing.
    pub fn set_options(&mut self, options: ManagerOptions) {
        self.arcs.set_policy(options.attach_policy);
        self.options = options;
    }

    /// Currently open popup, for the presenter.
    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    /// Loading signal: true while any pending token is outstanding.
    pub fn is_loading(&self) -> bool {
        self.registry.pending().is_loading()
    }

    /// Whether fetches or attachments still need `poll()` calls.
    pub fn has_work(&self) -> bool {
        !self.fetches.is_empty() || !self.arcs.is_empty()
    }

    // ------------------------------------------------------------------
    // Adding layers
    // ------------------------------------------------------------------

    /// Adds or re-shows the requested layers.
    ///
    /// Layers that already exist are made visible again without refetching.
    /// New layers have their data fetched; they appear once `poll()` has
    /// processed the completed fetch.
    pub fn add_layers(&mut self, requests: impl IntoIterator<Item = LayerConfig>) {
        for config in requests {
            let id = config.layer_id();

            if self.registry.is_known(id.as_str()) {
                self.show_existing(&config);
                continue;
            }

            if self.tickets.contains_key(id.as_str()) || self.arcs.is_scheduled(id.as_str()) {
                log::debug!("Layer {} is already loading", id);
                continue;
            }

            log::info!("Requesting data for layer {}", id);
            self.registry
                .pending_mut()
                .begin(PendingToken::Layer(id.clone()));
            self.request_data(id.to_string(), config, FetchPurpose::Layer);
        }
    }

    fn show_existing(&mut self, config: &LayerConfig) {
        let id = config.layer_id();
        self.registry.pending_mut().begin(PendingToken::Rendering);

        let Some(engine) = self.engine.as_mut() else {
            log::warn!("No map engine; cannot show layer {}", id);
            return;
        };

        if engine.has_layer(id.as_str()) {
            if let Err(e) = engine.set_layout_property(id.as_str(), "visibility", json!("visible"))
            {
                log::warn!("Failed to show layer {}: {}", id, e);
            }
        } else if config.kind == LayerKind::Arc && !self.arcs.is_scheduled(id.as_str()) {
            // A rebuild was cancelled while the layer was hidden
            self.rebuild_arc(config, None);
        }

        self.registry.set_visible(id.as_str(), true);
    }

    fn request_data(&mut self, target: String, config: LayerConfig, purpose: FetchPurpose) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.tickets.insert(target.clone(), (ticket, purpose));

        let fetch = self.data_source.fetch(&config.index);
        self.fetches.push(
            async move {
                let result = fetch.await;
                FetchOutcome {
                    target,
                    config,
                    purpose,
                    ticket,
                    result,
                }
            }
            .boxed_local(),
        );
    }

    // ------------------------------------------------------------------
    // Driving asynchronous work
    // ------------------------------------------------------------------

    /// Processes completed fetches and due arc attachments.
    pub fn poll(&mut self, now: Instant) {
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut completed = Vec::new();
        while let Poll::Ready(Some(outcome)) = self.fetches.poll_next_unpin(&mut cx) {
            completed.push(outcome);
        }
        for outcome in completed {
            self.handle_fetch(outcome);
        }

        let ready = self.engine.as_ref().is_some_and(|e| e.graphics_ready());
        for event in self.arcs.poll(now, ready) {
            match event {
                AttachEvent::Ready { layer_id, payload } => self.attach_arc(&layer_id, payload),
                AttachEvent::TimedOut { layer_id, .. } => {
                    log::error!(
                        "Timed out waiting for the graphics context; dropping layer {}",
                        layer_id
                    );
                    self.drop_failed_arc(&layer_id);
                }
            }
        }
    }

    fn handle_fetch(&mut self, outcome: FetchOutcome) {
        match self.tickets.get(&outcome.target) {
            Some((ticket, _)) if *ticket == outcome.ticket => {}
            _ => {
                log::debug!("Discarding cancelled fetch for {}", outcome.target);
                return;
            }
        }
        self.tickets.remove(&outcome.target);

        let data = match outcome.result {
            Ok(data) => data,
            Err(e) => {
                log::error!(
                    "Failed to load dataset {} for {}: {}",
                    outcome.config.index,
                    outcome.target,
                    e
                );
                self.registry.pending_mut().finish_layer(&outcome.target);
                return;
            }
        };

        match outcome.purpose {
            FetchPurpose::Layer => self.materialize(outcome.config, data),
            FetchPurpose::Base => self.add_base_layer(outcome.config, data),
        }
    }

    fn materialize(&mut self, config: LayerConfig, data: FeatureCollection) {
        let id = config.layer_id();
        let Some(engine) = self.engine.as_mut() else {
            log::warn!("No map engine; dropping layer {}", id);
            self.registry.pending_mut().finish_layer(id.as_str());
            return;
        };

        let arc_data = (config.kind == LayerKind::Arc).then(|| data.clone());
        if let Err(e) = engine.add_source(&id.source_id(), data) {
            log::error!("Failed to add source for {}: {}", id, e);
            self.registry.pending_mut().finish_layer(id.as_str());
            return;
        }

        match arc_data {
            Some(data) => self.start_arc(config, data),
            None => self.add_standard_layer(config),
        }
    }

    fn add_standard_layer(&mut self, config: LayerConfig) {
        let id = config.layer_id();
        let style = self.styles.resolve(&config);
        self.registry.pending_mut().begin(PendingToken::Rendering);

        let spec = LayerSpec {
            id: id.to_string(),
            kind: config.kind,
            source: id.source_id(),
            paint: style.paint,
            layout: style.layout,
        };

        let Some(engine) = self.engine.as_mut() else {
            self.registry.pending_mut().finish_layer(id.as_str());
            return;
        };
        if let Err(e) = engine.add_layer(spec) {
            log::error!("Failed to add layer {}: {}", id, e);
            if let Err(e) = engine.remove_source(&id.source_id()) {
                log::warn!("Failed to remove source of {}: {}", id, e);
            }
            self.registry.pending_mut().finish_layer(id.as_str());
            return;
        }

        self.registry.register(config);
        self.registry.pending_mut().finish_layer(id.as_str());
        log::info!("Added layer {}", id);
    }

    fn start_arc(&mut self, config: LayerConfig, data: FeatureCollection) {
        let id = config.layer_id();
        let mut render = ArcRender::new(config, data).sample(self.options.arc_intervals);
        log::info!("Sampled {} arc(s) for {}", render.lines().len(), id);
        render.mark_scheduled();

        let pending = self.registry.pending_mut();
        pending.begin(PendingToken::Layer(id.clone()));
        pending.begin(PendingToken::Rendering);
        self.arcs.schedule(id.to_string(), render);
    }

    fn attach_arc(&mut self, layer_id: &str, render: ArcRender) {
        let Some(engine) = self.engine.as_mut() else {
            self.registry.pending_mut().finish_layer(layer_id);
            return;
        };

        let scene = match engine.create_scene(layer_id) {
            Ok(scene) => scene,
            Err(e) => {
                log::error!("Failed to create scene for {}: {}", layer_id, e);
                self.drop_failed_arc(layer_id);
                return;
            }
        };

        let (config, layer) = render.attach(scene);
        if let Err(e) = engine.add_custom_layer(layer_id, Box::new(layer)) {
            log::error!("Failed to add arc layer {}: {}", layer_id, e);
            self.drop_failed_arc(layer_id);
            return;
        }

        // A rebuilt layer that is hidden stays hidden
        if self.registry.is_known(layer_id) && !self.registry.is_visible(layer_id) {
            if let Err(e) = engine.set_layout_property(layer_id, "visibility", json!("none")) {
                log::warn!("Failed to hide arc layer {}: {}", layer_id, e);
            }
            self.registry.pending_mut().finish_layer(layer_id);
            return;
        }

        self.registry.register(config);
        self.registry.pending_mut().finish_layer(layer_id);
        log::info!("Attached arc layer {}", layer_id);
    }

    // ------------------------------------------------------------------
    // Visibility and filters
    // ------------------------------------------------------------------

    /// Hides the requested layers without removing them.
    ///
    /// A layer whose creation is still in flight has that creation cancelled.
    pub fn turn_off_layers(&mut self, requests: &[LayerConfig]) {
        for config in requests {
            let id = config.layer_id();
            self.registry.pending_mut().finish_layer(id.as_str());
            self.cancel(id.as_str());

            if let Some(engine) = self.engine.as_mut() {
                if engine.has_layer(id.as_str()) {
                    if !config.kind.is_custom() {
                        if let Err(e) = engine.set_filter(id.as_str(), None) {
                            log::warn!("Failed to clear filter on {}: {}", id, e);
                        }
                    }
                    if let Err(e) =
                        engine.set_layout_property(id.as_str(), "visibility", json!("none"))
                    {
                        log::warn!("Failed to hide layer {}: {}", id, e);
                    }
                }
            }

            self.registry.set_visible(id.as_str(), false);
        }
        self.remove_popup();
    }

    /// Shows only features whose `property` equals `value`.
    pub fn add_layer_filter(&mut self, layer_id: &str, property: &str, value: Value) {
        let Some(config) = self.registry.config_for(layer_id).cloned() else {
            log::debug!("Ignoring filter for unknown layer {}", layer_id);
            return;
        };
        let filter = Filter::equals(property, value);

        if config.kind == LayerKind::Arc {
            self.rebuild_arc(&config, Some(&filter));
            return;
        }

        if let Some(engine) = self.engine.as_mut() {
            if let Err(e) = engine.set_filter(layer_id, Some(filter)) {
                log::warn!("Failed to filter layer {}: {}", layer_id, e);
            }
        }
    }

    /// Removes any filter from a layer.
    pub fn clear_layer_filter(&mut self, layer_id: &str) {
        let Some(config) = self.registry.config_for(layer_id).cloned() else {
            log::debug!("Ignoring filter reset for unknown layer {}", layer_id);
            return;
        };

        if config.kind == LayerKind::Arc {
            self.rebuild_arc(&config, None);
            return;
        }

        if let Some(engine) = self.engine.as_mut() {
            if let Err(e) = engine.set_filter(layer_id, None) {
                log::warn!("Failed to clear filter on {}: {}", layer_id, e);
            }
        }
    }

    /// Removes an arc layer and rebuilds it from its unfiltered source data.
    fn rebuild_arc(&mut self, config: &LayerConfig, filter: Option<&Filter>) {
        let id = config.layer_id();
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        if engine.has_layer(id.as_str()) {
            if let Err(e) = engine.remove_layer(id.as_str()) {
                log::warn!("Failed to remove arc layer {}: {}", id, e);
            }
        }

        let Some(source) = engine.get_source(&id.source_id()) else {
            log::warn!("No source data for arc layer {}", id);
            return;
        };
        let data = match filter {
            Some(filter) => filter.apply(source),
            None => source.clone(),
        };

        self.start_arc(config.clone(), data);
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    fn cancel(&mut self, id: &str) {
        let fetch = self.tickets.remove(id).is_some();
        let attach = self.arcs.cancel(id);
        if fetch || attach {
            log::info!("Cancelled pending creation of {}", id);
        }
        // A known arc keeps its source so it can be rebuilt when shown again
        if attach && !self.registry.is_known(id) {
            self.remove_arc_source(id);
        }
    }

    /// Forgets an arc layer whose attachment failed, along with its source.
    fn drop_failed_arc(&mut self, id: &str) {
        if self.registry.unregister(id).is_none() {
            self.registry.pending_mut().finish_layer(id);
        }
        self.remove_arc_source(id);
    }

    fn remove_arc_source(&mut self, id: &str) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let source = LayerId::from(id).source_id();
        if engine.get_source(&source).is_some() {
            if let Err(e) = engine.remove_source(&source) {
                log::warn!("Failed to remove source of {}: {}", id, e);
            }
        }
    }

    /// Removes every layer and its source, keeping the map itself.
    pub fn clear_only_layers(&mut self) {
        self.tickets
            .retain(|_, (_, purpose)| *purpose == FetchPurpose::Base);
        let unattached: Vec<String> = self
            .arcs
            .layer_ids()
            .filter(|id| !self.registry.is_known(id))
            .map(str::to_string)
            .collect();
        self.arcs.cancel_all();
        for id in &unattached {
            self.remove_arc_source(id);
        }

        if let Some(engine) = self.engine.as_mut() {
            for id in self.registry.existing() {
                if engine.has_layer(id.as_str()) {
                    if let Err(e) = engine.remove_layer(id.as_str()) {
                        log::warn!("Failed to remove layer {}: {}", id, e);
                    }
                }
                if let Err(e) = engine.remove_source(&id.source_id()) {
                    log::warn!("Failed to remove source of {}: {}", id, e);
                }
            }
        }

        log::info!("Cleared {} layer(s)", self.registry.existing().len());
        self.registry.clear_layers();
        self.registry.pending_mut().clear_layer_tokens();
        self.remove_popup();
    }

    /// Resets all state and drops the rendering engine.
    pub fn clear_entire_map(&mut self) {
        self.tickets.clear();
        self.fetches.clear();
        self.arcs.cancel_all();
        self.registry.clear();
        self.remove_popup();
        self.engine = None;
        log::info!("Map torn down");
    }

    // ------------------------------------------------------------------
    // Engine events
    // ------------------------------------------------------------------

    /// Adds base reference layers and symbol images once the style is loaded.
    pub fn on_style_load(&mut self) {
        for config in self.options.base_layers.clone() {
            let target = config.index.clone();
            if self.tickets.contains_key(&target) {
                continue;
            }
            self.request_data(target, config, FetchPurpose::Base);
        }
        self.load_symbol_images();
    }

    fn load_symbol_images(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        for image in &self.options.symbol_images {
            if let Err(e) = engine.load_image(&image.name, &image.url) {
                log::error!("{}", e);
            }
        }
    }

    fn add_base_layer(&mut self, config: LayerConfig, data: FeatureCollection) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let id = config.index.clone();
        if engine.has_layer(&id) {
            return;
        }

        if engine.get_source(&id).is_none() {
            if let Err(e) = engine.add_source(&id, data) {
                log::error!("Failed to add base source {}: {}", id, e);
                return;
            }
        }

        let style = self.styles.resolve(&config);
        let spec = LayerSpec {
            id: id.clone(),
            kind: config.kind,
            source: id.clone(),
            paint: style.paint,
            layout: style.layout,
        };
        match engine.add_layer(spec) {
            Ok(()) => log::info!("Added base layer {}", id),
            Err(e) => log::error!("Failed to add base layer {}: {}", id, e),
        }
    }

    /// Clears generic rendering tokens once the engine is idle.
    pub fn on_idle(&mut self) {
        self.registry.pending_mut().clear_rendering();
    }

    /// Opens a popup for the features under a click, replacing any open one.
    pub fn on_click(&mut self, event: ClickEvent) -> Option<&Popup> {
        self.remove_popup();

        let engine = self.engine.as_ref()?;
        let layers: Vec<String> = self
            .registry
            .visible()
            .iter()
            .map(|id| id.to_string())
            .collect();
        if layers.is_empty() {
            return None;
        }

        let results = engine.query_rendered_features(event.point, &layers);
        let entries = aggregate(results, &self.registry, self.options.popup_max_layers);
        if entries.is_empty() {
            return None;
        }

        self.popup = Some(Popup {
            lng_lat: event.lng_lat,
            entries,
        });
        self.popup.as_ref()
    }

    pub fn remove_popup(&mut self) {
        self.popup = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample, MemorySource};
    use crate::engine::{
        CanvasEngine, CustomLayer, EngineError, LineMesh, LineOptions, RenderedFeature, Scene3d,
    };
    use eframe::egui::Pos2;
    use geo_types::Coord;
    use geojson::{Feature, Geometry, JsonObject};
    use std::cell::RefCell;
    use std::rc::Rc;
    use web_time::Duration;

    type Scenes = Rc<RefCell<HashMap<String, Vec<LineMesh>>>>;

    struct MockScene {
        layer: String,
        scenes: Scenes,
    }

    impl Scene3d for MockScene {
        fn line(&mut self, options: LineOptions) -> LineMesh {
            LineMesh::from_options(options)
        }

        fn add(&mut self, mesh: LineMesh) {
            self.scenes
                .borrow_mut()
                .entry(self.layer.clone())
                .or_default()
                .push(mesh);
        }

        fn update(&mut self) {}
    }

    #[derive(Default)]
    struct MockEngine {
        sources: HashMap<String, FeatureCollection>,
        layers: Vec<String>,
        specs: HashMap<String, LayerSpec>,
        custom: HashMap<String, Box<dyn CustomLayer>>,
        layout: HashMap<(String, String), Value>,
        filters: HashMap<String, Option<Filter>>,
        scenes: Scenes,
        images: Vec<String>,
        query_results: Vec<RenderedFeature>,
        not_ready: bool,
    }

    impl RenderingEngine for MockEngine {
        fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), EngineError> {
            if self.sources.contains_key(id) {
                return Err(EngineError::Duplicate(id.to_string()));
            }
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
            self.layers.push(spec.id.clone());
            self.specs.insert(spec.id.clone(), spec);
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
            self.layers.push(id.to_string());
            self.custom.insert(id.to_string(), layer);
            Ok(())
        }

        fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
            if !self.has_layer(id) {
                return Err(EngineError::UnknownLayer(id.to_string()));
            }
            self.layers.retain(|l| l != id);
            self.specs.remove(id);
            self.custom.remove(id);
            self.scenes.borrow_mut().remove(id);
            Ok(())
        }

        fn has_layer(&self, id: &str) -> bool {
            self.layers.iter().any(|l| l == id)
        }

        fn set_layout_property(
            &mut self,
            id: &str,
            key: &str,
            value: Value,
        ) -> Result<(), EngineError> {
            if !self.has_layer(id) {
                return Err(EngineError::UnknownLayer(id.to_string()));
            }
            self.layout.insert((id.to_string(), key.to_string()), value);
            Ok(())
        }

        fn set_filter(&mut self, id: &str, filter: Option<Filter>) -> Result<(), EngineError> {
            if !self.has_layer(id) {
                return Err(EngineError::UnknownLayer(id.to_string()));
            }
            self.filters.insert(id.to_string(), filter);
            Ok(())
        }

        fn query_rendered_features(
            &self,
            _point: Pos2,
            layers: &[String],
        ) -> Vec<RenderedFeature> {
            self.query_results
                .iter()
                .filter(|r| layers.contains(&r.layer_id))
                .cloned()
                .collect()
        }

        fn graphics_ready(&self) -> bool {
            !self.not_ready
        }

        fn create_scene(&mut self, layer_id: &str) -> Result<Box<dyn Scene3d>, EngineError> {
            if self.not_ready {
                return Err(EngineError::ContextUnavailable);
            }
            self.scenes
                .borrow_mut()
                .insert(layer_id.to_string(), Vec::new());
            Ok(Box::new(MockScene {
                layer: layer_id.to_string(),
                scenes: self.scenes.clone(),
            }))
        }

        fn load_image(&mut self, name: &str, url: &str) -> Result<(), EngineError> {
            if url.contains("missing") {
                return Err(EngineError::ImageLoad {
                    name: name.to_string(),
                    reason: "not found".to_string(),
                });
            }
            self.images.push(name.to_string());
            Ok(())
        }
    }

    fn manager() -> LayerManager<MockEngine, MemorySource> {
        manager_with(ManagerOptions::default())
    }

    fn manager_with(options: ManagerOptions) -> LayerManager<MockEngine, MemorySource> {
        let mut manager = LayerManager::new(sample::sample_source(), options);
        manager.attach_engine(MockEngine::default());
        manager
    }

    fn quakes() -> LayerConfig {
        LayerConfig::new("earthquake", LayerKind::Circle)
    }

    fn flows() -> LayerConfig {
        LayerConfig::new("commute_flow", LayerKind::Arc)
    }

    fn engine(manager: &LayerManager<MockEngine, MemorySource>) -> &MockEngine {
        manager.engine().unwrap()
    }

    /// Polls far enough past the grace period for a ready engine to attach.
    fn settle(manager: &mut LayerManager<MockEngine, MemorySource>) {
        let start = Instant::now();
        manager.poll(start);
        manager.poll(start + Duration::from_secs(5));
    }

    #[test]
    fn test_add_layer_is_idempotent() {
        let mut manager = manager();
        manager.add_layers([quakes()]);
        manager.add_layers([quakes()]);
        settle(&mut manager);
        manager.add_layers([quakes()]);
        settle(&mut manager);

        assert_eq!(manager.data_source().fetch_count(), 1);
        assert_eq!(manager.registry().existing().len(), 1);
        assert_eq!(manager.registry().visible().len(), 1);
        assert_eq!(engine(&manager).layers, vec!["earthquake-circle".to_string()]);
        manager.registry().check_invariants();
    }

    #[test]
    fn test_standard_layer_source_and_style() {
        let mut manager = manager();
        let paint = json!({ "circle-color": "#ff0000" }).as_object().cloned().unwrap();
        manager.add_layers([quakes().with_size("big").with_paint(paint)]);
        assert!(manager.registry().pending().is_pending("earthquake-circle"));

        settle(&mut manager);
        assert!(!manager.registry().pending().is_pending("earthquake-circle"));

        let spec = &engine(&manager).specs["earthquake-circle"];
        assert_eq!(spec.source, "earthquake-circle-source");
        assert_eq!(spec.paint["circle-color"], json!("#ff0000"));
        assert_eq!(spec.paint["circle-radius"], json!(6.0));
        assert!(engine(&manager)
            .sources
            .contains_key("earthquake-circle-source"));
    }

    #[test]
    fn test_turn_off_keeps_layer_state() {
        let mut manager = manager();
        manager.add_layers([quakes()]);
        settle(&mut manager);

        manager.turn_off_layers(&[quakes()]);
        assert!(manager.registry().visible().is_empty());
        assert_eq!(manager.registry().existing().len(), 1);
        assert!(manager.registry().config_for("earthquake-circle").is_some());
        let key = ("earthquake-circle".to_string(), "visibility".to_string());
        assert_eq!(engine(&manager).layout[&key], json!("none"));
        assert_eq!(engine(&manager).filters["earthquake-circle"], None);
        manager.registry().check_invariants();

        manager.add_layers([quakes()]);
        assert_eq!(manager.data_source().fetch_count(), 1);
        assert!(manager.registry().is_visible("earthquake-circle"));
        assert_eq!(engine(&manager).layout[&key], json!("visible"));
        assert!(manager.is_loading());

        manager.on_idle();
        assert!(!manager.is_loading());
    }

    #[test]
    fn test_fetch_failure_clears_pending() {
        let mut manager = manager();
        manager.add_layers([LayerConfig::new("does_not_exist", LayerKind::Line)]);
        assert!(manager.is_loading());

        settle(&mut manager);
        assert!(!manager.registry().is_known("does_not_exist-line"));
        assert!(!manager.is_loading());
        assert!(engine(&manager).layers.is_empty());
    }

    #[test]
    fn test_turn_off_cancels_in_flight_creation() {
        let mut manager = manager();
        manager.add_layers([quakes()]);
        manager.turn_off_layers(&[quakes()]);
        settle(&mut manager);

        assert!(!manager.registry().is_known("earthquake-circle"));
        assert!(engine(&manager).layers.is_empty());
        assert!(!manager.is_loading());

        manager.add_layers([quakes()]);
        settle(&mut manager);
        assert_eq!(manager.data_source().fetch_count(), 2);
        assert!(manager.registry().is_visible("earthquake-circle"));
    }

    #[test]
    fn test_arc_layer_waits_for_graphics_context() {
        let mut manager = manager();
        manager.engine_mut().unwrap().not_ready = true;
        manager.add_layers([flows()]);

        let start = Instant::now();
        manager.poll(start);
        manager.poll(start + Duration::from_millis(600));
        assert!(manager.registry().pending().is_pending("commute_flow-arc"));
        assert!(!manager.registry().is_known("commute_flow-arc"));

        manager.engine_mut().unwrap().not_ready = false;
        manager.poll(start + Duration::from_millis(900));
        assert!(manager.registry().is_visible("commute_flow-arc"));
        assert!(!manager.registry().pending().is_pending("commute_flow-arc"));

        let scenes = engine(&manager).scenes.borrow();
        let meshes = &scenes["commute_flow-arc"];
        assert_eq!(meshes.len(), 12);
        assert!(meshes.iter().all(|m| m.geometry.len() == 21));
        assert!(meshes.iter().all(|m| m.width == 2.0 && m.opacity == 0.5));
    }

    #[test]
    fn test_arc_attach_times_out() {
        let mut manager = manager();
        manager.engine_mut().unwrap().not_ready = true;
        manager.add_layers([flows()]);

        let mut now = Instant::now();
        for _ in 0..100 {
            manager.poll(now);
            now += Duration::from_millis(300);
        }

        assert!(!manager.has_work());
        assert!(!manager.registry().pending().is_pending("commute_flow-arc"));
        assert!(!manager.registry().is_known("commute_flow-arc"));
        assert!(engine(&manager).sources.is_empty());

        manager.engine_mut().unwrap().not_ready = false;
        manager.add_layers([flows()]);
        settle(&mut manager);
        assert_eq!(manager.data_source().fetch_count(), 2);
        assert!(manager.registry().is_visible("commute_flow-arc"));
    }

    #[test]
    fn test_turn_off_during_arc_attach_allows_readd() {
        let mut manager = manager();
        manager.add_layers([flows()]);
        manager.poll(Instant::now());
        assert!(engine(&manager)
            .sources
            .contains_key("commute_flow-arc-source"));

        manager.turn_off_layers(&[flows()]);
        assert!(!manager.has_work());
        assert!(engine(&manager).sources.is_empty());

        manager.add_layers([flows()]);
        settle(&mut manager);
        assert_eq!(manager.data_source().fetch_count(), 2);
        assert!(manager.registry().is_visible("commute_flow-arc"));
        assert_eq!(engine(&manager).scenes.borrow()["commute_flow-arc"].len(), 12);
        manager.registry().check_invariants();
    }

    #[test]
    fn test_clear_during_arc_attach_leaves_no_residue() {
        let mut manager = manager();
        manager.add_layers([quakes(), flows()]);
        manager.poll(Instant::now());
        assert_eq!(manager.registry().existing().len(), 1);

        manager.clear_only_layers();
        assert!(engine(&manager).layers.is_empty());
        assert!(engine(&manager).sources.is_empty());
        assert!(!manager.has_work());

        manager.add_layers([flows()]);
        settle(&mut manager);
        assert_eq!(manager.registry().existing(), &[flows().layer_id()]);
        assert_eq!(engine(&manager).scenes.borrow()["commute_flow-arc"].len(), 12);
    }

    #[test]
    fn test_failed_arc_rebuild_drops_layer() {
        let mut manager = manager();
        manager.add_layers([flows()]);
        settle(&mut manager);

        manager.engine_mut().unwrap().not_ready = true;
        manager.add_layer_filter("commute_flow-arc", "mode", json!("metro"));
        let mut now = Instant::now();
        for _ in 0..100 {
            manager.poll(now);
            now += Duration::from_millis(300);
        }

        assert!(!manager.registry().is_known("commute_flow-arc"));
        assert!(!manager.registry().pending().is_pending("commute_flow-arc"));
        assert!(engine(&manager).sources.is_empty());
        manager.registry().check_invariants();

        manager.engine_mut().unwrap().not_ready = false;
        manager.add_layers([flows()]);
        settle(&mut manager);
        assert_eq!(manager.data_source().fetch_count(), 2);
        assert!(manager.registry().is_visible("commute_flow-arc"));
    }

    #[test]
    fn test_reshow_keeps_pending_arc_filter() {
        let mut manager = manager();
        manager.add_layers([flows()]);
        settle(&mut manager);

        manager.add_layer_filter("commute_flow-arc", "mode", json!("metro"));
        manager.add_layers([flows()]);
        settle(&mut manager);

        assert_eq!(manager.data_source().fetch_count(), 1);
        assert_eq!(engine(&manager).scenes.borrow()["commute_flow-arc"].len(), 6);
        assert!(manager.registry().is_visible("commute_flow-arc"));
    }

    #[test]
    fn test_arc_filter_round_trip() {
        let mut manager = manager();
        manager.add_layers([flows()]);
        settle(&mut manager);
        let original = engine(&manager).scenes.borrow()["commute_flow-arc"].clone();
        assert_eq!(original.len(), 12);

        manager.add_layer_filter("commute_flow-arc", "mode", json!("metro"));
        assert!(!engine(&manager).has_layer("commute_flow-arc"));
        assert!(manager.registry().pending().is_pending("commute_flow-arc"));
        assert!(manager.registry().is_known("commute_flow-arc"));

        settle(&mut manager);
        let filtered = engine(&manager).scenes.borrow()["commute_flow-arc"].clone();
        assert_eq!(filtered.len(), 6);

        manager.clear_layer_filter("commute_flow-arc");
        settle(&mut manager);
        let restored = engine(&manager).scenes.borrow()["commute_flow-arc"].clone();
        assert_eq!(restored, original);
        assert_eq!(manager.registry().existing().len(), 1);
        manager.registry().check_invariants();
    }

    #[test]
    fn test_style_layer_filter() {
        let mut manager = manager();
        manager.add_layers([quakes()]);
        settle(&mut manager);

        manager.add_layer_filter("earthquake-circle", "depth", json!("shallow"));
        assert_eq!(
            engine(&manager).filters["earthquake-circle"],
            Some(Filter::equals("depth", "shallow"))
        );

        manager.clear_layer_filter("earthquake-circle");
        assert_eq!(engine(&manager).filters["earthquake-circle"], None);

        manager.add_layer_filter("unknown-circle", "depth", json!("deep"));
        assert!(!engine(&manager).filters.contains_key("unknown-circle"));
    }

    #[test]
    fn test_clear_only_layers_leaves_no_residue() {
        let mut manager = manager();
        manager.add_layers([quakes(), LayerConfig::new("district", LayerKind::Fill), flows()]);
        settle(&mut manager);
        assert_eq!(manager.registry().existing().len(), 3);

        manager.clear_only_layers();
        assert!(manager.registry().existing().is_empty());
        assert!(engine(&manager).layers.is_empty());
        assert!(engine(&manager).sources.is_empty());

        let stations = LayerConfig::new("bike_station", LayerKind::Symbol).with_icon("bike_green");
        manager.add_layers([stations.clone()]);
        settle(&mut manager);
        assert_eq!(manager.registry().existing(), &[stations.layer_id()]);
        manager.registry().check_invariants();
    }

    #[test]
    fn test_clear_entire_map_drops_engine() {
        let mut manager = manager();
        manager.add_layers([quakes(), flows()]);
        manager.clear_entire_map();

        assert!(manager.engine().is_none());
        assert!(!manager.is_loading());
        assert!(!manager.has_work());

        manager.add_layers([quakes()]);
        settle(&mut manager);
        assert!(manager.registry().existing().is_empty());
        assert!(!manager.is_loading());
    }

    fn hit(layer: &str) -> RenderedFeature {
        let mut props = JsonObject::new();
        props.insert("layer".to_string(), json!(layer));
        RenderedFeature {
            layer_id: layer.to_string(),
            feature: Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::Point(vec![121.5, 25.0]))),
                id: None,
                properties: Some(props),
                foreign_members: None,
            },
        }
    }

    #[test]
    fn test_click_aggregates_popup() {
        let mut manager = manager();
        let configs: Vec<LayerConfig> = ["earthquake", "district", "bike_station"]
            .iter()
            .map(|index| LayerConfig::new(*index, LayerKind::Circle))
            .chain([LayerConfig::new("earthquake", LayerKind::Symbol)])
            .collect();
        manager.add_layers(configs.clone());
        settle(&mut manager);

        manager.engine_mut().unwrap().query_results = vec![
            hit("earthquake-symbol"),
            hit("earthquake-symbol"),
            hit("district-circle"),
            hit("bike_station-circle"),
            hit("earthquake-circle"),
            hit("unrelated-fill"),
        ];

        let event = ClickEvent {
            point: Pos2::new(10.0, 10.0),
            lng_lat: Coord { x: 121.5, y: 25.0 },
        };
        let popup = manager.on_click(event).unwrap();
        let ids: Vec<&str> = popup.entries.iter().map(|e| e.layer_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["earthquake-symbol", "district-circle", "bike_station-circle"]
        );
        assert_eq!(popup.lng_lat, Coord { x: 121.5, y: 25.0 });

        manager.turn_off_layers(&configs[1..2]);
        assert!(manager.popup().is_none());

        let popup = manager.on_click(event).unwrap();
        assert!(popup
            .entries
            .iter()
            .all(|e| e.layer_id.as_str() != "district-circle"));
    }

    #[test]
    fn test_click_without_hits_shows_nothing() {
        let mut manager = manager();
        manager.add_layers([quakes()]);
        settle(&mut manager);

        let event = ClickEvent {
            point: Pos2::new(0.0, 0.0),
            lng_lat: Coord { x: 0.0, y: 0.0 },
        };
        assert!(manager.on_click(event).is_none());
        assert!(manager.popup().is_none());
    }

    #[test]
    fn test_style_load_adds_base_layers_and_images() {
        let options = ManagerOptions {
            base_layers: vec![LayerConfig::new("district", LayerKind::Line)],
            symbol_images: vec![
                SymbolImage {
                    name: "metro".to_string(),
                    url: "images/metro.png".to_string(),
                },
                SymbolImage {
                    name: "bike_red".to_string(),
                    url: "images/missing.png".to_string(),
                },
            ],
            ..Default::default()
        };
        let mut manager = manager_with(options);
        manager.on_style_load();
        settle(&mut manager);

        assert!(engine(&manager).has_layer("district"));
        assert_eq!(engine(&manager).images, vec!["metro".to_string()]);
        assert!(!manager.registry().is_known("district"));

        manager.add_layers([quakes()]);
        settle(&mut manager);
        manager.clear_only_layers();
        assert!(engine(&manager).has_layer("district"));
        assert_eq!(engine(&manager).layers.len(), 1);
    }

    #[test]
    fn test_canvas_engine_skips_unusable_images() {
        let options = ManagerOptions {
            symbol_images: vec![
                SymbolImage {
                    name: "metro".to_string(),
                    url: "images/map/metro.png".to_string(),
                },
                SymbolImage {
                    name: "bike_red".to_string(),
                    url: "images/map/bike_red.txt".to_string(),
                },
                SymbolImage {
                    name: "bike_green".to_string(),
                    url: "images/map/bike_green.png".to_string(),
                },
            ],
            ..Default::default()
        };
        let mut manager = LayerManager::new(MemorySource::new(), options);
        manager.attach_engine(CanvasEngine::default());
        manager.on_style_load();

        let engine = manager.engine().unwrap();
        assert!(engine.has_image("metro"));
        assert!(!engine.has_image("bike_red"));
        assert!(engine.has_image("bike_green"));
    }
}

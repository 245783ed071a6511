//! Authoritative bookkeeping of the layers on a map.
//!
//! The registry tracks which layers exist on the rendering surface, which of
//! them are currently shown, the config each one was created from, and which
//! operations are still in flight. Only the layer manager writes to it.

use super::config::{LayerConfig, LayerId};
use std::collections::HashMap;
use std::fmt;

/// Marker for an operation that has not settled yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PendingToken {
    /// Data for this layer is being fetched or its custom layer is not attached yet
    Layer(LayerId),
    /// Generic rendering work, cleared when the engine goes idle
    Rendering,
}

impl fmt::Display for PendingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingToken::Layer(id) => write!(f, "{}", id),
            PendingToken::Rendering => write!(f, "rendering"),
        }
    }
}

/// Tokens for in-flight work, observable by the UI as a loading signal.
///
/// Layer tokens behave like a set; `Rendering` tokens accumulate until the
/// engine reports idle.
#[derive(Debug, Clone, Default)]
pub struct PendingLoads {
    tokens: Vec<PendingToken>,
}

impl PendingLoads {
    pub fn begin(&mut self, token: PendingToken) {
        if let PendingToken::Layer(_) = &token {
            if self.tokens.contains(&token) {
                return;
            }
        }
        self.tokens.push(token);
    }

    pub fn finish_layer(&mut self, id: &str) {
        self.tokens
            .retain(|t| !matches!(t, PendingToken::Layer(layer) if layer.as_str() == id));
    }

    pub fn clear_rendering(&mut self) {
        self.tokens.retain(|t| *t != PendingToken::Rendering);
    }

    /// Drops every layer token, keeping generic rendering tokens.
    pub fn clear_layer_tokens(&mut self) {
        self.tokens.retain(|t| *t == PendingToken::Rendering);
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, PendingToken::Layer(layer) if layer.as_str() == id))
    }

    /// Returns true while any token is outstanding.
    pub fn is_loading(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingToken> {
        self.tokens.iter()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}

/// Registry of existing and visible layers.
///
/// Invariant: every visible layer is also an existing layer, and every
/// existing layer has exactly one config.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    existing: Vec<LayerId>,
    visible: Vec<LayerId>,
    configs: HashMap<LayerId, LayerConfig>,
    pending: PendingLoads,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a materialized layer as existing and visible.
    ///
    /// Registering a known layer only reaffirms its visibility. Returns true
    /// if the layer was newly added.
    pub fn register(&mut self, config: LayerConfig) -> bool {
        let id = config.layer_id();
        if self.is_known(id.as_str()) {
            self.set_visible(id.as_str(), true);
            return false;
        }

        self.existing.push(id.clone());
        self.visible.push(id.clone());
        self.configs.insert(id, config);
        true
    }

    /// Purges a layer from every set, including its pending token.
    pub fn unregister(&mut self, id: &str) -> Option<LayerConfig> {
        self.existing.retain(|l| l.as_str() != id);
        self.visible.retain(|l| l.as_str() != id);
        self.pending.finish_layer(id);
        self.configs.remove(id)
    }

    /// Shows or hides a known layer. Unknown layers are ignored.
    pub fn set_visible(&mut self, id: &str, visible: bool) -> bool {
        let Some(layer) = self.existing.iter().find(|l| l.as_str() == id) else {
            return false;
        };

        let shown = self.is_visible(id);
        if visible && !shown {
            self.visible.push(layer.clone());
        } else if !visible && shown {
            self.visible.retain(|l| l.as_str() != id);
        }
        true
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.configs.contains_key(id)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.iter().any(|l| l.as_str() == id)
    }

    pub fn config_for(&self, id: &str) -> Option<&LayerConfig> {
        self.configs.get(id)
    }

    /// Existing layers in creation order.
    pub fn existing(&self) -> &[LayerId] {
        &self.existing
    }

    /// Visible layers in the order they were shown.
    pub fn visible(&self) -> &[LayerId] {
        &self.visible
    }

    pub fn pending(&self) -> &PendingLoads {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut PendingLoads {
        &mut self.pending
    }

    /// Forgets every layer but keeps the pending tokens.
    pub fn clear_layers(&mut self) {
        self.existing.clear();
        self.visible.clear();
        self.configs.clear();
    }

    /// Resets all registry state.
    pub fn clear(&mut self) {
        self.clear_layers();
        self.pending.clear();
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        for id in &self.visible {
            assert!(
                self.existing.contains(id),
                "visible layer {} is not an existing layer",
                id
            );
        }
        assert_eq!(self.existing.len(), self.configs.len());
        for id in &self.existing {
            assert!(self.configs.contains_key(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerKind;

    fn config(index: &str) -> LayerConfig {
        LayerConfig::new(index, LayerKind::Circle)
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = LayerRegistry::new();
        assert!(registry.register(config("parks")));
        assert!(!registry.register(config("parks")));

        assert_eq!(registry.existing().len(), 1);
        assert_eq!(registry.visible().len(), 1);
        registry.check_invariants();
    }

    #[test]
    fn test_register_known_reaffirms_visibility() {
        let mut registry = LayerRegistry::new();
        registry.register(config("parks"));
        registry.set_visible("parks-circle", false);
        assert!(registry.visible().is_empty());

        registry.register(config("parks"));
        assert!(registry.is_visible("parks-circle"));
        assert_eq!(registry.visible().len(), 1);
    }

    #[test]
    fn test_visibility_keeps_existing_and_configs() {
        let mut registry = LayerRegistry::new();
        registry.register(config("parks"));
        registry.register(config("rivers"));

        registry.set_visible("parks-circle", false);
        registry.set_visible("parks-circle", false);
        assert_eq!(registry.existing().len(), 2);
        assert!(registry.config_for("parks-circle").is_some());
        assert_eq!(registry.visible(), &[LayerId::from("rivers-circle")]);

        registry.set_visible("parks-circle", true);
        registry.set_visible("parks-circle", true);
        assert_eq!(registry.visible().len(), 2);
        registry.check_invariants();
    }

    #[test]
    fn test_set_visible_unknown_is_noop() {
        let mut registry = LayerRegistry::new();
        assert!(!registry.set_visible("ghost-line", true));
        assert!(registry.visible().is_empty());
        registry.check_invariants();
    }

    #[test]
    fn test_unregister_purges_everything() {
        let mut registry = LayerRegistry::new();
        registry.register(config("parks"));
        registry
            .pending_mut()
            .begin(PendingToken::Layer(LayerId::from("parks-circle")));

        let removed = registry.unregister("parks-circle");
        assert!(removed.is_some());
        assert!(!registry.is_known("parks-circle"));
        assert!(registry.visible().is_empty());
        assert!(!registry.pending().is_pending("parks-circle"));
        registry.check_invariants();
    }

    #[test]
    fn test_pending_tokens() {
        let mut pending = PendingLoads::default();
        let id = LayerId::from("parks-circle");
        pending.begin(PendingToken::Layer(id.clone()));
        pending.begin(PendingToken::Layer(id.clone()));
        pending.begin(PendingToken::Rendering);
        pending.begin(PendingToken::Rendering);
        assert_eq!(pending.len(), 3);

        pending.clear_rendering();
        assert_eq!(pending.len(), 1);
        assert!(pending.is_pending("parks-circle"));

        pending.finish_layer("parks-circle");
        assert!(!pending.is_loading());
        assert_eq!(PendingToken::Rendering.to_string(), "rendering");
    }
}

//! Canvas-backed 3D scene.

use super::{LineMesh, LineOptions, Scene3d};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Meshes of every custom layer, keyed by layer id.
pub(crate) type SharedMeshes = Rc<RefCell<HashMap<String, Vec<LineMesh>>>>;

/// Scene of one custom layer on a `CanvasEngine`.
///
/// Added meshes land in the engine's mesh store, from which the map painter
/// draws them every frame.
pub struct CanvasScene {
    layer_id: String,
    meshes: SharedMeshes,
}

impl CanvasScene {
    pub(crate) fn new(layer_id: &str, meshes: SharedMeshes) -> Self {
        Self {
            layer_id: layer_id.to_string(),
            meshes,
        }
    }
}

impl Scene3d for CanvasScene {
    fn line(&mut self, options: LineOptions) -> LineMesh {
        LineMesh::from_options(options)
    }

    fn add(&mut self, mesh: LineMesh) {
        self.meshes
            .borrow_mut()
            .entry(self.layer_id.clone())
            .or_default()
            .push(mesh);
    }

    fn update(&mut self) {
        // Meshes are painted straight from the store, nothing to upload
    }
}

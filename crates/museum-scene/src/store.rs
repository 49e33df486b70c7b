//! SceneStore - the one shared, mutable scene

use crate::binder::apply_to_targets;
use crate::graph::SceneGraph;
use crate::selector::TargetSelector;
use museum_core::AssetHandle;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared owner of the live scene graph.
///
/// Readers (the render loop) only ever get snapshots or read closures.
/// The only write is [`SceneStore::apply_texture`], which performs a whole
/// binding under one write guard, so a reader sees either all of a
/// binding or none of it.
#[derive(Clone, Default)]
pub struct SceneStore {
    inner: Arc<RwLock<SceneGraph>>,
}

impl SceneStore {
    pub fn new(graph: SceneGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// A point-in-time copy. Materials are shared, so this is cheap.
    pub fn snapshot(&self) -> SceneGraph {
        self.read(SceneGraph::clone)
    }

    /// Run `f` against the current scene under a read guard
    pub fn read<R>(&self, f: impl FnOnce(&SceneGraph) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn revision(&self) -> u64 {
        self.read(SceneGraph::revision)
    }

    /// Bind `handle` onto every node `selector` matches; returns the count
    pub fn apply_texture(&self, handle: &AssetHandle, selector: &TargetSelector) -> usize {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        apply_to_targets(&mut guard, handle, selector)
    }
}

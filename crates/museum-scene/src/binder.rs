//! Scene Binder - rebinds target materials to a generated texture

use crate::graph::SceneGraph;
use crate::material::Material;
use crate::selector::TargetSelector;
use museum_core::{AssetHandle, NodeId};
use std::sync::Arc;

/// Ids of every node the selector matches, in traversal order
pub fn matching_targets(graph: &SceneGraph, selector: &TargetSelector) -> Vec<NodeId> {
    let mut ids = Vec::new();
    graph.traverse(|node| {
        if selector.matches(node) {
            ids.push(node.id());
        }
    });
    ids
}

/// Point every matching mesh at a new material built from `handle`.
///
/// Each match gets its own freshly built material, swapped in as a single
/// `Arc` assignment, and has both shadow flags switched on. Returns how
/// many nodes were rebound; zero leaves the graph untouched.
pub fn apply_to_targets(
    graph: &mut SceneGraph,
    handle: &AssetHandle,
    selector: &TargetSelector,
) -> usize {
    let mut rebound = 0;

    for id in graph.traversal_order() {
        let Some(node) = graph.get_mut(id) else {
            continue;
        };
        if !selector.matches(node) {
            continue;
        }

        node.replace_material(Arc::new(Material::realistic(handle)));
        node.cast_shadow = true;
        node.receive_shadow = true;
        rebound += 1;

        tracing::debug!(node = node.name(), asset = %handle.hash(), "rebound material");
    }

    if rebound > 0 {
        graph.bump_revision();
    }
    rebound
}

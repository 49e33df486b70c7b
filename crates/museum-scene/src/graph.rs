//! SceneGraph - named node hierarchy with shared materials

use crate::material::Material;
use museum_core::{MuseumError, NodeId, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a node is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Mesh,
    Light,
}

impl NodeKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "group" => Ok(NodeKind::Group),
            "mesh" => Ok(NodeKind::Mesh),
            "light" => Ok(NodeKind::Light),
            other => Err(MuseumError::SceneError(format!(
                "Unknown node kind '{}'. Use: group, mesh, light",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Mesh => "mesh",
            NodeKind::Light => "light",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the scene graph
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    material: Option<Arc<Material>>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_mesh(&self) -> bool {
        self.kind == NodeKind::Mesh
    }

    /// The node's material (meshes only)
    pub fn material(&self) -> Option<&Arc<Material>> {
        self.material.as_ref()
    }

    /// Swap the whole material reference in one assignment
    pub(crate) fn replace_material(&mut self, material: Arc<Material>) {
        self.material = Some(material);
    }
}

/// The scene graph
///
/// Nodes are addressed by stable `NodeId` and unique name. Children keep
/// insertion order so traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    name: String,
    nodes: HashMap<NodeId, Node>,
    name_map: HashMap<String, NodeId>,
    roots: Vec<NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
    revision: u64,
}

impl SceneGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Incremented every time a binding changes at least one node
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision += 1;
    }

    /// Add a root node without a material
    pub fn spawn(&mut self, name: impl Into<String>, kind: NodeKind) -> Result<NodeId> {
        self.insert(name.into(), kind, None)
    }

    /// Add a root mesh node with the given (possibly shared) material
    pub fn spawn_mesh(&mut self, name: impl Into<String>, material: Arc<Material>) -> Result<NodeId> {
        self.insert(name.into(), NodeKind::Mesh, Some(material))
    }

    fn insert(
        &mut self,
        name: String,
        kind: NodeKind,
        material: Option<Arc<Material>>,
    ) -> Result<NodeId> {
        if self.name_map.contains_key(&name) {
            return Err(MuseumError::DuplicateNodeName(name));
        }

        let id = NodeId::new();
        self.nodes.insert(
            id,
            Node {
                id,
                name: name.clone(),
                kind,
                parent: None,
                material,
                cast_shadow: false,
                receive_shadow: false,
            },
        );
        self.name_map.insert(name, id);
        self.roots.push(id);
        Ok(id)
    }

    /// Set parent relationship, rejecting cycles
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&child) {
            return Err(MuseumError::NodeNotFound(child.to_string()));
        }
        if !self.nodes.contains_key(&parent) {
            return Err(MuseumError::NodeNotFound(parent.to_string()));
        }

        // Walk up from the new parent; meeting the child means a cycle.
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(MuseumError::SceneError(format!(
                    "Parenting {} under {} would create a cycle",
                    self.display_name(child),
                    self.display_name(parent)
                )));
            }
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }

        self.detach(child);
        self.children.entry(parent).or_default().push(child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Set parent by name
    pub fn set_parent_by_name(&mut self, child: &str, parent: &str) -> Result<()> {
        let child_id = self
            .get_id(child)
            .ok_or_else(|| MuseumError::NodeNotFound(child.to_string()))?;
        let parent_id = self
            .get_id(parent)
            .ok_or_else(|| MuseumError::NodeNotFound(parent.to_string()))?;
        self.set_parent(child_id, parent_id)
    }

    fn detach(&mut self, child: NodeId) {
        match self.nodes.get(&child).and_then(|n| n.parent) {
            Some(old) => {
                if let Some(siblings) = self.children.get_mut(&old) {
                    siblings.retain(|c| *c != child);
                }
            }
            None => self.roots.retain(|r| *r != child),
        }
    }

    /// Set both shadow flags on a node
    pub fn set_shadows(&mut self, id: NodeId, cast: bool, receive: bool) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| MuseumError::NodeNotFound(id.to_string()))?;
        node.cast_shadow = cast;
        node.receive_shadow = receive;
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn get_id(&self, name: &str) -> Option<NodeId> {
        self.name_map.get(name).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Node> {
        self.get_id(name).and_then(|id| self.nodes.get(&id))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Every node id, depth first from the roots, each exactly once
    pub fn traversal_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Visit every node depth first
    pub fn traverse(&self, mut visit: impl FnMut(&Node)) {
        for id in self.traversal_order() {
            if let Some(node) = self.nodes.get(&id) {
                visit(node);
            }
        }
    }

    fn display_name(&self, id: NodeId) -> String {
        self.nodes
            .get(&id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

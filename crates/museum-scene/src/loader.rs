//! Scene loading from TOML files

use crate::format::SceneFile;
use crate::graph::{NodeKind, SceneGraph};
use crate::material::Material;
use museum_core::{MuseumError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Load a scene from a TOML file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneGraph> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let graph = load_scene_string(&content)?;
    tracing::info!(
        scene = graph.name(),
        nodes = graph.node_count(),
        path = %path.display(),
        "loaded scene"
    );
    Ok(graph)
}

/// Load a scene from a TOML string
pub fn load_scene_string(content: &str) -> Result<SceneGraph> {
    let scene_file: SceneFile = toml::from_str(content)?;
    let mut graph = SceneGraph::new(scene_file.scene.name.clone());

    // One Arc per named material; every node naming it shares it
    let materials: HashMap<&str, Arc<Material>> = scene_file
        .materials
        .iter()
        .map(|(name, def)| (name.as_str(), Arc::new(Material::from_def(name.clone(), def))))
        .collect();
    let mut fallback: Option<Arc<Material>> = None;

    // First pass: create all nodes
    for (name, def) in &scene_file.nodes {
        let kind = NodeKind::parse(&def.kind)?;
        let id = match kind {
            NodeKind::Mesh => {
                let material = match &def.material {
                    Some(mat_name) => materials.get(mat_name.as_str()).cloned().ok_or_else(|| {
                        MuseumError::SceneError(format!(
                            "Node '{}' references unknown material '{}'",
                            name, mat_name
                        ))
                    })?,
                    None => fallback
                        .get_or_insert_with(|| Arc::new(Material::default()))
                        .clone(),
                };
                graph.spawn_mesh(name.clone(), material)?
            }
            _ => {
                if def.material.is_some() {
                    tracing::warn!(node = %name, kind = %kind, "material ignored on non-mesh node");
                }
                graph.spawn(name.clone(), kind)?
            }
        };
        graph.set_shadows(id, def.cast_shadow, def.receive_shadow)?;
    }

    // Second pass: relationships
    for (name, def) in &scene_file.nodes {
        if let Some(parent_name) = &def.parent {
            graph.set_parent_by_name(name, parent_name)?;
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GALLERY: &str = r#"
[scene]
name = "Virtual Art Museum"

[materials.museum]
map = "textures/Art room01_Art_Room1_BaseColor.png"
emissive_intensity = 0.5

[nodes.museum]
kind = "group"

[nodes.FrameA]
parent = "museum"
material = "museum"
cast_shadow = true
receive_shadow = true

[nodes.FrameB]
parent = "museum"
material = "museum"

[nodes.Floor]
parent = "museum"

[nodes.sun]
kind = "light"
cast_shadow = true
"#;

    #[test]
    fn test_load_gallery() {
        let graph = load_scene_string(GALLERY).unwrap();
        assert_eq!(graph.name(), "Virtual Art Museum");
        assert_eq!(graph.node_count(), 5);

        let museum = graph.get_id("museum").unwrap();
        assert_eq!(graph.children(museum).len(), 3);

        let a = graph.get_by_name("FrameA").unwrap();
        let b = graph.get_by_name("FrameB").unwrap();
        assert!(Arc::ptr_eq(a.material().unwrap(), b.material().unwrap()));
        assert!(a.cast_shadow && a.receive_shadow);
        assert!(!b.cast_shadow);

        let floor = graph.get_by_name("Floor").unwrap();
        assert_eq!(floor.material().unwrap().name, "default");
    }

    #[test]
    fn test_unknown_material_is_an_error() {
        let toml_str = r#"
[scene]
name = "bad"

[nodes.FrameA]
material = "missing"
"#;
        assert!(matches!(
            load_scene_string(toml_str),
            Err(MuseumError::SceneError(_))
        ));
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let toml_str = r#"
[scene]
name = "bad"

[nodes.cam]
kind = "camera"
"#;
        assert!(load_scene_string(toml_str).is_err());
    }

    #[test]
    fn test_missing_parent_is_an_error() {
        let toml_str = r#"
[scene]
name = "bad"

[nodes.FrameA]
parent = "ghost"
"#;
        assert!(matches!(
            load_scene_string(toml_str),
            Err(MuseumError::NodeNotFound(_))
        ));
    }
}

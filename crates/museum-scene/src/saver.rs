//! Scene saving to TOML files

use crate::format::{MaterialDef, NodeDef, SceneFile};
use crate::graph::SceneGraph;
use museum_core::Result;
use std::collections::BTreeMap;

/// Save a graph to a TOML string
pub fn save_scene_string(graph: &SceneGraph) -> Result<String> {
    let scene_file = graph_to_scene_file(graph);
    Ok(toml::to_string_pretty(&scene_file)?)
}

/// Convert a SceneGraph to a SceneFile
///
/// Materials with equal parameters under the same name collapse into one
/// entry. A different material reusing a taken name is written as
/// `<name>-2`, `<name>-3`, ...
pub fn graph_to_scene_file(graph: &SceneGraph) -> SceneFile {
    let mut scene = SceneFile::new(graph.name());

    graph.traverse(|node| {
        let mut def = NodeDef::new(node.kind().as_str());
        def.parent = node
            .parent()
            .and_then(|p| graph.get(p))
            .map(|p| p.name().to_string());
        def.cast_shadow = node.cast_shadow;
        def.receive_shadow = node.receive_shadow;

        if let Some(material) = node.material() {
            let material_def = material.to_def();
            let name = material_slot(&scene.materials, &material.name, &material_def);
            scene.materials.entry(name.clone()).or_insert(material_def);
            def.material = Some(name);
        }

        scene.add_node(node.name(), def);
    });

    scene
}

/// First name from `base` that is free or already holds `def`
fn material_slot(materials: &BTreeMap<String, MaterialDef>, base: &str, def: &MaterialDef) -> String {
    let mut candidate = base.to_string();
    let mut n = 1;
    while let Some(existing) = materials.get(&candidate) {
        if existing == def {
            break;
        }
        n += 1;
        candidate = format!("{}-{}", base, n);
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::apply_to_targets;
    use crate::loader::load_scene_string;
    use crate::material::Material;
    use crate::selector::TargetSelector;
    use museum_core::{AssetHandle, ContentHash};

    const ROOM: &str = r#"
[scene]
name = "Roundtrip"

[materials.wall]
roughness = 0.9

[nodes.room]
kind = "group"

[nodes.FrameA]
parent = "room"
material = "wall"

[nodes.FrameB]
parent = "room"
material = "wall"

[nodes.Sidebar]
parent = "room"
material = "wall"
"#;

    #[test]
    fn test_roundtrip() {
        let graph = load_scene_string(ROOM).unwrap();
        let saved = save_scene_string(&graph).unwrap();
        let reloaded = load_scene_string(&saved).unwrap();

        assert_eq!(reloaded.name(), "Roundtrip");
        assert_eq!(reloaded.node_count(), 4);
        let room = reloaded.get_id("room").unwrap();
        assert_eq!(reloaded.children(room).len(), 3);
        assert_eq!(
            reloaded.get_by_name("Sidebar").unwrap().material().unwrap().roughness,
            0.9
        );
    }

    #[test]
    fn test_generated_material_written_once() {
        let mut graph = load_scene_string(ROOM).unwrap();
        let path = std::env::temp_dir().join(format!("museum_saver_{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"png").unwrap();
        let handle = AssetHandle::new(&path, ContentHash::from_bytes(b"png"), (1, 1), 3, "output/out1.png");

        apply_to_targets(&mut graph, &handle, &TargetSelector::default());
        let file = graph_to_scene_file(&graph);

        assert_eq!(file.materials.len(), 2);
        let generated = file.nodes["FrameA"].material.clone().unwrap();
        assert_eq!(file.nodes["FrameB"].material.as_deref(), Some(generated.as_str()));
        assert_eq!(file.nodes["Sidebar"].material.as_deref(), Some("wall"));
        assert_eq!(
            file.materials[&generated].map.as_deref(),
            Some(path.to_str().unwrap())
        );
        assert!(file.nodes["FrameA"].cast_shadow);
    }

    #[test]
    fn test_user_default_material_survives_fallback() {
        let graph = load_scene_string(
            r#"
[scene]
name = "Clash"

[materials.default]
roughness = 0.2

[nodes.Plinth]
material = "default"

[nodes.Pedestal]
"#,
        )
        .unwrap();

        let saved = save_scene_string(&graph).unwrap();
        let reloaded = load_scene_string(&saved).unwrap();
        let roughness = |name: &str| reloaded.get_by_name(name).unwrap().material().unwrap().roughness;

        assert_eq!(roughness("Plinth"), 0.2);
        assert_eq!(roughness("Pedestal"), Material::default().roughness);
    }

    #[test]
    fn test_identical_images_from_different_runs_keep_their_paths() {
        let mut graph = load_scene_string(ROOM).unwrap();
        let mut paths = Vec::new();
        let mut handles = Vec::new();
        for _ in 0..2 {
            let path = std::env::temp_dir().join(format!("museum_saver_{}.png", uuid::Uuid::new_v4()));
            std::fs::write(&path, b"png").unwrap();
            handles.push(AssetHandle::new(&path, ContentHash::from_bytes(b"png"), (1, 1), 3, "output/out1.png"));
            paths.push(path.to_str().unwrap().to_string());
        }

        apply_to_targets(&mut graph, &handles[0], &TargetSelector::name_contains("FrameA"));
        apply_to_targets(&mut graph, &handles[1], &TargetSelector::name_contains("FrameB"));
        let file = graph_to_scene_file(&graph);

        assert_eq!(file.materials.len(), 3);
        let map_of = |node: &str| {
            let material = file.nodes[node].material.clone().unwrap();
            file.materials[&material].map.clone().unwrap()
        };
        assert_eq!(map_of("FrameA"), paths[0]);
        assert_eq!(map_of("FrameB"), paths[1]);
    }
}

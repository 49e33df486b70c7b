//! Scene file format definitions

use museum_core::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root structure of a scene TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFile {
    pub scene: SceneMetadata,
    /// Named materials shared by every node that references them
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialDef>,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeDef>,
}

/// Scene metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Definition of a node in a scene file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    /// "group", "mesh" or "light"
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Name of an entry in `[materials]` (meshes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default)]
    pub cast_shadow: bool,
    #[serde(default)]
    pub receive_shadow: bool,
}

fn default_kind() -> String {
    "mesh".to_string()
}

impl NodeDef {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parent: None,
            material: None,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }
}

impl Default for NodeDef {
    fn default() -> Self {
        Self::new(default_kind())
    }
}

/// Standard PBR material parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDef {
    #[serde(default)]
    pub color: Color,
    /// Path of the colour texture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    #[serde(default)]
    pub metalness: f32,
    #[serde(default = "default_emissive")]
    pub emissive: Color,
    #[serde(default)]
    pub emissive_intensity: f32,
}

fn default_roughness() -> f32 {
    1.0
}

fn default_emissive() -> Color {
    Color::BLACK
}

impl Default for MaterialDef {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
            roughness: default_roughness(),
            metalness: 0.0,
            emissive: default_emissive(),
            emissive_intensity: 0.0,
        }
    }
}

impl SceneFile {
    /// Create a new scene file
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scene: SceneMetadata {
                name: name.into(),
                version: default_version(),
                description: None,
            },
            materials: BTreeMap::new(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn add_node(&mut self, name: impl Into<String>, node: NodeDef) {
        self.nodes.insert(name.into(), node);
    }

    pub fn add_material(&mut self, name: impl Into<String>, material: MaterialDef) {
        self.materials.insert(name.into(), material);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_file_serialization() {
        let mut scene = SceneFile::new("Gallery");
        scene.add_material("wall", MaterialDef::default());
        scene.add_node("FrameA", NodeDef::new("mesh").with_material("wall"));

        let toml_str = toml::to_string_pretty(&scene).unwrap();
        assert!(toml_str.contains("Gallery"));
        assert!(toml_str.contains("FrameA"));
        assert!(toml_str.contains("[materials.wall]"));
    }

    #[test]
    fn test_scene_file_deserialization_defaults() {
        let toml_str = r#"
[scene]
name = "Gallery"

[materials.museum]
map = "textures/base_color.png"
emissive_intensity = 0.5

[nodes.museum]
kind = "group"

[nodes.FrameA]
parent = "museum"
material = "museum"
cast_shadow = true
"#;

        let scene: SceneFile = toml::from_str(toml_str).unwrap();
        assert_eq!(scene.scene.version, "1.0");

        let frame = &scene.nodes["FrameA"];
        assert_eq!(frame.kind, "mesh");
        assert!(frame.cast_shadow);
        assert!(!frame.receive_shadow);

        let mat = &scene.materials["museum"];
        assert_eq!(mat.roughness, 1.0);
        assert_eq!(mat.metalness, 0.0);
        assert_eq!(mat.map.as_deref(), Some("textures/base_color.png"));
    }
}

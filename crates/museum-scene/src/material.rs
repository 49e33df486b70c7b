//! Immutable surface materials

use crate::format::MaterialDef;
use museum_core::{AssetHandle, Color};

/// Roughness used for generated artwork: matte canvas, not glossy
pub const ARTWORK_ROUGHNESS: f32 = 0.5;
/// Generated artwork is never metallic
pub const ARTWORK_METALNESS: f32 = 0.0;

/// Source of a colour texture
#[derive(Debug, Clone, PartialEq)]
pub enum TextureRef {
    /// A texture path declared in the scene file
    File(String),
    /// A generated asset held alive by this reference
    Asset(AssetHandle),
}

impl TextureRef {
    /// Path or URI to write back into a scene file
    pub fn location(&self) -> String {
        match self {
            TextureRef::File(path) => path.clone(),
            TextureRef::Asset(handle) => handle.path().display().to_string(),
        }
    }

    pub fn as_asset(&self) -> Option<&AssetHandle> {
        match self {
            TextureRef::Asset(handle) => Some(handle),
            TextureRef::File(_) => None,
        }
    }
}

/// A standard PBR material.
///
/// Materials are shared between nodes through `Arc` and are never mutated
/// in place; rebinding a node swaps its `Arc` for a new material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub color: Color,
    pub map: Option<TextureRef>,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: Color,
    pub emissive_intensity: f32,
}

impl Material {
    /// Material for a generated picture: white base, the asset as colour
    /// map, non-metallic and moderately rough.
    pub fn realistic(handle: &AssetHandle) -> Self {
        Self {
            name: format!("generated-{}", handle.hash().short()),
            color: Color::WHITE,
            map: Some(TextureRef::Asset(handle.clone())),
            roughness: ARTWORK_ROUGHNESS,
            metalness: ARTWORK_METALNESS,
            emissive: Color::BLACK,
            emissive_intensity: 0.0,
        }
    }

    pub fn from_def(name: impl Into<String>, def: &MaterialDef) -> Self {
        Self {
            name: name.into(),
            color: def.color,
            map: def.map.clone().map(TextureRef::File),
            roughness: def.roughness,
            metalness: def.metalness,
            emissive: def.emissive,
            emissive_intensity: def.emissive_intensity,
        }
    }

    pub fn to_def(&self) -> MaterialDef {
        MaterialDef {
            color: self.color,
            map: self.map.as_ref().map(TextureRef::location),
            roughness: self.roughness,
            metalness: self.metalness,
            emissive: self.emissive,
            emissive_intensity: self.emissive_intensity,
        }
    }

    /// The generated asset this material samples, if any
    pub fn asset(&self) -> Option<&AssetHandle> {
        self.map.as_ref().and_then(TextureRef::as_asset)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::from_def("default", &MaterialDef::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use museum_core::ContentHash;

    #[test]
    fn test_def_roundtrip() {
        let def = MaterialDef {
            map: Some("textures/wall.png".into()),
            roughness: 0.8,
            emissive_intensity: 0.5,
            ..Default::default()
        };
        let mat = Material::from_def("wall", &def);
        assert_eq!(mat.name, "wall");
        assert_eq!(mat.map, Some(TextureRef::File("textures/wall.png".into())));
        assert_eq!(mat.to_def(), def);
        assert!(mat.asset().is_none());
    }

    #[test]
    fn test_realistic_material() {
        let path = std::env::temp_dir().join(format!("museum_mat_{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"img").unwrap();
        let handle = AssetHandle::new(&path, ContentHash::from_bytes(b"img"), (2, 2), 3, "output/a.png");

        let mat = Material::realistic(&handle);
        assert_eq!(mat.metalness, 0.0);
        assert_eq!(mat.roughness, 0.5);
        assert!(mat.asset().unwrap().same_asset(&handle));
        assert!(mat.name.starts_with("generated-"));
        assert_eq!(mat.to_def().map.as_deref(), Some(path.to_str().unwrap()));
    }
}

//! Museum Scene - scene graph and texture binding
//!
//! Holds the live scene the renderer draws from, the naming-convention
//! selector used to find picture frames, and the binder that swaps a
//! generated texture onto them. Scenes are loaded from and saved to TOML.

mod binder;
mod format;
mod graph;
mod loader;
mod material;
mod saver;
mod selector;
mod store;

pub use binder::{apply_to_targets, matching_targets};
pub use format::{MaterialDef, NodeDef, SceneFile, SceneMetadata};
pub use graph::{Node, NodeKind, SceneGraph};
pub use loader::{load_scene, load_scene_string};
pub use material::{Material, TextureRef};
pub use saver::{graph_to_scene_file, save_scene_string};
pub use selector::{TargetSelector, DEFAULT_TARGET};
pub use store::SceneStore;

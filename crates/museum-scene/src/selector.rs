//! Naming-convention selection of texture targets

use crate::graph::Node;
use std::fmt;

/// Name fragment that marks a mesh as a picture frame
pub const DEFAULT_TARGET: &str = "Frame";

/// Selects the mesh nodes that receive a generated texture.
///
/// Matching is on names only and is case-sensitive; every mesh whose name
/// contains the fragment is selected regardless of its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    NameContains(String),
}

impl TargetSelector {
    pub fn name_contains(fragment: impl Into<String>) -> Self {
        TargetSelector::NameContains(fragment.into())
    }

    pub fn matches_name(&self, name: &str) -> bool {
        match self {
            TargetSelector::NameContains(fragment) => name.contains(fragment.as_str()),
        }
    }

    /// Only meshes carry materials, so only meshes can match
    pub fn matches(&self, node: &Node) -> bool {
        node.is_mesh() && self.matches_name(node.name())
    }
}

impl Default for TargetSelector {
    fn default() -> Self {
        TargetSelector::name_contains(DEFAULT_TARGET)
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSelector::NameContains(fragment) => write!(f, "name contains '{}'", fragment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match_is_case_sensitive() {
        let sel = TargetSelector::default();
        assert!(sel.matches_name("FrameA"));
        assert!(sel.matches_name("Art_Frame_02"));
        assert!(!sel.matches_name("frame_lower"));
        assert!(!sel.matches_name("Sidebar"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TargetSelector::name_contains("Canvas").to_string(),
            "name contains 'Canvas'"
        );
    }
}

//! Generation service trait and the values passed between stages

use crate::workflow::GenerationRequest;
use museum_core::{Result, ServiceFailure};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name used when the service reports an image without a filename
pub const DEFAULT_ASSET_NAME: &str = "output.png";
/// Storage kind used when the service omits one
pub const DEFAULT_ASSET_KIND: &str = "output";

/// Status returned by a service health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    Available,
    Unavailable(String),
}

/// Receipt for a submitted job.
///
/// Not `Clone`: the resolver takes it by value, so each submission is
/// resolved at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct JobHandle {
    pub prompt_id: String,
    /// Stage whose images are the job's result
    pub output_stage: String,
    /// Position in the service queue at submission time
    pub queue_number: Option<u64>,
}

/// Identifies one produced image on the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLocator {
    pub name: String,
    pub subfolder: String,
    pub kind: String,
}

impl AssetLocator {
    /// Build a locator, substituting defaults for absent or empty fields
    pub fn from_parts(name: Option<&str>, subfolder: Option<&str>, kind: Option<&str>) -> Self {
        let non_empty = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            name: non_empty(name).unwrap_or_else(|| DEFAULT_ASSET_NAME.to_string()),
            subfolder: subfolder.unwrap_or_default().to_string(),
            kind: non_empty(kind).unwrap_or_else(|| DEFAULT_ASSET_KIND.to_string()),
        }
    }

    /// Query pairs for the view endpoint
    pub fn query(&self) -> [(&'static str, &str); 3] {
        [
            ("filename", self.name.as_str()),
            ("subfolder", self.subfolder.as_str()),
            ("type", self.kind.as_str()),
        ]
    }

    /// File extension of the asset name, if any
    pub fn extension(&self) -> Option<&str> {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
    }
}

impl fmt::Display for AssetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subfolder.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.subfolder, self.name)
        }
    }
}

/// A remote image generation service (ComfyUI or the in-process mock).
///
/// Calls are blocking; the pipeline runs them on the blocking pool. Each
/// method makes exactly one request and returns the raw body so parsing
/// stays in one place.
pub trait GenerationService: Send + Sync {
    /// Service name (e.g. "comfyui", "mock")
    fn name(&self) -> &str;

    /// Check whether the service is reachable
    fn health_check(&self) -> Result<ServiceStatus>;

    /// `POST /prompt`
    fn submit_prompt(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<serde_json::Value, ServiceFailure>;

    /// `GET /history/{prompt_id}`
    fn history(&self, prompt_id: &str) -> std::result::Result<serde_json::Value, ServiceFailure>;

    /// `GET /view?filename=&subfolder=&type=`
    fn view(&self, locator: &AssetLocator) -> std::result::Result<Vec<u8>, ServiceFailure>;
}

pub type SharedService = Arc<dyn GenerationService>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_defaults() {
        let locator = AssetLocator::from_parts(None, None, None);
        assert_eq!(locator.name, DEFAULT_ASSET_NAME);
        assert_eq!(locator.subfolder, "");
        assert_eq!(locator.kind, "output");

        let locator = AssetLocator::from_parts(Some(""), Some("gallery"), Some("temp"));
        assert_eq!(locator.name, DEFAULT_ASSET_NAME);
        assert_eq!(locator.subfolder, "gallery");
        assert_eq!(locator.kind, "temp");
    }

    #[test]
    fn test_locator_display_and_query() {
        let locator = AssetLocator::from_parts(Some("out1.png"), Some(""), Some("output"));
        assert_eq!(locator.to_string(), "output/out1.png");
        assert_eq!(locator.extension(), Some("png"));
        assert_eq!(locator.query()[0], ("filename", "out1.png"));
        assert_eq!(locator.query()[2], ("type", "output"));
    }
}

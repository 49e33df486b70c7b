//! Error types for the museum workspace

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A pipeline stage, used to attribute failures and progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Submit,
    Resolve,
    Fetch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Submit => write!(f, "submit"),
            Stage::Resolve => write!(f, "resolve"),
            Stage::Fetch => write!(f, "fetch"),
        }
    }
}

/// Why a call to the generation service failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceFailure {
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The main error type for museum operations
#[derive(Debug, Error)]
pub enum MuseumError {
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    #[error("Submission failed: {0}")]
    Submission(ServiceFailure),

    #[error("Result resolution failed: {0}")]
    Resolution(ServiceFailure),

    #[error("No asset produced: {0}")]
    NoAssetProduced(String),

    #[error("Asset fetch failed: {0}")]
    Fetch(ServiceFailure),

    #[error("Timed out after {limit:?} in {stage} stage")]
    Timeout { stage: Stage, limit: Duration },

    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Duplicate node name: {0}")]
    DuplicateNodeName(String),

    #[error("Scene error: {0}")]
    SceneError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

impl MuseumError {
    /// The pipeline stage this error belongs to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            MuseumError::InvalidRequest(_) | MuseumError::Submission(_) => Some(Stage::Submit),
            MuseumError::Resolution(_) | MuseumError::NoAssetProduced(_) => Some(Stage::Resolve),
            MuseumError::Fetch(_) => Some(Stage::Fetch),
            MuseumError::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Build the transport-level error for a stage
    pub fn for_stage(stage: Stage, failure: ServiceFailure) -> Self {
        match stage {
            Stage::Submit => MuseumError::Submission(failure),
            Stage::Resolve => MuseumError::Resolution(failure),
            Stage::Fetch => MuseumError::Fetch(failure),
        }
    }
}

/// Result type alias for museum operations
pub type Result<T> = std::result::Result<T, MuseumError>;

impl From<toml::de::Error> for MuseumError {
    fn from(err: toml::de::Error) -> Self {
        MuseumError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for MuseumError {
    fn from(err: toml::ser::Error) -> Self {
        MuseumError::TomlSerError(err.to_string())
    }
}

//! Run progress reported to UI observers

use museum_core::{AssetHandle, ContentHash, Stage};
use std::fmt;

/// Identifier of one pipeline run
pub type RunId = uuid::Uuid;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Submitting,
    Resolving,
    Fetching,
    Binding,
    Complete,
    Failed,
}

impl RunStatus {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Submitting | Self::Resolving | Self::Fetching | Self::Binding
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitting => "submitting",
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Binding => "binding",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Describes a fetched asset without keeping its file alive.
///
/// Events can sit in the broadcast buffer until a slow subscriber reads
/// them, so they never carry an [`AssetHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSummary {
    pub hash: ContentHash,
    pub uri: String,
    pub dimensions: (u32, u32),
}

impl From<&AssetHandle> for AssetSummary {
    fn from(handle: &AssetHandle) -> Self {
        Self {
            hash: handle.hash(),
            uri: handle.uri(),
            dimensions: handle.dimensions(),
        }
    }
}

/// Broadcast by the pipeline as runs progress
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Status {
        run: RunId,
        status: RunStatus,
    },
    Completed {
        run: RunId,
        prompt_id: String,
        rebound: usize,
        asset: AssetSummary,
    },
    Failed {
        run: RunId,
        stage: Option<Stage>,
        error: String,
    },
}

impl PipelineEvent {
    pub fn run(&self) -> RunId {
        match self {
            Self::Status { run, .. } | Self::Completed { run, .. } | Self::Failed { run, .. } => {
                *run
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_phases() {
        assert!(RunStatus::Fetching.is_active());
        assert!(!RunStatus::Fetching.is_finished());
        assert!(RunStatus::Failed.is_finished());
        assert!(!RunStatus::Complete.is_active());
        assert_eq!(RunStatus::Binding.to_string(), "binding");
    }
}

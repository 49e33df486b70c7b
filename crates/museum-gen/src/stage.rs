//! Shared plumbing for the network-bound pipeline stages

use museum_core::{MuseumError, Result, ServiceFailure, Stage};
use std::future::Future;
use std::time::Duration;

/// Time bounds applied to every network stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLimits {
    /// Upper bound for one whole stage, including resolver polling
    pub timeout: Duration,
    /// Pause between history polls while the job is still running
    pub poll_interval: Duration,
}

impl Default for StageLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Run a blocking service call on tokio's blocking pool
pub(crate) async fn run_blocking<T, F>(stage: Stage, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        MuseumError::for_stage(
            stage,
            ServiceFailure::Transport(format!("service call aborted: {}", e)),
        )
    })?
}

/// Bound `fut` by `limit`, reporting expiry against `stage`
pub(crate) async fn with_timeout<T>(
    stage: Stage,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(%stage, ?limit, "stage timed out");
            Err(MuseumError::Timeout { stage, limit })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_is_attributed_to_stage() {
        let result: Result<()> = with_timeout(Stage::Fetch, Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(
            result,
            Err(MuseumError::Timeout { stage: Stage::Fetch, .. })
        ));
    }

    #[tokio::test]
    async fn test_blocking_panic_becomes_stage_error() {
        let result: Result<()> = run_blocking(Stage::Resolve, || panic!("service blew up")).await;
        assert!(matches!(
            result,
            Err(MuseumError::Resolution(ServiceFailure::Transport(_)))
        ));
    }
}

//! Result Resolver

use crate::protocol::{extract_locator, select_history_entry, HistoryPoll};
use crate::service::{AssetLocator, JobHandle, SharedService};
use crate::stage::{run_blocking, with_timeout, StageLimits};
use museum_core::{MuseumError, Result, Stage};

/// Wait for `job` to finish and locate the image its output stage saved.
///
/// Polls the history endpoint until a record appears; the whole wait is
/// bounded by the stage timeout.
pub async fn resolve(
    service: &SharedService,
    job: JobHandle,
    limits: StageLimits,
) -> Result<AssetLocator> {
    let JobHandle {
        prompt_id,
        output_stage,
        ..
    } = job;

    with_timeout(Stage::Resolve, limits.timeout, async {
        let mut polls = 0u32;
        loop {
            polls += 1;
            let svc = service.clone();
            let id = prompt_id.clone();
            let body = run_blocking(Stage::Resolve, move || {
                svc.history(&id).map_err(MuseumError::Resolution)
            })
            .await?;

            match select_history_entry(body, &prompt_id)? {
                HistoryPoll::Pending => {
                    tracing::debug!(prompt_id = %prompt_id, polls, "job not finished");
                    tokio::time::sleep(limits.poll_interval).await;
                }
                HistoryPoll::Ready(entry) => {
                    let locator = extract_locator(&entry, &output_stage)?;
                    tracing::info!(prompt_id = %prompt_id, polls, asset = %locator, "job resolved");
                    return Ok(locator);
                }
            }
        }
    })
    .await
}

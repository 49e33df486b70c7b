//! Job Submitter

use crate::protocol::parse_submit_response;
use crate::service::{JobHandle, SharedService};
use crate::stage::{run_blocking, with_timeout, StageLimits};
use crate::workflow::GenerationRequest;
use museum_core::{MuseumError, Result, Stage};

/// Validate `request` and post it to the service's queue.
///
/// An invalid graph fails with `InvalidRequest` before any network call.
/// Otherwise exactly one request is made.
pub async fn submit(
    service: &SharedService,
    request: &GenerationRequest,
    limits: StageLimits,
) -> Result<JobHandle> {
    request.validate()?;

    let svc = service.clone();
    let req = request.clone();
    let job = with_timeout(
        Stage::Submit,
        limits.timeout,
        run_blocking(Stage::Submit, move || {
            let body = svc.submit_prompt(&req).map_err(MuseumError::Submission)?;
            parse_submit_response(body, req.output_stage()).map_err(MuseumError::Submission)
        }),
    )
    .await?;

    tracing::info!(
        service = service.name(),
        prompt_id = %job.prompt_id,
        queue = ?job.queue_number,
        "job submitted"
    );
    Ok(job)
}

//! Delivery of the final video to the job store.

use sketchcast_models::{ArtifactKind, FinalVideo};
use sketchcast_storage::ArtifactKey;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::Pipeline;
use crate::stages::assembly::MuxedOutput;
use crate::stages::JobContext;

pub(crate) async fn deliver(
    pipeline: &Pipeline,
    ctx: &JobContext,
    muxed: &MuxedOutput,
) -> PipelineResult<FinalVideo> {
    let key = ArtifactKey::job(&ctx.job.id, ArtifactKind::Final);
    let location = pipeline
        .store
        .put(&muxed.path, &key)
        .await
        .map_err(PipelineError::delivery_failed)?;

    ctx.logger
        .log_progress(&format!("final video stored at {}", location));

    Ok(FinalVideo {
        job_id: ctx.job.id.clone(),
        location,
        duration_secs: muxed.duration_secs,
    })
}

//! Narration: speech for one sentence, with its measured duration.

use tracing::debug;

use sketchcast_models::{ArtifactKind, AudioSegment, Sentence};
use sketchcast_storage::ArtifactKey;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::Pipeline;
use crate::stages::JobContext;

pub(crate) async fn narrate(
    pipeline: &Pipeline,
    ctx: &JobContext,
    sentence: &Sentence,
) -> PipelineResult<AudioSegment> {
    let index = sentence.index;

    let audio = pipeline
        .narrator
        .synthesize(&sentence.text, &ctx.settings.voice)
        .await
        .map_err(|e| PipelineError::narration_failed(index, e))?;

    let path = ctx.sentence_file("narration", index, "mp3");
    tokio::fs::write(&path, &audio).await?;

    // Duration comes from the decoded file, never from the text
    let duration_secs = pipeline
        .media
        .probe_duration(&path)
        .await
        .map_err(|e| PipelineError::narration_failed(index, format!("unreadable audio: {}", e)))?;
    if duration_secs <= 0.0 {
        return Err(PipelineError::narration_failed(index, "audio has zero duration"));
    }

    let key = ArtifactKey::sentence(&ctx.job.id, ArtifactKind::Audio, index);
    let location = pipeline.store.put(&path, &key).await?;
    ctx.record(key, location.clone()).await;

    debug!(
        job_id = %ctx.job.id,
        sentence_index = index,
        duration_secs,
        "Narration stored"
    );

    Ok(AudioSegment {
        sentence_index: index,
        location,
        duration_secs,
    })
}

//! Rendering: one silent reveal clip per sentence.

use tracing::{debug, warn};

use sketchcast_media::{ClipRequest, ClipTiming};
use sketchcast_models::{ArtifactKind, AudioSegment, Clip, ImageArtifact};
use sketchcast_storage::ArtifactKey;

use crate::error::{PipelineError, PipelineResult};
use crate::metrics;
use crate::pipeline::Pipeline;
use crate::stages::JobContext;

/// Render the clip pairing `audio` with `image`; both must share a sentence index.
pub(crate) async fn render_clip(
    pipeline: &Pipeline,
    ctx: &JobContext,
    audio: &AudioSegment,
    image: &ImageArtifact,
) -> PipelineResult<Clip> {
    let index = audio.sentence_index;
    if image.sentence_index != index {
        return Err(PipelineError::render_failed(
            index,
            format!("paired with image of sentence {}", image.sentence_index),
        ));
    }

    let image_path = pipeline
        .store
        .materialize(&image.location, &ctx.scratch)
        .await?;
    let timing = ClipTiming::plan(audio.duration_secs, &ctx.settings.render);
    let output = ctx.sentence_file("clips", index, "mp4");

    let rendered = pipeline
        .media
        .render_clip(ClipRequest {
            sentence_index: index,
            image: image_path,
            frame: ctx.settings.frame,
            timing,
            settings: ctx.settings.render.clone(),
            output: output.clone(),
            scratch_dir: ctx.scratch.join("clips"),
        })
        .await
        .map_err(|e| PipelineError::render_failed(index, e))?;

    ctx.consume(&ArtifactKey::sentence(&ctx.job.id, ArtifactKind::Image, index))
        .await;

    if rendered.degraded {
        metrics::record_degraded_clip();
        warn!(
            job_id = %ctx.job.id,
            sentence_index = index,
            "Vectorization degraded, clip is a still image"
        );
    }

    let key = ArtifactKey::sentence(&ctx.job.id, ArtifactKind::Clip, index);
    let location = pipeline.store.put(&output, &key).await?;
    ctx.record(key, location.clone()).await;

    debug!(
        job_id = %ctx.job.id,
        sentence_index = index,
        duration_secs = rendered.duration_secs,
        drift_secs = timing.drift_secs(),
        strokes = rendered.stroke_count,
        "Clip stored"
    );

    Ok(Clip {
        sentence_index: index,
        location,
        duration_secs: rendered.duration_secs,
        degraded: rendered.degraded,
    })
}

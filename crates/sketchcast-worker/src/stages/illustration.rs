//! Illustration: one whiteboard sketch per sentence.

use std::path::PathBuf;

use image::ImageFormat;
use tracing::debug;

use sketchcast_models::{ArtifactKind, ImageArtifact, Sentence};
use sketchcast_providers::{sketch_prompt, IllustrationRequest};
use sketchcast_storage::ArtifactKey;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::Pipeline;
use crate::stages::JobContext;

pub(crate) async fn illustrate(
    pipeline: &Pipeline,
    ctx: &JobContext,
    sentence: &Sentence,
) -> PipelineResult<ImageArtifact> {
    let index = sentence.index;
    let request = IllustrationRequest {
        prompt: sketch_prompt(&sentence.text, ctx.settings.labels.allows(index)),
        size: ctx.settings.image_size,
        quality: ctx.settings.image_quality,
    };

    let bytes = pipeline
        .illustrator
        .illustrate(&request)
        .await
        .map_err(|e| PipelineError::illustration_failed(index, e))?;

    let path = ctx.sentence_file("illustration", index, "png");
    let (width, height) = write_png(bytes, path.clone())
        .await
        .map_err(|e| PipelineError::illustration_failed(index, e))?;

    let key = ArtifactKey::sentence(&ctx.job.id, ArtifactKind::Image, index);
    let location = pipeline.store.put(&path, &key).await?;
    ctx.record(key, location.clone()).await;

    debug!(
        job_id = %ctx.job.id,
        sentence_index = index,
        width,
        height,
        "Illustration stored"
    );

    Ok(ImageArtifact {
        sentence_index: index,
        location,
        width,
        height,
    })
}

/// Validate the provider's image and store it as PNG; returns its dimensions.
async fn write_png(bytes: Vec<u8>, path: PathBuf) -> Result<(u32, u32), String> {
    tokio::task::spawn_blocking(move || {
        let format = image::guess_format(&bytes).map_err(|e| format!("unrecognized image: {}", e))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| format!("undecodable image: {}", e))?;
        let dimensions = (decoded.width(), decoded.height());
        if dimensions.0 == 0 || dimensions.1 == 0 {
            return Err("image has no pixels".to_string());
        }

        if format == ImageFormat::Png {
            std::fs::write(&path, &bytes).map_err(|e| e.to_string())?;
        } else {
            decoded
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|e| e.to_string())?;
        }
        Ok(dimensions)
    })
    .await
    .map_err(|e| format!("image task failed: {}", e))?
}

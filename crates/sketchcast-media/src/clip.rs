//! Per-sentence clip rendering.
//!
//! Two shapes of clip exist:
//!
//! - **Reveal**: the traced strokes are drawn progressively over the draw
//!   phase, then the finished drawing is held.
//! - **Still**: when tracing produced nothing, the source raster is fitted
//!   into the frame and held for the whole clip.
//!
//! Both are encoded through [`RawFrameEncoder`] with the same parameters so
//! the sequencer can concatenate them without re-encoding.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::info;

use sketchcast_models::{EncodingConfig, FrameSize, RenderSettings};

use crate::canvas::RevealCanvas;
use crate::encode::RawFrameEncoder;
use crate::error::{MediaError, MediaResult};
use crate::geometry::FitPlacement;
use crate::reveal::RevealPlan;
use crate::timing::ClipTiming;
use crate::vector::VectorDrawing;

/// Result of rendering one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedClip {
    /// Encoded duration in seconds
    pub duration_secs: f64,
    pub frames: u64,
    pub stroke_count: usize,
    /// Rendered as a still because there was nothing to reveal
    pub degraded: bool,
}

/// Render the progressive reveal of `drawing` into `output`.
pub fn render_reveal_clip(
    drawing: VectorDrawing,
    frame: FrameSize,
    timing: &ClipTiming,
    settings: &RenderSettings,
    encoding: &EncodingConfig,
    output: &Path,
) -> MediaResult<RenderedClip> {
    let fit = FitPlacement::fit(drawing.width, drawing.height, frame).ok_or_else(|| {
        MediaError::invalid_frame(format!(
            "drawing has no usable size: {}x{}",
            drawing.width, drawing.height
        ))
    })?;

    let plan = RevealPlan::new(drawing.strokes);
    let mut canvas = RevealCanvas::new(frame, fit.to_affine(), settings.stroke_width)?;
    let mut encoder = RawFrameEncoder::start(output, frame, settings.fps, encoding)?;

    let total_frames = timing.total_frames(settings.fps);
    let draw_frames = timing.draw_frames(settings.fps);
    let mut committed = 0;

    for k in 0..draw_frames {
        let progress = (k + 1) as f64 / draw_frames as f64;
        let state = plan.frame_at(progress);
        while committed < state.completed {
            canvas.commit(&plan.strokes()[committed]);
            committed += 1;
        }
        encoder.push(canvas.compose(state.partial.as_ref()))?;
    }

    while committed < plan.stroke_count() {
        canvas.commit(&plan.strokes()[committed]);
        committed += 1;
    }
    let finished = canvas.compose(None).to_vec();
    encoder.push_repeated(&finished, total_frames - draw_frames)?;

    let frames = encoder.finish()?;
    info!(
        output = %output.display(),
        strokes = plan.stroke_count(),
        draw_frames,
        frames,
        "Rendered reveal clip"
    );

    Ok(RenderedClip {
        duration_secs: frames as f64 / settings.fps as f64,
        frames,
        stroke_count: plan.stroke_count(),
        degraded: false,
    })
}

/// Fit `source` into `frame` on white, preserving aspect ratio.
pub fn fit_on_white(source: &RgbaImage, frame: FrameSize) -> MediaResult<RgbaImage> {
    let fit = FitPlacement::fit(source.width() as f64, source.height() as f64, frame)
        .ok_or_else(|| MediaError::invalid_frame("source image is empty"))?;
    let (w, h, x, y) = fit.pixel_rect(frame);

    let scaled = imageops::resize(source, w, h, FilterType::Lanczos3);
    let mut canvas = RgbaImage::from_pixel(frame.width, frame.height, Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
    Ok(canvas)
}

/// Hold the fitted source image for the whole clip.
pub fn render_still_clip(
    source: &RgbaImage,
    frame: FrameSize,
    timing: &ClipTiming,
    settings: &RenderSettings,
    encoding: &EncodingConfig,
    output: &Path,
) -> MediaResult<RenderedClip> {
    let still = fit_on_white(source, frame)?;
    let total_frames = timing.total_frames(settings.fps);

    let mut encoder = RawFrameEncoder::start(output, frame, settings.fps, encoding)?;
    encoder.push_repeated(still.as_raw(), total_frames)?;
    let frames = encoder.finish()?;

    info!(output = %output.display(), frames, "Rendered still clip");

    Ok(RenderedClip {
        duration_secs: frames as f64 / settings.fps as f64,
        frames,
        stroke_count: 0,
        degraded: true,
    })
}

//! Media capability used by the pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use sketchcast_models::{EncodingConfig, FrameSize, RenderSettings};

use crate::clip::{render_reveal_clip, render_still_clip, RenderedClip};
use crate::command::{check_ffmpeg, check_ffprobe, FfmpegRunner};
use crate::concat;
use crate::error::{MediaError, MediaResult};
use crate::mux::mux_audio_video;
use crate::probe::probe_duration;
use crate::timing::ClipTiming;
use crate::vector::{PotraceVectorizer, VectorDrawing, Vectorizer};

/// Everything needed to render one sentence's clip.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub sentence_index: usize,
    /// Source illustration on local disk
    pub image: PathBuf,
    pub frame: FrameSize,
    pub timing: ClipTiming,
    pub settings: RenderSettings,
    pub output: PathBuf,
    /// Directory for tracing intermediates
    pub scratch_dir: PathBuf,
}

/// Probing, rendering, concatenation and muxing of job media.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Measured duration of an audio or video file.
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64>;

    /// Render a silent clip; falls back to a still when tracing yields nothing.
    async fn render_clip(&self, request: ClipRequest) -> MediaResult<RenderedClip>;

    /// Join clips in slice order into one silent video track.
    async fn concat_video(&self, clips: &[PathBuf], output: &Path) -> MediaResult<()>;

    /// Join narration segments in slice order into one audio track.
    async fn concat_audio(&self, segments: &[PathBuf], output: &Path) -> MediaResult<()>;

    /// Attach `audio` to `video`; returns the measured final duration.
    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        audio_secs: f64,
    ) -> MediaResult<f64>;
}

/// [`MediaBackend`] driving the ffmpeg and ffprobe binaries.
pub struct FfmpegMedia {
    vectorizer: Arc<dyn Vectorizer>,
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl Default for FfmpegMedia {
    fn default() -> Self {
        Self::new(Arc::new(PotraceVectorizer::new()))
    }
}

impl FfmpegMedia {
    pub fn new(vectorizer: Arc<dyn Vectorizer>) -> Self {
        Self {
            vectorizer,
            encoding: EncodingConfig::default(),
            runner: FfmpegRunner::new(),
        }
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    /// Kill any single ffmpeg invocation running longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    /// Fail fast when required binaries are missing.
    pub fn ensure_tools(&self) -> MediaResult<()> {
        check_ffmpeg()?;
        check_ffprobe()?;
        Ok(())
    }

    async fn trace(&self, request: &ClipRequest) -> Option<VectorDrawing> {
        match self
            .vectorizer
            .vectorize(&request.image, &request.scratch_dir)
            .await
        {
            Ok(drawing) if !drawing.is_empty() => Some(drawing),
            Ok(_) => {
                warn!(
                    sentence_index = request.sentence_index,
                    "Vectorization produced no strokes, rendering still image"
                );
                None
            }
            Err(e) => {
                warn!(
                    sentence_index = request.sentence_index,
                    error = %e.detail(),
                    "Vectorization failed, rendering still image"
                );
                None
            }
        }
    }
}

#[async_trait]
impl MediaBackend for FfmpegMedia {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        probe_duration(path).await
    }

    async fn render_clip(&self, request: ClipRequest) -> MediaResult<RenderedClip> {
        let started = Instant::now();
        let drawing = self.trace(&request).await;

        let encoding = self.encoding.clone();
        let index = request.sentence_index;
        let rendered = tokio::task::spawn_blocking(move || match drawing {
            Some(drawing) => render_reveal_clip(
                drawing,
                request.frame,
                &request.timing,
                &request.settings,
                &encoding,
                &request.output,
            ),
            None => {
                let source = image::open(&request.image)?.to_rgba8();
                render_still_clip(
                    &source,
                    request.frame,
                    &request.timing,
                    &request.settings,
                    &encoding,
                    &request.output,
                )
            }
        })
        .await
        .map_err(|e| MediaError::internal(format!("render task failed: {}", e)))??;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!("sketchcast_clip_render_seconds").record(elapsed);
        metrics::counter!(
            "sketchcast_clips_rendered_total",
            "degraded" => rendered.degraded.to_string()
        )
        .increment(1);

        info!(
            sentence_index = index,
            duration = rendered.duration_secs,
            strokes = rendered.stroke_count,
            degraded = rendered.degraded,
            elapsed_secs = elapsed,
            "Clip rendered"
        );
        Ok(rendered)
    }

    async fn concat_video(&self, clips: &[PathBuf], output: &Path) -> MediaResult<()> {
        concat::concat_video(&self.runner, clips, output).await
    }

    async fn concat_audio(&self, segments: &[PathBuf], output: &Path) -> MediaResult<()> {
        concat::concat_audio(&self.runner, segments, output, &self.encoding).await
    }

    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        audio_secs: f64,
    ) -> MediaResult<f64> {
        mux_audio_video(&self.runner, video, audio, output, audio_secs, &self.encoding).await?;
        probe_duration(output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Vectorizer that never finds anything to trace.
    struct BlankVectorizer;

    #[async_trait]
    impl Vectorizer for BlankVectorizer {
        async fn vectorize(&self, _image: &Path, _scratch: &Path) -> MediaResult<VectorDrawing> {
            Ok(VectorDrawing::default())
        }
    }

    #[tokio::test]
    async fn test_trace_degrades_on_empty_drawing() {
        let media = FfmpegMedia::new(Arc::new(BlankVectorizer));
        let request = ClipRequest {
            sentence_index: 3,
            image: PathBuf::from("unused.png"),
            frame: FrameSize::new(320, 180),
            timing: ClipTiming::plan(1.0, &RenderSettings::default()),
            settings: RenderSettings::default(),
            output: PathBuf::from("unused.mp4"),
            scratch_dir: std::env::temp_dir(),
        };
        assert!(media.trace(&request).await.is_none());
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_end_to_end_tracks_follow_audio() {
        let dir = tempfile::tempdir().unwrap();
        let media = FfmpegMedia::new(Arc::new(BlankVectorizer));
        let settings = RenderSettings::default();

        let image = dir.path().join("image.png");
        RgbaImage::from_pixel(96, 64, Rgba([40, 40, 40, 255]))
            .save(&image)
            .unwrap();

        let mut clips = Vec::new();
        for (i, secs) in [0.3, 1.4].iter().enumerate() {
            let output = dir.path().join(format!("clip_{}.mp4", i));
            let rendered = media
                .render_clip(ClipRequest {
                    sentence_index: i,
                    image: image.clone(),
                    frame: FrameSize::new(320, 180),
                    timing: ClipTiming::plan(*secs, &settings),
                    settings: settings.clone(),
                    output: output.clone(),
                    scratch_dir: dir.path().to_path_buf(),
                })
                .await
                .unwrap();
            assert!(rendered.degraded);
            assert!(rendered.duration_secs >= 1.0);
            clips.push(output);
        }

        let video = dir.path().join("video_track.mp4");
        media.concat_video(&clips, &video).await.unwrap();
        let video_secs = media.probe_duration(&video).await.unwrap();
        assert!(video_secs > 2.3);

        // Silent narration stand-in shorter than the video track
        let audio = dir.path().join("audio.m4a");
        let status = std::process::Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-f", "lavfi", "-i", "anullsrc=r=44100:cl=mono", "-t", "1.7", "-c:a", "aac"])
            .arg(&audio)
            .status()
            .unwrap();
        assert!(status.success());

        let final_path = dir.path().join("final.mp4");
        let final_secs = media.mux(&video, &audio, &final_path, 1.7).await.unwrap();
        assert!((final_secs - 1.7).abs() <= 1.0 / 24.0 + 0.05);
    }
}

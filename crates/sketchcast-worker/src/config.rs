//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;

use sketchcast_models::RenderSettings;

use crate::error::{PipelineError, PipelineResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root of per-job scratch directories
    pub work_dir: PathBuf,
    /// Sentences narrated and illustrated at once within a job
    pub max_sentence_parallel: usize,
    /// Clips rendered at once within a job
    pub max_render_parallel: usize,
    /// Delete attempts per intermediate during the cleanup sweep
    pub cleanup_attempts: u32,
    /// Longest single ffmpeg invocation, in seconds
    pub ffmpeg_timeout_secs: u64,
    /// Render settings applied to every job
    pub render: RenderSettings,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("sketchcast"),
            max_sentence_parallel: 4,
            max_render_parallel: 2,
            cleanup_attempts: 3,
            ffmpeg_timeout_secs: 600,
            render: RenderSettings::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Malformed numbers fall back to defaults; unknown render policy names
    /// are rejected.
    pub fn from_env() -> PipelineResult<Self> {
        let defaults = Self::default();
        let mut render = defaults.render.clone();

        render.fps = env_or("RENDER_FPS", render.fps);
        render.min_clip_secs = env_or("RENDER_MIN_CLIP_SECS", render.min_clip_secs);
        render.hold_secs = env_or("RENDER_HOLD_SECS", render.hold_secs);
        render.stroke_width = env_or("RENDER_STROKE_WIDTH", render.stroke_width);
        if let Ok(mode) = std::env::var("RENDER_HOLD_MODE") {
            render.hold_mode = mode.parse().map_err(|e| PipelineError::config(format!("{}", e)))?;
        }
        if let Ok(policy) = std::env::var("RENDER_DRIFT_POLICY") {
            render.drift_policy = policy
                .parse()
                .map_err(|e| PipelineError::config(format!("{}", e)))?;
        }
        render
            .validate()
            .map_err(|e| PipelineError::config(e.to_string()))?;

        Ok(Self {
            work_dir: std::env::var("SKETCHCAST_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_sentence_parallel: env_or(
                "SKETCHCAST_MAX_SENTENCE_PARALLEL",
                defaults.max_sentence_parallel,
            )
            .max(1),
            max_render_parallel: env_or("SKETCHCAST_MAX_RENDER_PARALLEL", defaults.max_render_parallel)
                .max(1),
            cleanup_attempts: env_or("SKETCHCAST_CLEANUP_ATTEMPTS", defaults.cleanup_attempts).max(1),
            ffmpeg_timeout_secs: env_or("SKETCHCAST_FFMPEG_TIMEOUT_SECS", defaults.ffmpeg_timeout_secs),
            render,
        })
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_render(mut self, render: RenderSettings) -> Self {
        self.render = render;
        self
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

//! Frame sizing and clip timing policy.

use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Shortest clip the renderer will produce.
pub const DEFAULT_MIN_CLIP_SECS: f64 = 1.0;
/// Pause on the completed drawing at the end of each clip.
pub const DEFAULT_HOLD_SECS: f64 = 0.5;
/// Output frame rate.
pub const DEFAULT_FPS: u32 = 24;
/// Pen width in output pixels.
pub const DEFAULT_STROKE_WIDTH: f32 = 3.0;

/// Pixel dimensions of a frame or image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// yuv420p output needs non-zero, even dimensions.
    pub fn validate(&self) -> ModelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ModelError::InvalidFrameSize {
                width: self.width,
                height: self.height,
                reason: "dimensions must be non-zero",
            });
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ModelError::InvalidFrameSize {
                width: self.width,
                height: self.height,
                reason: "dimensions must be even",
            });
        }
        Ok(())
    }

    /// `WxH` form used by ffmpeg `-s` and provider size fields.
    pub fn to_dimension_string(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// How per-clip durations are reconciled with narration durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriftPolicy {
    /// Honor the per-clip floor; the final mux loops or trims video to the audio.
    #[default]
    Global,
    /// Force each clip to exactly its narration duration, ignoring the floor.
    PerClip,
}

impl FromStr for DriftPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "global" => Ok(DriftPolicy::Global),
            "per_clip" => Ok(DriftPolicy::PerClip),
            other => Err(ModelError::unknown_variant("drift_policy", other)),
        }
    }
}

/// Whether the trailing hold is part of the clip duration or added after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum HoldMode {
    /// Draw and hold together fill the clip duration.
    #[default]
    Contained,
    /// Draw fills the clip duration and the hold is appended after it.
    Additive,
}

impl FromStr for HoldMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contained" => Ok(HoldMode::Contained),
            "additive" => Ok(HoldMode::Additive),
            other => Err(ModelError::unknown_variant("hold_mode", other)),
        }
    }
}

/// Rendering parameters fixed once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderSettings {
    #[serde(default = "default_fps")]
    pub fps: u32,

    #[serde(default = "default_min_clip_secs")]
    pub min_clip_secs: f64,

    #[serde(default = "default_hold_secs")]
    pub hold_secs: f64,

    #[serde(default)]
    pub hold_mode: HoldMode,

    #[serde(default)]
    pub drift_policy: DriftPolicy,

    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}
fn default_min_clip_secs() -> f64 {
    DEFAULT_MIN_CLIP_SECS
}
fn default_hold_secs() -> f64 {
    DEFAULT_HOLD_SECS
}
fn default_stroke_width() -> f32 {
    DEFAULT_STROKE_WIDTH
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            min_clip_secs: DEFAULT_MIN_CLIP_SECS,
            hold_secs: DEFAULT_HOLD_SECS,
            hold_mode: HoldMode::default(),
            drift_policy: DriftPolicy::default(),
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }
}

impl RenderSettings {
    pub fn with_drift_policy(mut self, policy: DriftPolicy) -> Self {
        self.drift_policy = policy;
        self
    }

    pub fn with_hold(mut self, mode: HoldMode, secs: f64) -> Self {
        self.hold_mode = mode;
        self.hold_secs = secs;
        self
    }

    /// Seconds per output frame.
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.fps as f64
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.fps == 0 || self.fps > 120 {
            return Err(ModelError::invalid_render_settings(format!(
                "fps must be within 1..=120, got {}",
                self.fps
            )));
        }
        if !self.min_clip_secs.is_finite() || self.min_clip_secs < 0.0 {
            return Err(ModelError::invalid_render_settings(
                "min_clip_secs must be a non-negative number",
            ));
        }
        if !self.hold_secs.is_finite() || self.hold_secs < 0.0 {
            return Err(ModelError::invalid_render_settings(
                "hold_secs must be a non-negative number",
            ));
        }
        if self.stroke_width.is_nan() || self.stroke_width <= 0.0 {
            return Err(ModelError::invalid_render_settings(
                "stroke_width must be positive",
            ));
        }
        Ok(())
    }
}

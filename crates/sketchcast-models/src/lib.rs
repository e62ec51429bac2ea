//! Shared data models for the Sketchcast pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, job requests and lifecycle states
//! - Per-sentence artifacts (audio, image, clip) and the final video
//! - Frame sizing, clip timing policy and encoding configuration

pub mod artifact;
pub mod encoding;
pub mod error;
pub mod job;
pub mod render;

pub use artifact::{
    ArtifactKind, AudioSegment, Clip, FinalVideo, ImageArtifact, LocationRef, Sentence,
};
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use job::{
    ImageQuality, Job, JobId, JobRequest, JobState, ScriptSource, VideoFormat, VoiceConfig,
};
pub use render::{DriftPolicy, FrameSize, HoldMode, RenderSettings};

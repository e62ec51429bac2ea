//! Pipeline error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sketchcast_media::MediaError;
use sketchcast_models::{JobId, JobState, ModelError};
use sketchcast_storage::StorageError;

use crate::pipeline::RetainedJob;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Script contains no usable sentences")]
    EmptyScript,

    #[error("Script generation failed: {0}")]
    ScriptGenerationFailed(String),

    #[error("Narration failed for sentence {sentence_index}: {message}")]
    NarrationFailed {
        sentence_index: usize,
        message: String,
    },

    #[error("Illustration failed for sentence {sentence_index}: {message}")]
    IllustrationFailed {
        sentence_index: usize,
        message: String,
    },

    #[error("Rendering failed for sentence {sentence_index}: {message}")]
    RenderFailed {
        sentence_index: usize,
        message: String,
    },

    #[error("No clips were produced")]
    NoClipsProduced,

    #[error("Mux failed: {0}")]
    MuxFailed(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid job: {0}")]
    Model(#[from] ModelError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn script_generation_failed(cause: impl fmt::Display) -> Self {
        Self::ScriptGenerationFailed(cause.to_string())
    }

    pub fn narration_failed(sentence_index: usize, cause: impl fmt::Display) -> Self {
        Self::NarrationFailed {
            sentence_index,
            message: cause.to_string(),
        }
    }

    pub fn illustration_failed(sentence_index: usize, cause: impl fmt::Display) -> Self {
        Self::IllustrationFailed {
            sentence_index,
            message: cause.to_string(),
        }
    }

    pub fn render_failed(sentence_index: usize, cause: impl fmt::Display) -> Self {
        Self::RenderFailed {
            sentence_index,
            message: cause.to_string(),
        }
    }

    pub fn mux_failed(cause: impl fmt::Display) -> Self {
        Self::MuxFailed(cause.to_string())
    }

    pub fn delivery_failed(cause: impl fmt::Display) -> Self {
        Self::DeliveryFailed(cause.to_string())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short name of the failing stage, used as a metrics label.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::EmptyScript | Self::ScriptGenerationFailed(_) => "script",
            Self::NarrationFailed { .. } => "narration",
            Self::IllustrationFailed { .. } => "illustration",
            Self::RenderFailed { .. } => "render",
            Self::NoClipsProduced | Self::MuxFailed(_) => "assembly",
            Self::DeliveryFailed(_) => "delivery",
            Self::Config(_) | Self::Model(_) => "setup",
            Self::Storage(_) | Self::Media(_) | Self::Io(_) => "internal",
        }
    }

    /// Failures after which intermediates are kept for a retry.
    pub fn retains_intermediates(&self) -> bool {
        matches!(self, Self::MuxFailed(_) | Self::DeliveryFailed(_))
    }
}

/// A recoverable problem that did not fail the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Degradation {
    /// Tracing yielded no strokes; the clip is a still of the source image.
    VectorizationDegraded { sentence_index: usize },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::VectorizationDegraded { sentence_index } => write!(
                f,
                "sentence {} rendered as a still image",
                sentence_index
            ),
        }
    }
}

/// A failure leaving the pipeline, tied to its job.
#[derive(Debug, Error)]
#[error("Job {job_id} ended {state}: {error}")]
pub struct JobError {
    pub job_id: JobId,
    pub state: JobState,
    #[source]
    pub error: PipelineError,
    /// Kept intermediates for [`crate::Pipeline::resume`]
    pub retained: Option<Box<RetainedJob>>,
}

impl JobError {
    pub fn new(job_id: JobId, state: JobState, error: PipelineError) -> Self {
        Self {
            job_id,
            state,
            error,
            retained: None,
        }
    }

    pub fn with_retained(mut self, retained: RetainedJob) -> Self {
        self.retained = Some(Box::new(retained));
        self
    }

    pub fn is_resumable(&self) -> bool {
        self.retained.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_names_job_and_cause() {
        let err = JobError::new(
            JobId::from_string("job-42"),
            JobState::Failed,
            PipelineError::narration_failed(3, "HTTP 500"),
        );
        let message = err.to_string();
        assert!(message.contains("job-42"));
        assert!(message.contains("sentence 3"));
        assert!(message.contains("HTTP 500"));
        assert!(!err.is_resumable());
    }

    #[test]
    fn test_retention_policy() {
        assert!(PipelineError::mux_failed("x").retains_intermediates());
        assert!(PipelineError::delivery_failed("x").retains_intermediates());
        assert!(!PipelineError::NoClipsProduced.retains_intermediates());
        assert!(!PipelineError::EmptyScript.retains_intermediates());
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(PipelineError::illustration_failed(0, "x").stage(), "illustration");
        assert_eq!(PipelineError::NoClipsProduced.stage(), "assembly");
    }
}

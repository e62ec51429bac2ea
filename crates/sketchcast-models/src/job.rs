//! Job definitions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::Sentence;
use crate::error::ModelError;
use crate::render::FrameSize;

/// Voice used when a request does not name one (ElevenLabs "Adam").
pub const DEFAULT_VOICE_ID: &str = "pNInz6obpgDQGcFmaJgB";
/// Default ElevenLabs synthesis model.
pub const DEFAULT_AUDIO_MODEL: &str = "eleven_monolingual_v1";
/// Default script style passed to the text generator.
pub const DEFAULT_SCRIPT_STYLE: &str = "educational";

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, no external call made yet
    #[default]
    Pending,
    /// Stages are executing
    Running,
    /// Final video stored and every intermediate deleted
    Completed,
    /// A fatal stage error cancelled the job
    Failed,
    /// Terminal state with intermediates left behind for operator cleanup
    PartiallyCleaned,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::PartiallyCleaned => "partially_cleaned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::PartiallyCleaned
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output orientation of the final video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoFormat {
    /// 16:9 frame, 3:2 illustrations
    #[default]
    Landscape,
    /// 1:1 frame and illustrations
    Square,
}

impl VideoFormat {
    /// Frame the final video is rendered at.
    pub fn frame_size(&self) -> FrameSize {
        match self {
            VideoFormat::Landscape => FrameSize::new(1920, 1080),
            VideoFormat::Square => FrameSize::new(1080, 1080),
        }
    }

    /// Size requested from the illustration provider.
    pub fn image_size(&self) -> FrameSize {
        match self {
            VideoFormat::Landscape => FrameSize::new(1536, 1024),
            VideoFormat::Square => FrameSize::new(1024, 1024),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoFormat::Landscape => "landscape",
            VideoFormat::Square => "square",
        }
    }
}

impl FromStr for VideoFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landscape" => Ok(VideoFormat::Landscape),
            "square" | "portrait" => Ok(VideoFormat::Square),
            other => Err(ModelError::unknown_variant("video_format", other)),
        }
    }
}

/// Illustration quality tier forwarded to the image provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl ImageQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageQuality::Low => "low",
            ImageQuality::Medium => "medium",
            ImageQuality::High => "high",
        }
    }
}

impl FromStr for ImageQuality {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ImageQuality::Low),
            "medium" | "standard" => Ok(ImageQuality::Medium),
            "high" | "hd" => Ok(ImageQuality::High),
            other => Err(ModelError::unknown_variant("image_quality", other)),
        }
    }
}

/// Voice selection for the narration stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VoiceConfig {
    /// Provider voice identifier
    pub voice_id: String,
    /// Provider synthesis model
    #[serde(default = "default_audio_model")]
    pub model_id: String,
}

fn default_audio_model() -> String {
    DEFAULT_AUDIO_MODEL.to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_AUDIO_MODEL.to_string(),
        }
    }
}

impl VoiceConfig {
    pub fn with_voice(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            ..Default::default()
        }
    }
}

/// Where the narration text comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptSource {
    /// Literal script text supplied by the caller
    Text { script: String },
    /// Script generated from a topic by the text-generation capability
    Topic {
        topic: String,
        #[serde(default = "default_script_style")]
        style: String,
    },
}

fn default_script_style() -> String {
    DEFAULT_SCRIPT_STYLE.to_string()
}

impl ScriptSource {
    pub fn text(script: impl Into<String>) -> Self {
        ScriptSource::Text {
            script: script.into(),
        }
    }

    pub fn topic(topic: impl Into<String>) -> Self {
        ScriptSource::Topic {
            topic: topic.into(),
            style: DEFAULT_SCRIPT_STYLE.to_string(),
        }
    }
}

/// A request to turn a script or topic into a narrated video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRequest {
    /// Caller-chosen identifier; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,

    pub source: ScriptSource,

    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub image_quality: ImageQuality,

    #[serde(default)]
    pub video_format: VideoFormat,
}

impl JobRequest {
    pub fn new(source: ScriptSource) -> Self {
        Self {
            job_id: None,
            source,
            voice: VoiceConfig::default(),
            image_quality: ImageQuality::default(),
            video_format: VideoFormat::default(),
        }
    }

    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_voice(mut self, voice: VoiceConfig) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_video_format(mut self, format: VideoFormat) -> Self {
        self.video_format = format;
        self
    }
}

/// One end-to-end video request after the script has been split.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Sentences in narration order; index is the join key for every stage
    pub sentences: Vec<Sentence>,

    pub voice: VoiceConfig,

    pub image_quality: ImageQuality,

    pub video_format: VideoFormat,

    /// Target frame dimensions of every clip and the final video
    pub frame: FrameSize,

    #[serde(default)]
    pub state: JobState,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a job from already-split sentence texts.
    pub fn new(id: JobId, sentences: Vec<String>, request: &JobRequest) -> Self {
        let sentences = sentences
            .into_iter()
            .enumerate()
            .map(|(index, text)| Sentence::new(index, text))
            .collect();

        Self {
            id,
            sentences,
            voice: request.voice.clone(),
            image_quality: request.image_quality,
            video_format: request.video_format,
            frame: request.video_format.frame_size(),
            state: JobState::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    /// Move to a new state, stamping completion for terminal states.
    pub fn transition(&mut self, state: JobState) {
        self.state = state;
        if state.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_generation() {
        let id1 = JobId::new();
        let id2 = JobId::new();
        assert_ne!(id1, id2);
        assert_eq!(JobId::from_string("abc").as_str(), "abc");
    }

    #[test]
    fn test_job_indexes_sentences_in_order() {
        let request = JobRequest::new(ScriptSource::text("unused"));
        let job = Job::new(
            JobId::from_string("job-1"),
            vec!["First one.".into(), "Second one.".into()],
            &request,
        );

        assert_eq!(job.sentence_count(), 2);
        assert_eq!(job.sentences[0].index, 0);
        assert_eq!(job.sentences[1].index, 1);
        assert_eq!(job.sentences[1].text, "Second one.");
        assert_eq!(job.frame, FrameSize::new(1920, 1080));
        assert_eq!(job.state, JobState::Pending);
    }

    #[test]
    fn test_terminal_transition_stamps_completion() {
        let request = JobRequest::new(ScriptSource::text("unused"));
        let mut job = Job::new(JobId::new(), vec!["Only one.".into()], &request);

        job.transition(JobState::Running);
        assert!(job.completed_at.is_none());

        job.transition(JobState::PartiallyCleaned);
        assert!(job.completed_at.is_some());
        assert!(job.state.is_terminal());
    }

    #[test]
    fn test_video_format_sizes() {
        assert_eq!(VideoFormat::Landscape.image_size(), FrameSize::new(1536, 1024));
        assert_eq!(VideoFormat::Square.frame_size(), FrameSize::new(1080, 1080));
        assert_eq!("portrait".parse::<VideoFormat>().unwrap(), VideoFormat::Square);
        assert!("widescreen".parse::<VideoFormat>().is_err());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let json = r#"{"source": {"type": "topic", "topic": "Arrays"}}"#;
        let request: JobRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.voice.voice_id, DEFAULT_VOICE_ID);
        assert_eq!(request.image_quality, ImageQuality::Medium);
        match request.source {
            ScriptSource::Topic { topic, style } => {
                assert_eq!(topic, "Arrays");
                assert_eq!(style, DEFAULT_SCRIPT_STYLE);
            }
            other => panic!("unexpected source: {:?}", other),
        }
    }
}

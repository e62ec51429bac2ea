//! Per-sentence artifacts and the final deliverable.

use std::fmt;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// One unit of narration and illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Sentence {
    /// 0-based position; the join key across every stage
    pub index: usize,
    pub text: String,
}

impl Sentence {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// Kind of artifact a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Audio,
    Image,
    Clip,
    /// Concatenated silent video track
    VideoTrack,
    /// Concatenated narration track
    AudioTrack,
    /// Muxed deliverable
    Final,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Audio => "audio",
            ArtifactKind::Image => "image",
            ArtifactKind::Clip => "clip",
            ArtifactKind::VideoTrack => "video_track",
            ArtifactKind::AudioTrack => "audio_track",
            ArtifactKind::Final => "final",
        }
    }

    /// File extension used for stored artifacts of this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Audio => "mp3",
            ArtifactKind::Image => "png",
            ArtifactKind::Clip | ArtifactKind::VideoTrack | ArtifactKind::Final => "mp4",
            ArtifactKind::AudioTrack => "m4a",
        }
    }

    /// Intermediates are deleted once the final video is persisted.
    pub fn is_intermediate(&self) -> bool {
        !matches!(self, ArtifactKind::Final)
    }

    /// Whether artifacts of this kind are keyed by sentence index.
    pub fn is_per_sentence(&self) -> bool {
        matches!(
            self,
            ArtifactKind::Audio | ArtifactKind::Image | ArtifactKind::Clip
        )
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a stored artifact lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationRef {
    /// File on local disk
    Local { path: PathBuf },
    /// Object in remote storage
    Remote { key: String, url: String },
}

impl LocationRef {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        LocationRef::Local { path: path.into() }
    }

    pub fn remote(key: impl Into<String>, url: impl Into<String>) -> Self {
        LocationRef::Remote {
            key: key.into(),
            url: url.into(),
        }
    }

    /// Retrievable reference: a URL for remote objects, a path otherwise.
    pub fn uri(&self) -> String {
        match self {
            LocationRef::Local { path } => path.to_string_lossy().to_string(),
            LocationRef::Remote { url, .. } => url.clone(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, LocationRef::Remote { .. })
    }
}

impl fmt::Display for LocationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Narration for one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioSegment {
    pub sentence_index: usize,
    pub location: LocationRef,
    /// Measured from the decoded file
    pub duration_secs: f64,
}

/// Illustration for one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageArtifact {
    pub sentence_index: usize,
    pub location: LocationRef,
    pub width: u32,
    pub height: u32,
}

/// Silent reveal clip for one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    pub sentence_index: usize,
    pub location: LocationRef,
    pub duration_secs: f64,
    /// Rendered as a static hold because vectorization found no paths
    #[serde(default)]
    pub degraded: bool,
}

/// The one deliverable of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinalVideo {
    pub job_id: JobId,
    pub location: LocationRef,
    /// Equals the concatenated narration duration
    pub duration_secs: f64,
}

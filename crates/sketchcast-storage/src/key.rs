//! Object key layout.
//!
//! Every artifact is stored under its job:
//!
//! ```text
//! {job_id}/audio/0000.mp3
//! {job_id}/image/0000.png
//! {job_id}/clip/0000.mp4
//! {job_id}/video_track/track.mp4
//! {job_id}/audio_track/track.m4a
//! {job_id}/final/video.mp4
//! ```
//!
//! Per-sentence keys include the sentence index, so concurrent writes for
//! different sentences never collide.

use std::fmt;

use serde::{Deserialize, Serialize};
use sketchcast_models::{ArtifactKind, JobId};

use crate::error::{StorageError, StorageResult};

const ALL_KINDS: [ArtifactKind; 6] = [
    ArtifactKind::Audio,
    ArtifactKind::Image,
    ArtifactKind::Clip,
    ArtifactKind::VideoTrack,
    ArtifactKind::AudioTrack,
    ArtifactKind::Final,
];

/// Identity of one stored artifact: `(job, kind, index)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub job_id: JobId,
    pub kind: ArtifactKind,
    /// Sentence index for per-sentence kinds
    pub index: Option<usize>,
}

impl ArtifactKey {
    /// Key for a per-sentence artifact.
    pub fn sentence(job_id: &JobId, kind: ArtifactKind, index: usize) -> Self {
        Self {
            job_id: job_id.clone(),
            kind,
            index: Some(index),
        }
    }

    /// Key for a job-wide artifact (tracks and the final video).
    pub fn job(job_id: &JobId, kind: ArtifactKind) -> Self {
        Self {
            job_id: job_id.clone(),
            kind,
            index: None,
        }
    }

    /// Object key relative to the store root.
    pub fn object_key(&self) -> StorageResult<String> {
        validate_job_id(&self.job_id)?;
        let file = match (self.kind, self.index) {
            (ArtifactKind::Final, _) => format!("video.{}", self.kind.extension()),
            (kind, Some(index)) if kind.is_per_sentence() => {
                format!("{:04}.{}", index, kind.extension())
            }
            (kind, None) if !kind.is_per_sentence() => format!("track.{}", kind.extension()),
            (kind, index) => {
                return Err(StorageError::invalid_key(format!(
                    "{} artifact cannot have index {:?}",
                    kind, index
                )))
            }
        };
        Ok(format!("{}/{}/{}", self.job_id, self.kind.as_str(), file))
    }

    /// Recover the key from an object key produced by [`Self::object_key`].
    pub fn parse(object_key: &str) -> Option<Self> {
        let mut parts = object_key.split('/');
        let job = parts.next()?;
        let kind_str = parts.next()?;
        let file = parts.next()?;
        if parts.next().is_some() || job.is_empty() {
            return None;
        }

        let kind = ALL_KINDS.into_iter().find(|k| k.as_str() == kind_str)?;
        let (stem, ext) = file.rsplit_once('.')?;
        if ext != kind.extension() {
            return None;
        }

        let index = if kind.is_per_sentence() {
            Some(stem.parse::<usize>().ok()?)
        } else {
            None
        };

        Some(Self {
            job_id: JobId::from_string(job),
            kind,
            index,
        })
    }

    /// MIME type for uploads.
    pub fn content_type(&self) -> &'static str {
        match self.kind {
            ArtifactKind::Audio => "audio/mpeg",
            ArtifactKind::Image => "image/png",
            ArtifactKind::AudioTrack => "audio/mp4",
            ArtifactKind::Clip | ArtifactKind::VideoTrack | ArtifactKind::Final => "video/mp4",
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}/{}#{}", self.job_id, self.kind, index),
            None => write!(f, "{}/{}", self.job_id, self.kind),
        }
    }
}

/// Prefix under which every object of a job lives.
pub fn job_prefix(job_id: &JobId) -> StorageResult<String> {
    validate_job_id(job_id)?;
    Ok(format!("{}/", job_id))
}

/// Job ids become path segments; reject anything that could escape them.
fn validate_job_id(job_id: &JobId) -> StorageResult<()> {
    let id = job_id.as_str();
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(StorageError::invalid_key(format!("job id '{}'", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobId {
        JobId::from_string("job-42")
    }

    #[test]
    fn test_per_sentence_keys() {
        let key = ArtifactKey::sentence(&job(), ArtifactKind::Audio, 3);
        assert_eq!(key.object_key().unwrap(), "job-42/audio/0003.mp3");
        assert_eq!(key.content_type(), "audio/mpeg");

        let key = ArtifactKey::sentence(&job(), ArtifactKind::Clip, 12);
        assert_eq!(key.object_key().unwrap(), "job-42/clip/0012.mp4");
    }

    #[test]
    fn test_job_wide_keys() {
        assert_eq!(
            ArtifactKey::job(&job(), ArtifactKind::Final)
                .object_key()
                .unwrap(),
            "job-42/final/video.mp4"
        );
        assert_eq!(
            ArtifactKey::job(&job(), ArtifactKind::AudioTrack)
                .object_key()
                .unwrap(),
            "job-42/audio_track/track.m4a"
        );
    }

    #[test]
    fn test_index_mismatch_is_rejected() {
        assert!(ArtifactKey::job(&job(), ArtifactKind::Image)
            .object_key()
            .is_err());
        let key = ArtifactKey {
            job_id: job(),
            kind: ArtifactKind::VideoTrack,
            index: Some(1),
        };
        assert!(key.object_key().is_err());
    }

    #[test]
    fn test_unsafe_job_ids_are_rejected() {
        for id in ["", "..", "a/b", "x\\y"] {
            let key = ArtifactKey::job(&JobId::from_string(id), ArtifactKind::Final);
            assert!(key.object_key().is_err(), "accepted {:?}", id);
        }
    }

    #[test]
    fn test_parse_recovers_key() {
        let key = ArtifactKey::sentence(&job(), ArtifactKind::Image, 7);
        let parsed = ArtifactKey::parse(&key.object_key().unwrap()).unwrap();
        assert_eq!(parsed, key);

        assert_eq!(
            ArtifactKey::parse("job-42/final/video.mp4").unwrap().kind,
            ArtifactKind::Final
        );
        assert!(ArtifactKey::parse("job-42/clip/notes.txt").is_none());
        assert!(ArtifactKey::parse("job-42/clip/0001.mp4.tmp").is_none());
        assert!(ArtifactKey::parse("job-42/unknown/0001.mp4").is_none());
    }
}

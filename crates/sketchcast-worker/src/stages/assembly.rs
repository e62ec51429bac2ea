//! Assembly: concatenate clips and narration in sentence order, then mux.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use sketchcast_models::{ArtifactKind, AudioSegment, Clip, LocationRef};
use sketchcast_storage::ArtifactKey;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::Pipeline;
use crate::stages::JobContext;

/// Concatenated tracks kept in the store after a failed mux.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTracks {
    pub video: LocationRef,
    pub audio: LocationRef,
    pub audio_secs: f64,
}

/// The muxed deliverable, still on local disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuxedOutput {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Concatenated tracks on local disk.
#[derive(Debug, Clone)]
pub(crate) struct LocalTracks {
    pub video: PathBuf,
    pub audio: PathBuf,
    /// Measured duration of the audio track
    pub audio_secs: f64,
}

/// Join clips and narration into one video track and one audio track.
///
/// Both inputs must hold one entry per sentence; order is strictly by
/// sentence index.
pub(crate) async fn sequence(
    pipeline: &Pipeline,
    ctx: &JobContext,
    clips: &[Clip],
    audio: &[AudioSegment],
) -> PipelineResult<LocalTracks> {
    if clips.is_empty() {
        return Err(PipelineError::NoClipsProduced);
    }
    if clips.len() != audio.len() {
        return Err(PipelineError::mux_failed(format!(
            "{} clips for {} narration segments",
            clips.len(),
            audio.len()
        )));
    }

    let mut clips: Vec<&Clip> = clips.iter().collect();
    let mut audio: Vec<&AudioSegment> = audio.iter().collect();
    clips.sort_by_key(|c| c.sentence_index);
    audio.sort_by_key(|a| a.sentence_index);
    for (position, (clip, segment)) in clips.iter().zip(&audio).enumerate() {
        if clip.sentence_index != position || segment.sentence_index != position {
            return Err(PipelineError::mux_failed(format!(
                "missing artifacts for sentence {}",
                position
            )));
        }
    }

    let mut clip_paths = Vec::with_capacity(clips.len());
    for clip in &clips {
        clip_paths.push(
            pipeline
                .store
                .materialize(&clip.location, &ctx.scratch)
                .await
                .map_err(PipelineError::mux_failed)?,
        );
    }
    let mut audio_paths = Vec::with_capacity(audio.len());
    for segment in &audio {
        audio_paths.push(
            pipeline
                .store
                .materialize(&segment.location, &ctx.scratch)
                .await
                .map_err(PipelineError::mux_failed)?,
        );
    }

    let video_track = ctx.track_file("video.mp4");
    let audio_track = ctx.track_file("audio.m4a");

    pipeline
        .media
        .concat_video(&clip_paths, &video_track)
        .await
        .map_err(|e| PipelineError::mux_failed(format!("video concatenation: {}", e)))?;
    pipeline
        .media
        .concat_audio(&audio_paths, &audio_track)
        .await
        .map_err(|e| PipelineError::mux_failed(format!("audio concatenation: {}", e)))?;

    let audio_secs = pipeline
        .media
        .probe_duration(&audio_track)
        .await
        .map_err(|e| PipelineError::mux_failed(format!("audio track probe: {}", e)))?;

    let narrated: f64 = audio.iter().map(|a| a.duration_secs).sum();
    let drawn: f64 = clips.iter().map(|c| c.duration_secs).sum();
    if (audio_secs - narrated).abs() > ctx.settings.render.frame_interval() {
        warn!(
            job_id = %ctx.job.id,
            audio_secs,
            narrated,
            "Concatenated audio differs from summed narration"
        );
    }
    info!(
        job_id = %ctx.job.id,
        clips = clips.len(),
        audio_secs,
        drift_secs = drawn - audio_secs,
        "Tracks concatenated"
    );

    for clip in &clips {
        ctx.consume(&ArtifactKey::sentence(&ctx.job.id, ArtifactKind::Clip, clip.sentence_index))
            .await;
    }
    for segment in &audio {
        ctx.consume(&ArtifactKey::sentence(
            &ctx.job.id,
            ArtifactKind::Audio,
            segment.sentence_index,
        ))
        .await;
    }

    Ok(LocalTracks {
        video: video_track,
        audio: audio_track,
        audio_secs,
    })
}

/// Attach the audio track; the result lasts as long as the audio.
pub(crate) async fn mux(
    pipeline: &Pipeline,
    ctx: &JobContext,
    tracks: &LocalTracks,
) -> PipelineResult<MuxedOutput> {
    let output = ctx.scratch.join("final.mp4");
    let duration_secs = pipeline
        .media
        .mux(&tracks.video, &tracks.audio, &output, tracks.audio_secs)
        .await
        .map_err(PipelineError::mux_failed)?;

    for kind in [ArtifactKind::VideoTrack, ArtifactKind::AudioTrack] {
        ctx.consume(&ArtifactKey::job(&ctx.job.id, kind)).await;
    }

    Ok(MuxedOutput {
        path: output,
        duration_secs,
    })
}

/// Persist local tracks so a later retry can mux without re-concatenating.
pub(crate) async fn store_tracks(
    pipeline: &Pipeline,
    ctx: &JobContext,
    tracks: &LocalTracks,
) -> Option<StoredTracks> {
    let video_key = ArtifactKey::job(&ctx.job.id, ArtifactKind::VideoTrack);
    let audio_key = ArtifactKey::job(&ctx.job.id, ArtifactKind::AudioTrack);

    let video = match pipeline.store.put(&tracks.video, &video_key).await {
        Ok(location) => location,
        Err(e) => {
            ctx.logger
                .log_warning(&format!("video track could not be kept: {}", e));
            return None;
        }
    };
    ctx.record(video_key, video.clone()).await;

    let audio = match pipeline.store.put(&tracks.audio, &audio_key).await {
        Ok(location) => location,
        Err(e) => {
            ctx.logger
                .log_warning(&format!("audio track could not be kept: {}", e));
            return None;
        }
    };
    ctx.record(audio_key, audio.clone()).await;

    Some(StoredTracks {
        video,
        audio,
        audio_secs: tracks.audio_secs,
    })
}

/// Bring stored tracks back to local disk.
pub(crate) async fn load_tracks(
    pipeline: &Pipeline,
    ctx: &JobContext,
    tracks: &StoredTracks,
) -> PipelineResult<LocalTracks> {
    let video = pipeline
        .store
        .materialize(&tracks.video, &ctx.scratch)
        .await
        .map_err(PipelineError::mux_failed)?;
    let audio = pipeline
        .store
        .materialize(&tracks.audio, &ctx.scratch)
        .await
        .map_err(PipelineError::mux_failed)?;
    Ok(LocalTracks {
        video,
        audio,
        audio_secs: tracks.audio_secs,
    })
}

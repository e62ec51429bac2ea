//! Attach the narration track to the silent video track.

use std::path::Path;
use tracing::info;

use sketchcast_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Build the mux command.
///
/// The video input loops so a track shorter than the narration is extended;
/// `-t` cuts the output at the narration duration so a longer one is trimmed.
pub fn mux_command(
    video: &Path,
    audio: &Path,
    output: &Path,
    audio_secs: f64,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    FfmpegCommand::new(video, output)
        .stream_loop()
        .add_input(audio)
        .map("0:v:0")
        .map("1:a:0")
        .output_args(encoding.to_ffmpeg_args())
        .output_duration(audio_secs)
        .faststart()
}

/// Mux `video` and `audio` into `output`, lasting exactly `audio_secs`.
pub async fn mux_audio_video(
    runner: &FfmpegRunner,
    video: &Path,
    audio: &Path,
    output: &Path,
    audio_secs: f64,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    for input in [video, audio] {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
    }
    if !(audio_secs.is_finite() && audio_secs > 0.0) {
        return Err(MediaError::InvalidMedia(format!(
            "audio track has no duration: {}",
            audio_secs
        )));
    }

    let cmd = mux_command(video, audio, output, audio_secs, encoding);
    runner.run(&cmd).await?;

    info!(
        output = %output.display(),
        duration = audio_secs,
        "Muxed final video"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mux_command_follows_audio_duration() {
        let cmd = mux_command(
            Path::new("video_track.mp4"),
            Path::new("audio_track.m4a"),
            Path::new("final.mp4"),
            3.5,
            &EncodingConfig::default(),
        );
        let args = cmd.build_args();
        let joined = args.join(" ");

        assert!(joined.contains("-stream_loop -1 -i video_track.mp4 -i audio_track.m4a"));
        assert!(joined.contains("-map 0:v:0 -map 1:a:0"));
        assert!(joined.contains("-t 3.500"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.ends_with("final.mp4"));
    }

    #[tokio::test]
    async fn test_zero_duration_audio_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("v.mp4");
        let audio = dir.path().join("a.m4a");
        tokio::fs::write(&video, b"v").await.unwrap();
        tokio::fs::write(&audio, b"a").await.unwrap();

        let err = mux_audio_video(
            &FfmpegRunner::new(),
            &video,
            &audio,
            &dir.path().join("final.mp4"),
            0.0,
            &EncodingConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::InvalidMedia(_)));
    }
}

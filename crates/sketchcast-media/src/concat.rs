//! Ordered concatenation of clips and narration segments.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use sketchcast_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Contents of an ffmpeg concat list, one `file` line per input in order.
pub fn concat_list_contents(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|path| {
            let escaped = path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

/// Absolute form of every input.
///
/// The concat demuxer resolves relative entries against the list file's
/// directory, not the working directory.
fn absolute_inputs(inputs: &[PathBuf]) -> MediaResult<Vec<PathBuf>> {
    inputs
        .iter()
        .map(|input| std::path::absolute(input).map_err(MediaError::from))
        .collect()
}

/// List file written next to `output`.
fn list_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "concat".to_string());
    output.with_file_name(format!("{}.concat.txt", stem))
}

async fn write_list(inputs: &[PathBuf], output: &Path) -> MediaResult<PathBuf> {
    if inputs.is_empty() {
        return Err(MediaError::InvalidMedia("nothing to concatenate".to_string()));
    }
    for input in inputs {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.clone()));
        }
    }
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let list = list_path_for(output);
    tokio::fs::write(&list, concat_list_contents(&absolute_inputs(inputs)?)).await?;
    Ok(list)
}

async fn remove_list(list: &Path) {
    if let Err(e) = tokio::fs::remove_file(list).await {
        debug!("Failed to remove concat list {}: {}", list.display(), e);
    }
}

/// Join silent clips in the given order without re-encoding.
///
/// Every clip must share codec parameters, which holds for clips produced by
/// the raw frame encoder with one [`EncodingConfig`].
pub async fn concat_video(
    runner: &FfmpegRunner,
    clips: &[PathBuf],
    output: &Path,
) -> MediaResult<()> {
    let list = write_list(clips, output).await?;
    let cmd = FfmpegCommand::new(&list, output)
        .concat_demuxer()
        .no_audio()
        .codec_copy();

    let result = runner.run(&cmd).await;
    remove_list(&list).await;
    result?;

    info!(clips = clips.len(), output = %output.display(), "Concatenated video track");
    Ok(())
}

/// Join narration segments in the given order into one AAC track.
pub async fn concat_audio(
    runner: &FfmpegRunner,
    segments: &[PathBuf],
    output: &Path,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let list = write_list(segments, output).await?;
    let cmd = FfmpegCommand::new(&list, output)
        .concat_demuxer()
        .no_video()
        .output_args(encoding.audio_args());

    let result = runner.run(&cmd).await;
    remove_list(&list).await;
    result?;

    info!(segments = segments.len(), output = %output.display(), "Concatenated audio track");
    Ok(())
}

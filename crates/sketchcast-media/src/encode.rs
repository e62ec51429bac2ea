//! Streams raw RGBA frames into an `ffmpeg` child process.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use sketchcast_models::{EncodingConfig, FrameSize};
use tracing::debug;

use crate::command::{check_ffmpeg, stderr_tail};
use crate::error::{MediaError, MediaResult};

/// Blocking encoder writing a silent H.264 clip from RGBA8 frames.
///
/// Frames must be opaque; alpha is ignored by the yuv420p output.
pub struct RawFrameEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
    frames_written: u64,
    output: PathBuf,
}

impl RawFrameEncoder {
    /// Spawn `ffmpeg` reading `size` frames at `fps` from stdin.
    pub fn start(
        output: &Path,
        size: FrameSize,
        fps: u32,
        encoding: &EncodingConfig,
    ) -> MediaResult<Self> {
        size.validate()?;
        if fps == 0 {
            return Err(MediaError::invalid_frame("fps must be non-zero"));
        }
        check_ffmpeg()?;

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &size.to_dimension_string()])
            .args(["-r", &fps.to_string()])
            .args(["-i", "pipe:0", "-an"])
            .args(encoding.video_args())
            .args(["-r", &fps.to_string(), "-movflags", "+faststart"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!(output = %output.display(), size = %size.to_dimension_string(), fps, "Starting raw frame encoder");

        let mut child = cmd.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::internal("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            frame_len: size.width as usize * size.height as usize * 4,
            frames_written: 0,
            output: output.to_path_buf(),
        })
    }

    /// Write one frame.
    pub fn push(&mut self, rgba: &[u8]) -> MediaResult<()> {
        if rgba.len() != self.frame_len {
            return Err(MediaError::invalid_frame(format!(
                "frame has {} bytes, expected {}",
                rgba.len(),
                self.frame_len
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::internal("encoder already finished"))?;
        stdin.write_all(rgba)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Write the same frame `count` times.
    pub fn push_repeated(&mut self, rgba: &[u8], count: u64) -> MediaResult<()> {
        for _ in 0..count {
            self.push(rgba)?;
        }
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Close stdin and wait for ffmpeg. Returns the number of frames encoded.
    pub fn finish(mut self) -> MediaResult<u64> {
        drop(self.stdin.take());
        let status = self.child.wait()?;
        let stderr = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| MediaError::internal("ffmpeg stderr drain thread panicked"))??,
            None => Vec::new(),
        };

        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                format!("encoding {} failed", self.output.display()),
                Some(stderr_tail(&stderr)),
                status.code(),
            ));
        }
        Ok(self.frames_written)
    }
}

impl Drop for RawFrameEncoder {
    fn drop(&mut self) {
        // Abandoned before finish: do not leave ffmpeg running
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
